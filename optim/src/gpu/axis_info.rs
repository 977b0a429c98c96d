use loom_ir::{LaunchDims, Stage};
use snafu::OptionExt;
use tracing::trace;

use crate::error::*;

/// Launch dimensions implied by the axis bindings of `stages`.
///
/// Each bound axis contributes its stage extent; several stages binding the
/// same axis keep the largest extent. Stages without bindings contribute
/// nothing, so an unbound schedule yields an invalid [`LaunchDims`].
pub fn gather_axis_info<'a>(stages: impl IntoIterator<Item = &'a Stage>) -> Result<LaunchDims> {
    let mut dims = LaunchDims::new();
    for stage in stages {
        for (iterator, &axis) in &stage.forloop_infos {
            let extent = stage
                .axis_extent(iterator)
                .context(MissingStageExtentSnafu { tensor: &stage.tensor, axis: iterator })?;
            let extent = extent
                .as_const_int()
                .context(NonConstantStageExtentSnafu { tensor: &stage.tensor, axis: iterator })?;
            trace!(tensor = %stage.tensor, %iterator, %axis, extent, "axis extent");
            dims.set(axis, extent);
        }
    }
    Ok(dims)
}
