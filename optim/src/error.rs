use loom_ir::{DeviceAxis, Expr};
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn render_shape(shape: &[Expr]) -> String {
    let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
    format!("[{}]", dims.join(", "))
}

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A tensor referenced by a pass has no stage.
    #[snafu(display("tensor '{tensor}' has no stage"))]
    MissingStage { tensor: String },

    /// A name does not resolve in the tensor map.
    #[snafu(display("unknown tensor '{name}'"))]
    UnknownTensor { name: String },

    /// Inlined tensor without a compute body.
    #[snafu(display("inlined tensor '{tensor}' has no inline expansion"))]
    MissingInlineExpansion { tensor: String },

    #[snafu(display("tensor '{tensor}' computes at {count} parents; at most one is allowed"))]
    MultipleComputeAt { tensor: String, count: usize },

    #[snafu(display("tensor '{tensor}' computes at level {level} but its stage has only {axes} axes"))]
    ComputeAtLevelOutOfRange { tensor: String, level: usize, axes: usize },

    /// The inline dependency graph has a cycle through `tensor`.
    #[snafu(display("cyclic inline dependency through tensor '{tensor}'"))]
    CyclicInline { tensor: String },

    #[snafu(display("inline expansion did not converge after {rounds} rounds; remaining: {remaining:?}"))]
    InlineDidNotConverge { rounds: usize, remaining: Vec<String> },

    #[snafu(display("inlined tensors still loaded after expansion: {tensors:?}"))]
    IncompleteInline { tensors: Vec<String> },

    /// Launch extents must be compile-time constants.
    #[snafu(display("function '{function}': loop bound to {axis} has non-constant extent {extent}"))]
    NonConstantAxisExtent { function: String, axis: DeviceAxis, extent: Expr },

    #[snafu(display("tensor '{tensor}': axis '{axis}' bound to a device axis has non-constant extent"))]
    NonConstantStageExtent { tensor: String, axis: String },

    #[snafu(display("tensor '{tensor}': bound axis '{axis}' is not one of the stage axes"))]
    MissingStageExtent { tensor: String, axis: String },

    #[snafu(display("function '{function}': poly loop '{iterator}' cannot be bound to a device axis"))]
    BoundPolyFor { function: String, iterator: String },

    #[snafu(display(
        "buffer '{buffer}' resized twice with different shapes: {} then {}",
        render_shape(existing),
        render_shape(requested)
    ))]
    BufferResizeConflict { buffer: String, existing: Vec<Expr>, requested: Vec<Expr> },

    #[snafu(display("expected a lowered function or module, found {kind}"))]
    NotALoweredFunc { kind: &'static str },

    #[snafu(display("{source}"))]
    Ir { source: loom_ir::Error },
}

impl From<loom_ir::Error> for Error {
    fn from(source: loom_ir::Error) -> Self {
        match source {
            loom_ir::Error::UnknownTensor { name } => Self::UnknownTensor { name },
            loom_ir::Error::MissingInlineExpansion { tensor } => Self::MissingInlineExpansion { tensor },
            loom_ir::Error::MultipleComputeAt { tensor, count } => Self::MultipleComputeAt { tensor, count },
            source => Self::Ir { source },
        }
    }
}
