//! Launch dimensions of a device kernel.

use std::fmt;

use crate::types::{AxisDim, DeviceAxis};

/// Grid and block extents of a kernel launch.
///
/// Every extent starts at 1. Binding an axis only ever grows its extent, so
/// merging the requirements of several loops yields the largest request per
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchDims {
    pub grid: [i64; 3],
    pub block: [i64; 3],
    /// Set once any axis has been recorded.
    pub valid: bool,
}

impl Default for LaunchDims {
    fn default() -> Self {
        Self { grid: [1; 3], block: [1; 3], valid: false }
    }
}

impl LaunchDims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `extent` for `axis`, keeping the larger of the old and new value.
    pub fn set(&mut self, axis: DeviceAxis, extent: i64) {
        let slot = match axis {
            DeviceAxis::Block(d) => &mut self.grid[d.index()],
            DeviceAxis::Thread(d) => &mut self.block[d.index()],
        };
        *slot = (*slot).max(extent);
        self.valid = true;
    }

    pub fn extent(&self, axis: DeviceAxis) -> i64 {
        match axis {
            DeviceAxis::Block(d) => self.grid[d.index()],
            DeviceAxis::Thread(d) => self.block[d.index()],
        }
    }

    /// Component-wise maximum of two launch configurations.
    pub fn merge(&mut self, other: &LaunchDims) {
        if !other.valid {
            return;
        }
        for i in 0..3 {
            self.grid[i] = self.grid[i].max(other.grid[i]);
            self.block[i] = self.block[i].max(other.block[i]);
        }
        self.valid = true;
    }

    pub fn grid_dim(&self, dim: AxisDim) -> i64 {
        self.grid[dim.index()]
    }

    pub fn block_dim(&self, dim: AxisDim) -> i64 {
        self.block[dim.index()]
    }

    /// Total number of threads per block.
    pub fn threads_per_block(&self) -> i64 {
        self.block.iter().product()
    }
}

impl fmt::Display for LaunchDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [gx, gy, gz] = self.grid;
        let [bx, by, bz] = self.block;
        write!(f, "<grid:({gx}, {gy}, {gz}), block:({bx}, {by}, {bz})>")
    }
}
