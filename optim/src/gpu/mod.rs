//! Device-axis binding for GPU targets.
//!
//! Runs after compute-inline expansion and turns scheduled loops into kernel
//! launch geometry:
//!
//! ```text
//! gather_axis_info        stage extents      -> LaunchDims
//! transform_gpu_forloops  for (i, 0, n) {..} -> for (threadIdx.x, 0, n) [bound] {..}
//!                         temp buffers shrink to the per-block / per-thread slice
//! remove_gpu_forloops_axis bound loops removed, extents merged into func.launch
//! insert_sync_threads     __syncthreads() before divergent shared-memory writes
//! ```

mod axis_info;
mod forloops;
mod remove;
mod resize;
mod sync;

pub use axis_info::gather_axis_info;
pub use forloops::transform_gpu_forloops;
pub use remove::remove_gpu_forloops_axis;
pub use resize::{ResizedBuffers, resized_shape};
pub use sync::insert_sync_threads;
