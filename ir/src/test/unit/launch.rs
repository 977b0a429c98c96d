use test_case::test_case;

use crate::{AxisDim, DeviceAxis, LaunchDims};

#[test]
fn test_default_is_all_ones() {
    let dims = LaunchDims::default();
    assert_eq!(dims.grid, [1, 1, 1]);
    assert_eq!(dims.block, [1, 1, 1]);
    assert!(!dims.valid);
}

#[test]
fn test_set_keeps_maximum() {
    let mut dims = LaunchDims::new();
    dims.set(DeviceAxis::Block(AxisDim::X), 128);
    dims.set(DeviceAxis::Block(AxisDim::X), 64);
    assert_eq!(dims.extent(DeviceAxis::Block(AxisDim::X)), 128);
    assert!(dims.valid);
}

#[test]
fn test_merge_is_component_max() {
    let mut a = LaunchDims::new();
    a.set(DeviceAxis::Block(AxisDim::X), 16);
    a.set(DeviceAxis::Thread(AxisDim::Y), 4);
    let mut b = LaunchDims::new();
    b.set(DeviceAxis::Block(AxisDim::X), 8);
    b.set(DeviceAxis::Thread(AxisDim::X), 32);

    a.merge(&b);
    assert_eq!(a.grid, [16, 1, 1]);
    assert_eq!(a.block, [32, 4, 1]);
    assert_eq!(a.threads_per_block(), 128);
}

#[test]
fn test_merge_ignores_invalid() {
    let mut a = LaunchDims::new();
    a.merge(&LaunchDims::new());
    assert!(!a.valid);
}

#[test_case(DeviceAxis::Block(AxisDim::Y), "<grid:(1, 7, 1), block:(1, 1, 1)>" ; "grid_y")]
#[test_case(DeviceAxis::Thread(AxisDim::Z), "<grid:(1, 1, 1), block:(1, 1, 7)>" ; "block_z")]
fn test_display(axis: DeviceAxis, expected: &str) {
    let mut dims = LaunchDims::new();
    dims.set(axis, 7);
    assert_eq!(dims.to_string(), expected);
}
