use crate::error::Error;
use crate::stage::{ComputeAt, Stage, StageMap};
use crate::{AxisDim, DeviceAxis, Expr, MemoryScope};

#[test]
fn test_stage_builder() {
    let stage = Stage::new("C")
        .with_scope(MemoryScope::GpuLocal)
        .compute_at("D", 1)
        .with_axes([("i", Expr::int(32)), ("j", Expr::int(4))])
        .bind("i", DeviceAxis::Block(AxisDim::X));

    assert!(!stage.inlined);
    assert_eq!(stage.scope, MemoryScope::GpuLocal);
    assert_eq!(stage.axis_names, vec!["i", "j"]);
    assert_eq!(stage.axis_extent("j").and_then(Expr::as_const_int), Some(4));
    assert!(stage.axis_extent("k").is_none());
    assert_eq!(stage.forloop_infos.get("i"), Some(&DeviceAxis::Block(AxisDim::X)));
    assert_eq!(stage.single_compute_at().unwrap(), Some(&ComputeAt { parent: "D".into(), level: 1 }));
}

#[test]
fn test_single_compute_at_rejects_two_parents() {
    let stage = Stage::new("C").compute_at("D", 0).compute_at("E", 1);
    assert_eq!(stage.single_compute_at().unwrap_err(), Error::MultipleComputeAt { tensor: "C".into(), count: 2 });
}

#[test]
fn test_no_compute_at() {
    assert_eq!(Stage::new("C").single_compute_at().unwrap(), None);
}

#[test]
fn test_stage_map_preserves_insertion_order() {
    let map: StageMap = [Stage::new("b"), Stage::new("a").inline(), Stage::new("c")].into_iter().collect();
    let order: Vec<&str> = map.iter().map(|s| s.tensor.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "c"]);
    assert!(map.is_inlined("a"));
    assert!(!map.is_inlined("b"));
    assert!(!map.is_inlined("missing"));
}

#[test]
fn test_stage_map_insert_replaces_in_place() {
    let mut map: StageMap = [Stage::new("a"), Stage::new("b")].into_iter().collect();
    map.insert(Stage::new("a").inline());
    assert_eq!(map.len(), 2);
    assert_eq!(map.iter().next().map(|s| s.inlined), Some(true));
}

#[test]
fn test_forloop_infos_skips_unbound_stages() {
    let map: StageMap = [
        Stage::new("A").bind("i", DeviceAxis::Block(AxisDim::X)).bind("j", DeviceAxis::Thread(AxisDim::X)),
        Stage::new("B"),
    ]
    .into_iter()
    .collect();

    let infos = map.forloop_infos();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos["A"].len(), 2);
    assert_eq!(infos["A"]["j"], DeviceAxis::Thread(AxisDim::X));
}
