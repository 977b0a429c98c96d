use loom_ir::{Expr, LaunchDims, MemoryScope, Stage, StageMap, TensorMap};

use crate::config::LowerConfig;
use crate::context::LoweringContext;
use crate::error::Error;
use crate::pipeline::{BindingPlan, lower_function};
use crate::test::helpers::*;

/// `C[i, j] = B[i, j] * 2` where `B[x, y] = A[x * 32 + y] + 1` is inlined.
fn elementwise_2d() -> (LoweringContext, Expr) {
    let flat = v("x") * int(32) + v("y");
    let ctx = context(
        [
            input("A", &[512]),
            computed("B", &[16, 32], &["x", "y"], Expr::load("A", vec![flat]) + int(1)),
            input("C", &[16, 32]),
        ],
        [
            Stage::new("A"),
            Stage::new("B").inline(),
            Stage::new("C").with_axes([("i", int(16)), ("j", int(32))]).bind("i", BLOCK_X).bind("j", THREAD_X),
        ],
    );
    let body = nest(
        &[("i", 16), ("j", 32)],
        Expr::store("C", Expr::load("B", vec![v("i"), v("j")]) * int(2), vec![v("i"), v("j")]),
    );
    (ctx, Expr::lowered_func("elementwise", vec![], body))
}

#[test]
fn test_plan_from_stages_follows_insertion_order() {
    let stages: StageMap = [
        Stage::new("C").with_axes([("i", int(4))]).bind("i", BLOCK_X),
        Stage::new("B").inline(),
        Stage::new("A").with_axes([("k", int(8))]).bind("k", THREAD_X),
    ]
    .into_iter()
    .collect();

    let plan = BindingPlan::from_stages(&stages);

    assert_eq!(plan.traverse_order, vec!["C".to_string(), "A".to_string()]);
    assert_eq!(plan.forloop_infos.len(), 2);
    assert!(!plan.is_empty());
}

#[test]
#[tracing_test::traced_test]
fn test_lower_elementwise_kernel() {
    let (mut ctx, mut func) = elementwise_2d();
    let plan = BindingPlan::from_stages(&ctx.stages);

    lower_function(&mut ctx, &mut func, &plan).unwrap();

    let Expr::LoweredFunc(f) = &func else { unreachable!() };
    let flat = v("blockIdx.x") * int(32) + v("threadIdx.x");
    let value = (Expr::load("A", vec![flat]) + int(1)) * int(2);
    assert_eq!(*f.body, Expr::store("C", value, vec![v("blockIdx.x"), v("threadIdx.x")]));
    assert_eq!(f.launch.grid, [16, 1, 1]);
    assert_eq!(f.launch.block, [32, 1, 1]);

    assert!(logs_contain("after compute_inline_expand"));
    assert!(logs_contain("after remove_gpu_forloops_axis"));
}

#[test]
fn test_lower_with_shared_scratch_inserts_barrier() {
    // S is staged through shared memory and read back under a guard.
    let mut tensors = TensorMap::new();
    tensors.insert_tensor(input("A", &[32]));
    with_backing(&mut tensors, input("S", &[32]), "S_temp_buffer", MemoryScope::GpuShared);
    tensors.insert_tensor(input("C", &[32]));
    let stages = [
        Stage::new("S").with_axes([("j", int(32))]).bind("j", THREAD_X),
        Stage::new("C").with_axes([("k", int(32))]).bind("k", THREAD_X),
    ];
    let mut ctx = LoweringContext::new(tensors, stages.into_iter().collect());
    let body = Expr::block(vec![
        nest(
            &[("j", 32)],
            Expr::if_then_else(
                Expr::lt(v("j"), int(16)),
                Expr::store("S", Expr::load("A", vec![v("j")]), vec![v("j")]),
                None,
            ),
        ),
        nest(&[("k", 32)], Expr::store("C", Expr::load("S", vec![v("k")]), vec![v("k")])),
    ]);
    let mut func = Expr::lowered_func("staged", vec![], body);
    let plan = BindingPlan::from_stages(&ctx.stages);

    lower_function(&mut ctx, &mut func, &plan).unwrap();

    let Expr::LoweredFunc(f) = &func else { unreachable!() };
    let expected = Expr::block(vec![
        Expr::sync_threads(),
        Expr::if_then_else(
            Expr::lt(v("threadIdx.x"), int(16)),
            Expr::store("S", Expr::load("A", vec![v("threadIdx.x")]), vec![v("threadIdx.x")]),
            None,
        ),
        Expr::store("C", Expr::load("S", vec![v("threadIdx.x")]), vec![v("threadIdx.x")]),
    ]);
    assert_eq!(*f.body, expected);
    assert_eq!(ctx.tensors.buffer("S_temp_buffer").unwrap().const_shape().unwrap(), vec![32]);
}

#[test]
fn test_barriers_can_be_disabled() {
    let mut tensors = TensorMap::new();
    with_backing(&mut tensors, input("S", &[32]), "S_temp_buffer", MemoryScope::GpuShared);
    let config = LowerConfig::builder().insert_sync_threads(false).build();
    let mut ctx = LoweringContext::new(tensors, StageMap::new()).with_config(config);
    let body = Expr::if_then_else(v("c"), Expr::store("S", int(0), vec![int(0)]), None);
    let mut func = Expr::lowered_func("k", vec![], body.clone());

    lower_function(&mut ctx, &mut func, &BindingPlan::default()).unwrap();

    assert_eq!(func.as_lowered_func().map(|f| &*f.body), Some(&body));
}

#[test]
#[tracing_test::traced_test]
fn test_failure_is_logged() {
    let (mut ctx, _) = elementwise_2d();
    let mut stmt = Expr::store("C", int(0), vec![]);

    let err = lower_function(&mut ctx, &mut stmt, &BindingPlan::default()).unwrap_err();

    assert_eq!(err, Error::NotALoweredFunc { kind: "Store" });
    assert!(logs_contain("lowering failed"));
}

#[test]
fn test_missing_stage_for_binding_fails() {
    let (mut ctx, mut func) = elementwise_2d();
    let mut plan = BindingPlan::from_stages(&ctx.stages);
    plan.forloop_infos.insert("ghost".into(), Default::default());

    let err = lower_function(&mut ctx, &mut func, &plan).unwrap_err();
    assert_eq!(err, Error::MissingStage { tensor: "ghost".into() });
}

#[test]
fn test_module_launch_dims_stay_with_their_function() {
    let mut ctx = context(
        [input("A", &[16]), input("C", &[16]), input("D", &[8])],
        [Stage::new("C").with_axes([("i", int(16))]).bind("i", BLOCK_X), Stage::new("D")],
    );
    let gpu = Expr::lowered_func(
        "gpu",
        vec![],
        nest(&[("i", 16)], Expr::store("C", Expr::load("A", vec![v("i")]), vec![v("i")])),
    );
    let cpu_body = nest(&[("k", 8)], Expr::store("D", int(0), vec![v("k")]));
    let cpu = Expr::lowered_func("cpu", vec![], cpu_body.clone());
    let mut module = Expr::module("m", vec![gpu, cpu]);
    let plan = BindingPlan::from_stages(&ctx.stages);

    lower_function(&mut ctx, &mut module, &plan).unwrap();

    let Expr::Module(m) = &module else { unreachable!() };
    let gpu = m.functions[0].as_lowered_func().unwrap();
    assert_eq!(gpu.launch.grid, [16, 1, 1]);
    assert!(gpu.launch.valid);

    let cpu = m.functions[1].as_lowered_func().unwrap();
    assert!(!cpu.launch.valid);
    assert_eq!(cpu.launch, LaunchDims::new());
    assert_eq!(*cpu.body, cpu_body);
}
