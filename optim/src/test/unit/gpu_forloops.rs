use loom_ir::{Expr, ForloopInfos, LaunchDims, MemoryScope, Stage, TensorMap};
use test_case::test_case;

use crate::context::LoweringContext;
use crate::error::Error;
use crate::gpu::{ResizedBuffers, gather_axis_info, transform_gpu_forloops};
use crate::test::helpers::*;

fn c_stage() -> Stage {
    Stage::new("C").with_axes([("i", int(16)), ("j", int(32))]).bind("i", BLOCK_X).bind("j", THREAD_X)
}

fn c_body(i: Expr, j: Expr) -> Expr {
    let flat = i * int(32) + j;
    Expr::store("C", Expr::load("A", vec![flat.clone()]), vec![flat])
}

fn transform(ctx: &mut LoweringContext, infos: &ForloopInfos, order: &[&str], expr: &mut Expr) -> ResizedBuffers {
    let stages: Vec<&Stage> = infos.keys().filter_map(|t| ctx.stages.get(t)).collect();
    let axis_info = gather_axis_info(stages).unwrap();
    let order: Vec<String> = order.iter().map(|s| s.to_string()).collect();
    let mut resized = ResizedBuffers::new();
    transform_gpu_forloops(ctx, infos, &order, &axis_info, &mut resized, expr).unwrap();
    resized
}

// =========================================================================
// gather_axis_info
// =========================================================================

#[test]
fn test_gather_axis_info_from_bound_stage() {
    let dims = gather_axis_info([&c_stage()]).unwrap();

    assert!(dims.valid);
    assert_eq!(dims.grid, [16, 1, 1]);
    assert_eq!(dims.block, [32, 1, 1]);
}

#[test]
fn test_gather_axis_info_keeps_largest_extent() {
    let small = Stage::new("D").with_axes([("k", int(8))]).bind("k", THREAD_X);
    let other = Stage::new("E").with_axes([("k", int(4)), ("l", int(2))]).bind("k", THREAD_Y).bind("l", BLOCK_Y);

    let dims = gather_axis_info([&small, &c_stage(), &other]).unwrap();

    assert_eq!(dims.grid, [16, 2, 1]);
    assert_eq!(dims.block, [32, 4, 1]);
    assert_eq!(dims.threads_per_block(), 128);
}

#[test]
fn test_gather_axis_info_without_bindings_is_invalid() {
    let dims = gather_axis_info([&Stage::new("C").with_axes([("i", int(16))])]).unwrap();
    assert_eq!(dims, LaunchDims::default());
}

#[test]
fn test_gather_axis_info_rejects_symbolic_extent() {
    let stage = Stage::new("C").with_axes([("i", v("n"))]).bind("i", BLOCK_X);

    let err = gather_axis_info([&stage]).unwrap_err();
    assert_eq!(err, Error::NonConstantStageExtent { tensor: "C".into(), axis: "i".into() });
}

#[test]
fn test_gather_axis_info_rejects_unknown_axis() {
    let stage = Stage::new("C").with_axes([("i", int(4))]).bind("k", BLOCK_X);

    let err = gather_axis_info([&stage]).unwrap_err();
    assert_eq!(err, Error::MissingStageExtent { tensor: "C".into(), axis: "k".into() });
}

// =========================================================================
// transform_gpu_forloops
// =========================================================================

#[test]
fn test_bound_loops_are_tagged_and_renamed() {
    let mut ctx = context([input("A", &[512]), input("C", &[512])], [c_stage()]);
    let infos = ctx.stages.forloop_infos();
    let mut func = nest(&[("i", 16), ("j", 32)], c_body(v("i"), v("j")));

    transform(&mut ctx, &infos, &["C"], &mut func);

    let expected = bound(BLOCK_X, 16, bound(THREAD_X, 32, c_body(v("blockIdx.x"), v("threadIdx.x"))));
    assert_eq!(func, expected);
}

#[test]
fn test_loops_of_other_tensors_are_left_alone() {
    let mut ctx = context([input("A", &[512]), input("C", &[512])], [c_stage()]);
    let infos = ctx.stages.forloop_infos();
    let other = nest(&[("i", 16)], Expr::store("D", int(0), vec![v("i")]));
    let mut func = other.clone();

    transform(&mut ctx, &infos, &["C"], &mut func);

    assert_eq!(func, other);
}

#[test]
fn test_tensors_missing_from_traverse_order_are_skipped() {
    let mut ctx = context([input("A", &[512]), input("C", &[512])], [c_stage()]);
    let infos = ctx.stages.forloop_infos();
    let original = nest(&[("i", 16), ("j", 32)], c_body(v("i"), v("j")));
    let mut func = original.clone();

    transform(&mut ctx, &infos, &[], &mut func);

    assert_eq!(func, original);
}

#[test]
fn test_transform_is_idempotent() {
    let mut ctx = context([input("A", &[512]), input("C", &[512])], [c_stage()]);
    let infos = ctx.stages.forloop_infos();
    let mut func = nest(&[("i", 16), ("j", 32)], c_body(v("i"), v("j")));

    transform(&mut ctx, &infos, &["C"], &mut func);
    let once = func.clone();
    transform(&mut ctx, &infos, &["C"], &mut func);

    assert_eq!(func, once);
}

#[test]
fn test_inner_loop_shadowing_iterator_keeps_its_own_name() {
    // The inner serial loop rebinds j; only the outer j becomes threadIdx.x.
    let stage = Stage::new("C").with_axes([("j", int(32))]).bind("j", THREAD_X);
    let mut ctx = context([input("C", &[32])], [stage]);
    let infos = ctx.stages.forloop_infos();
    let inner = Expr::for_("j", int(0), int(2), Expr::store("D", v("j"), vec![v("j")]));
    let mut func = nest(&[("j", 32)], Expr::block(vec![Expr::store("C", int(0), vec![v("j")]), inner.clone()]));

    transform(&mut ctx, &infos, &["C"], &mut func);

    let expected = bound(THREAD_X, 32, Expr::block(vec![Expr::store("C", int(0), vec![v("threadIdx.x")]), inner]));
    assert_eq!(func, expected);
}

// =========================================================================
// Temp buffer resizing during transform
// =========================================================================

fn scratch_context(scope: MemoryScope) -> LoweringContext {
    let mut tensors = TensorMap::new();
    tensors.insert_tensor(input("A", &[512]));
    with_backing(&mut tensors, input("S", &[16, 32]), "S_temp_buffer", scope);
    let stage = Stage::new("S").with_axes([("i", int(16)), ("j", int(32))]).bind("i", BLOCK_X).bind("j", THREAD_X);
    LoweringContext::new(tensors, [stage].into_iter().collect())
}

fn scratch_func() -> Expr {
    Expr::block(vec![
        Expr::alloc("S_temp_buffer", vec![int(16), int(32)], None),
        nest(
            &[("i", 16), ("j", 32)],
            Expr::store("S", Expr::load("A", vec![v("i") * int(32) + v("j")]), vec![v("i"), v("j")]),
        ),
    ])
}

#[test_case(MemoryScope::GpuShared, &[1, 32], [Expr::int(0), Expr::var("threadIdx.x")]; "shared_keeps_thread_dim")]
#[test_case(MemoryScope::GpuLocal, &[1, 1], [Expr::int(0), Expr::int(0)]; "local_keeps_nothing")]
#[test_case(MemoryScope::Heap, &[16, 32], [Expr::var("blockIdx.x"), Expr::var("threadIdx.x")]; "heap_untouched")]
fn test_temp_buffer_resized_by_scope(scope: MemoryScope, shape: &[i64], indices: [Expr; 2]) {
    let mut ctx = scratch_context(scope);
    let infos = ctx.stages.forloop_infos();
    let mut func = scratch_func();

    let resized = transform(&mut ctx, &infos, &["S"], &mut func);

    let buffer = ctx.tensors.buffer("S_temp_buffer").unwrap();
    assert_eq!(buffer.const_shape().unwrap(), shape);
    assert_eq!(resized.contains("S_temp_buffer"), scope.is_gpu_temp());

    let Expr::Block(stmts) = &func else { panic!("expected block, got {func}") };
    let Expr::Alloc(alloc) = &stmts[0] else { panic!("expected alloc") };
    assert_eq!(alloc.extents, shape.iter().map(|&d| Expr::int(d)).collect::<Vec<_>>());
    assert_eq!(loom_ir::helpers::find_store_indices(&func, "S"), vec![indices.to_vec()]);
}

#[test]
fn test_launch_extent_of_thread_axis_sizes_shared_dim() {
    // The thread axis extent comes from the launch dims, not the buffer.
    let mut ctx = scratch_context(MemoryScope::GpuShared);
    ctx.stages = [Stage::new("S").with_axes([("i", int(16)), ("j", int(64))]).bind("i", BLOCK_X).bind("j", THREAD_X)]
        .into_iter()
        .collect();
    let infos = ctx.stages.forloop_infos();
    let mut func = scratch_func();

    transform(&mut ctx, &infos, &["S"], &mut func);

    assert_eq!(ctx.tensors.buffer("S_temp_buffer").unwrap().const_shape().unwrap(), vec![1, 64]);
}
