use loom_ir::{Expr, MemoryScope, Stage, StageMap, TensorMap};

use crate::context::LoweringContext;
use crate::gpu::insert_sync_threads;
use crate::test::helpers::*;

/// `S` in shared memory, `G` on the heap, `raw_shared` a bare shared buffer.
fn ctx() -> LoweringContext {
    let mut tensors = TensorMap::new();
    with_backing(&mut tensors, input("S", &[32]), "S_temp_buffer", MemoryScope::GpuShared);
    with_backing(&mut tensors, input("G", &[32]), "G", MemoryScope::Heap);
    tensors.insert_buffer(buffer("raw_shared", &[32], MemoryScope::GpuShared));
    LoweringContext::new(tensors, StageMap::new())
}

fn shared_write() -> Expr {
    Expr::store("S", int(1), vec![v("threadIdx.x")])
}

fn guarded(then: Expr) -> Expr {
    Expr::if_then_else(Expr::lt(v("threadIdx.x"), int(16)), then, None)
}

#[test]
fn test_barrier_before_divergent_shared_write() {
    let mut func = Expr::block(vec![Expr::store("G", int(0), vec![]), guarded(shared_write())]);

    let inserted = insert_sync_threads(&ctx(), &mut func);

    assert_eq!(inserted, 1);
    assert_eq!(func, Expr::block(vec![Expr::store("G", int(0), vec![]), Expr::sync_threads(), guarded(shared_write())]));
}

#[test]
fn test_heap_write_needs_no_barrier() {
    let original = Expr::block(vec![guarded(Expr::store("G", int(1), vec![v("threadIdx.x")]))]);
    let mut func = original.clone();

    assert_eq!(insert_sync_threads(&ctx(), &mut func), 0);
    assert_eq!(func, original);
}

#[test]
fn test_unconditional_shared_write_needs_no_barrier() {
    let original = Expr::block(vec![shared_write()]);
    let mut func = original.clone();

    assert_eq!(insert_sync_threads(&ctx(), &mut func), 0);
    assert_eq!(func, original);
}

#[test]
fn test_write_in_else_branch_counts() {
    let cond = Expr::if_then_else(v("c"), Expr::store("G", int(0), vec![]), Some(shared_write()));
    let mut func = Expr::block(vec![cond.clone()]);

    insert_sync_threads(&ctx(), &mut func);

    assert_eq!(func, Expr::block(vec![Expr::sync_threads(), cond]));
}

#[test]
fn test_raw_shared_buffer_write_counts() {
    let cond = guarded(Expr::store_buffer("raw_shared", int(1), vec![v("threadIdx.x")]));
    let mut func = Expr::block(vec![cond.clone()]);

    assert_eq!(insert_sync_threads(&ctx(), &mut func), 1);
    assert_eq!(func, Expr::block(vec![Expr::sync_threads(), cond]));
}

#[test]
fn test_only_outermost_conditional_gets_barrier() {
    let nested = guarded(Expr::block(vec![guarded(shared_write())]));
    let mut func = Expr::block(vec![nested.clone()]);

    assert_eq!(insert_sync_threads(&ctx(), &mut func), 1);
    assert_eq!(func, Expr::block(vec![Expr::sync_threads(), nested]));
}

#[test]
fn test_existing_barrier_is_reused() {
    let original = Expr::block(vec![Expr::sync_threads(), guarded(shared_write())]);
    let mut func = original.clone();

    assert_eq!(insert_sync_threads(&ctx(), &mut func), 0);
    assert_eq!(func, original);
}

#[test]
fn test_lone_conditional_is_wrapped() {
    let mut func = Expr::lowered_func("k", vec![], guarded(shared_write()));

    insert_sync_threads(&ctx(), &mut func);

    let expected = Expr::lowered_func("k", vec![], Expr::block(vec![Expr::sync_threads(), guarded(shared_write())]));
    assert_eq!(func, expected);
}

#[test]
fn test_conditional_inside_loop() {
    let mut func = nest(&[("k", 4)], Expr::block(vec![guarded(shared_write())]));

    insert_sync_threads(&ctx(), &mut func);

    assert_eq!(func, nest(&[("k", 4)], Expr::block(vec![Expr::sync_threads(), guarded(shared_write())])));
}

#[test]
#[tracing_test::traced_test]
fn test_insertion_is_idempotent() {
    let mut func = Expr::block(vec![guarded(shared_write()), Expr::store("G", int(0), vec![]), guarded(shared_write())]);

    assert_eq!(insert_sync_threads(&ctx(), &mut func), 2);
    let once = func.clone();
    assert_eq!(insert_sync_threads(&ctx(), &mut func), 0);

    assert_eq!(func, once);
    assert!(logs_contain("inserted barriers"));
}

#[test]
fn test_stage_scope_marks_unbacked_tensor_shared() {
    // No buffer record: the stage scope decides.
    let ctx = context([input("T", &[32])], [Stage::new("T").with_scope(MemoryScope::GpuShared)]);
    let write = Expr::store("T", int(1), vec![v("threadIdx.x")]);
    let mut func = Expr::block(vec![Expr::if_then_else(v("c"), write.clone(), None)]);

    assert_eq!(insert_sync_threads(&ctx, &mut func), 1);
    assert_eq!(func, Expr::block(vec![Expr::sync_threads(), Expr::if_then_else(v("c"), write, None)]));
}

#[test]
fn test_buffer_scope_wins_over_stage_scope() {
    let mut tensors = TensorMap::new();
    with_backing(&mut tensors, input("H", &[32]), "H", MemoryScope::Heap);
    let stages: StageMap = [Stage::new("H").with_scope(MemoryScope::GpuShared)].into_iter().collect();
    let ctx = LoweringContext::new(tensors, stages);
    let mut func = Expr::if_then_else(v("c"), Expr::store("H", int(1), vec![int(0)]), None);

    assert_eq!(insert_sync_threads(&ctx, &mut func), 0);
}
