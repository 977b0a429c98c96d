use loom_ir::{Expr, ForKind, LaunchDims};

use crate::error::Error;
use crate::gpu::remove_gpu_forloops_axis;
use crate::test::helpers::*;

fn store_c(index: Expr) -> Expr {
    Expr::store("C", Expr::load("A", vec![index.clone()]), vec![index])
}

fn launch(func: &Expr) -> LaunchDims {
    func.as_lowered_func().expect("lowered func").launch
}

fn body(func: &Expr) -> &Expr {
    &func.as_lowered_func().expect("lowered func").body
}

#[test]
fn test_bound_loops_are_spliced_into_parent() {
    let index = v("blockIdx.x") * int(32) + v("threadIdx.x");
    let mut func = Expr::lowered_func("k", vec![], bound(BLOCK_X, 16, bound(THREAD_X, 32, store_c(index.clone()))));

    remove_gpu_forloops_axis(&mut func).unwrap();

    assert_eq!(body(&func), &store_c(index));
    let dims = launch(&func);
    assert!(dims.valid);
    assert_eq!(dims.grid, [16, 1, 1]);
    assert_eq!(dims.block, [32, 1, 1]);
}

#[test]
fn test_serial_loops_survive() {
    let inner = Expr::for_("k", int(0), int(4), store_c(v("threadIdx.x") + v("k")));
    let mut func = Expr::lowered_func("k", vec![], bound(THREAD_X, 8, inner.clone()));

    remove_gpu_forloops_axis(&mut func).unwrap();

    assert_eq!(body(&func), &inner);
    assert_eq!(launch(&func).block, [8, 1, 1]);
}

#[test]
fn test_loop_minimum_offsets_axis() {
    let offset_loop = Expr::for_kind("threadIdx.x", int(4), int(8), ForKind::Bound(THREAD_X), store_c(v("threadIdx.x")));
    let mut func = Expr::lowered_func("k", vec![], offset_loop);

    remove_gpu_forloops_axis(&mut func).unwrap();

    assert_eq!(body(&func), &store_c(v("threadIdx.x") + int(4)));
}

#[test]
fn test_unrenamed_iterator_is_rewritten_to_axis() {
    let loop_ = Expr::for_kind("i", int(0), int(8), ForKind::Bound(BLOCK_X), store_c(v("i")));
    let mut func = Expr::lowered_func("k", vec![], loop_);

    remove_gpu_forloops_axis(&mut func).unwrap();

    assert_eq!(body(&func), &store_c(v("blockIdx.x")));
}

#[test]
fn test_existing_launch_dims_are_merged() {
    let mut func = Expr::lowered_func("k", vec![], bound(THREAD_X, 8, store_c(v("threadIdx.x"))));
    if let Expr::LoweredFunc(f) = &mut func {
        f.launch.set(THREAD_X, 64);
        f.launch.set(BLOCK_Y, 2);
    }

    remove_gpu_forloops_axis(&mut func).unwrap();

    let dims = launch(&func);
    assert_eq!(dims.block, [64, 1, 1]);
    assert_eq!(dims.grid, [1, 2, 1]);
}

#[test]
fn test_removal_is_idempotent() {
    let mut func = Expr::lowered_func("k", vec![], bound(BLOCK_X, 16, store_c(v("blockIdx.x"))));

    remove_gpu_forloops_axis(&mut func).unwrap();
    let once = func.clone();
    remove_gpu_forloops_axis(&mut func).unwrap();

    assert_eq!(func, once);
}

#[test]
fn test_symbolic_extent_is_rejected() {
    let loop_ = Expr::for_kind("blockIdx.x", int(0), v("n"), ForKind::Bound(BLOCK_X), store_c(v("blockIdx.x")));
    let mut func = Expr::lowered_func("kernel", vec![], loop_);

    let err = remove_gpu_forloops_axis(&mut func).unwrap_err();

    assert_eq!(err, Error::NonConstantAxisExtent { function: "kernel".into(), axis: BLOCK_X, extent: v("n") });
    assert_eq!(err.to_string(), "function 'kernel': loop bound to blockIdx.x has non-constant extent n");
}

#[test]
fn test_bound_poly_loop_is_rejected() {
    let mut poly = Expr::poly_for("p", int(0), Expr::lt(v("p"), int(8)), int(1), store_c(v("p")));
    if let Expr::PolyFor(p) = &mut poly {
        p.kind = ForKind::Bound(THREAD_X);
    }
    let mut func = Expr::lowered_func("kernel", vec![], poly);

    let err = remove_gpu_forloops_axis(&mut func).unwrap_err();
    assert_eq!(err, Error::BoundPolyFor { function: "kernel".into(), iterator: "p".into() });
}

#[test]
fn test_module_functions_get_their_own_launch() {
    let mut module = Expr::module(
        "m",
        vec![
            Expr::lowered_func("a", vec![], bound(BLOCK_X, 4, store_c(v("blockIdx.x")))),
            Expr::lowered_func("b", vec![], bound(THREAD_Y, 2, store_c(v("threadIdx.y")))),
        ],
    );

    remove_gpu_forloops_axis(&mut module).unwrap();

    let Expr::Module(m) = &module else { unreachable!() };
    assert_eq!(launch(&m.functions[0]).grid, [4, 1, 1]);
    assert_eq!(launch(&m.functions[0]).block, [1, 1, 1]);
    assert_eq!(launch(&m.functions[1]).block, [1, 2, 1]);
}

#[test]
fn test_non_function_input_is_rejected() {
    let mut stmt = bound(BLOCK_X, 4, store_c(v("blockIdx.x")));
    assert_eq!(remove_gpu_forloops_axis(&mut stmt).unwrap_err(), Error::NotALoweredFunc { kind: "For" });

    let mut module = Expr::module("m", vec![Expr::block(vec![])]);
    assert_eq!(remove_gpu_forloops_axis(&mut module).unwrap_err(), Error::NotALoweredFunc { kind: "Block" });
}
