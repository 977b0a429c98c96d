//! Properties of compute-inline expansion.

use loom_ir::helpers::collect_load_tensors;
use loom_ir::{Expr, Stage};
use proptest::prelude::*;

use super::generators::arb_index_expr;
use crate::context::LoweringContext;
use crate::inline::compute_inline_expand;
use crate::test::helpers::*;

/// `B[x] = A[x] + 1` inlined, `A` and `C` materialized.
fn ctx() -> LoweringContext {
    context(
        [input("A", &[64]), computed("B", &[64], &["x"], Expr::load("A", vec![v("x")]) + int(1)), input("C", &[64])],
        [Stage::new("A"), Stage::new("B").inline(), Stage::new("C")],
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// No load of an inlined tensor survives expansion.
    #[test]
    fn expansion_leaves_no_inline_loads(idx in arb_index_expr(true), value in arb_index_expr(true)) {
        let ctx = ctx();
        let mut func = Expr::store("C", value + Expr::load("B", vec![idx.clone()]), vec![idx]);

        compute_inline_expand(&ctx, &mut func).unwrap();

        prop_assert!(collect_load_tensors(&func, |t| t == "B").is_empty(), "left over: {}", func);
    }

    /// Expanding an already expanded tree changes nothing.
    #[test]
    fn expansion_is_idempotent(idx in arb_index_expr(true)) {
        let ctx = ctx();
        let mut func = Expr::store("C", Expr::load("B", vec![idx.clone()]), vec![idx]);

        compute_inline_expand(&ctx, &mut func).unwrap();
        let once = func.clone();
        compute_inline_expand(&ctx, &mut func).unwrap();

        prop_assert_eq!(func, once);
    }

    /// A tree without inlined loads is left untouched.
    #[test]
    fn trees_without_inline_loads_are_unchanged(idx in arb_index_expr(false), value in arb_index_expr(false)) {
        let ctx = ctx();
        let original = Expr::store("C", value, vec![idx]);
        let mut func = original.clone();

        compute_inline_expand(&ctx, &mut func).unwrap();

        prop_assert_eq!(func, original);
    }

    /// The actual index is spliced in verbatim, even when it mentions the
    /// formal axis name.
    #[test]
    fn actual_index_is_not_rescanned(idx in arb_index_expr(false)) {
        let ctx = ctx();
        let mut func = Expr::store("C", Expr::load("B", vec![idx.clone()]), vec![int(0)]);

        compute_inline_expand(&ctx, &mut func).unwrap();

        let expected = Expr::store("C", Expr::load("A", vec![idx]) + int(1), vec![int(0)]);
        prop_assert_eq!(func, expected);
    }
}
