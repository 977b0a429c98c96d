//! Property-based tests for the lowering passes.

mod inline_props;
