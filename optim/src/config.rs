//! Lowering configuration.
//!
//! Provides typed configuration for the lowering passes with bon builders.
//! Supports both explicit configuration and environment variable fallbacks.

use bon::bon;

/// Default bound on inline expansion rounds.
pub const DEFAULT_MAX_INLINE_ROUNDS: usize = 64;

/// Configuration shared by the passes of one lowering run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerConfig {
    /// Upper bound on expand-then-rescan rounds of compute-inline expansion.
    pub max_inline_rounds: usize,
    /// Run barrier insertion after device-axis binding.
    pub insert_sync_threads: bool,
    /// Verify that no load of an inlined tensor survives expansion.
    pub check_completeness: bool,
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self { max_inline_rounds: DEFAULT_MAX_INLINE_ROUNDS, insert_sync_threads: true, check_completeness: true }
    }
}

#[bon]
impl LowerConfig {
    /// Create a lowering configuration with builder pattern.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(default = DEFAULT_MAX_INLINE_ROUNDS)] max_inline_rounds: usize,
        #[builder(default = true)] insert_sync_threads: bool,
        #[builder(default = true)] check_completeness: bool,
    ) -> Self {
        Self { max_inline_rounds: max_inline_rounds.max(1), insert_sync_threads, check_completeness }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `LOOM_MAX_INLINE_ROUNDS` - Inline expansion round limit (default: 64)
    /// * `LOOM_NO_SYNC_THREADS` - Skip barrier insertion if set
    /// * `LOOM_SKIP_INLINE_CHECK` - Skip the inline completeness check if set
    pub fn from_env() -> Self {
        let max_inline_rounds = std::env::var("LOOM_MAX_INLINE_ROUNDS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_INLINE_ROUNDS);
        let insert_sync_threads = std::env::var("LOOM_NO_SYNC_THREADS").is_err();
        let check_completeness = std::env::var("LOOM_SKIP_INLINE_CHECK").is_err();

        Self { max_inline_rounds, insert_sync_threads, check_completeness }
    }
}
