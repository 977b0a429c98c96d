use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Tensor is referenced but has no record in the arena.
    #[snafu(display("unknown tensor '{name}'"))]
    UnknownTensor { name: String },

    /// Buffer is referenced but has no record in the arena.
    #[snafu(display("unknown buffer '{name}'"))]
    UnknownBuffer { name: String },

    /// Tensor is asked for its inline expansion but has no compute body.
    #[snafu(display("tensor '{tensor}' has no compute body to inline"))]
    MissingInlineExpansion { tensor: String },

    /// Load index count differs from the tensor's axis count.
    #[snafu(display("tensor '{tensor}' expects {expected} indices, got {got}"))]
    ArityMismatch { tensor: String, expected: usize, got: usize },

    /// Stage computes at more than one parent.
    #[snafu(display("tensor '{tensor}' computes at {count} parents; at most one is allowed"))]
    MultipleComputeAt { tensor: String, count: usize },
}
