use thiserror::Error;

/// Errors reported by [`RankedTree`](crate::RankedTree) and its enumerators.
///
/// Every error is raised before any change is applied, so a failed call leaves
/// the tree exactly as it was. The one delayed error is
/// [`ConcurrentModification`](Error::ConcurrentModification): the mutation that
/// causes it succeeds, and the error surfaces on the next step of any
/// enumerator created before that mutation.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// An argument was out of range: an index past the end, a count running off
    /// the end, or an order outside the supported bounds.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        name: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A lookup that requires the key to be present did not find it.
    #[error("key not found")]
    KeyNotFound,

    /// The tree was modified after the enumerator last synchronized with it.
    #[error("collection was modified; enumeration operation may not execute")]
    ConcurrentModification,

    /// The sanity checker found a broken structural invariant. This indicates a
    /// bug in the engine, never a usage error.
    #[error("structural invariant violated: {0}")]
    StructuralInvariantViolation(alloc::string::String),
}

/// A `Result` alias with [`Error`] as the error type.
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) const fn invalid_argument(name: &'static str, reason: &'static str) -> Self {
        Error::InvalidArgument {
            name,
            reason,
        }
    }
}
