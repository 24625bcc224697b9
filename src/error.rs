use thiserror::Error;

/// Errors produced while building, extracting or projecting a grammar.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The token stream broke an ordering or range assumption.
    #[error("input contract violated at token {position}: {reason}")]
    InputContractViolation { position: usize, reason: String },

    /// A token was appended after the grammar was finalized.
    #[error("grammar is finalized and can no longer be modified")]
    Finalized,

    /// A read-only stage was handed a grammar that is still being built.
    #[error("grammar must be finalized before it can be extracted")]
    NotFinalized,

    /// An engine invariant (digram uniqueness, rule utility, reachability)
    /// does not hold. This is always an engine bug.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    /// Parameters were rejected before any work started.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn input(position: usize, reason: impl Into<String>) -> Self {
        Error::InputContractViolation {
            position,
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::Configuration(reason.into())
    }

    pub(crate) fn internal(reason: impl Into<String>) -> Self {
        Error::InternalConsistency(reason.into())
    }
}
