//! Error taxonomy shared by both table families.

use std::collections::TryReserveError;

/// Errors surfaced by table and bag operations.
///
/// Lookups never fail: an absent key is `None`, not an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The requested or required slot capacity cannot be represented or
    /// allocated. The table is left exactly as it was.
    CapacityExceeded {
        /// Number of slots (or entries) that was asked for.
        requested: usize,
    },

    /// An argument was rejected before any state changed (negative
    /// occurrence counts, counter overflow, invalid load factor).
    IllegalArgument(String),
}

impl Error {
    pub(crate) fn capacity(requested: usize) -> Self {
        log::debug!("rejecting capacity request of {requested} slots");
        Self::CapacityExceeded { requested }
    }

    pub(crate) fn from_reserve(requested: usize, _err: TryReserveError) -> Self {
        Self::capacity(requested)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded { requested } => {
                write!(f, "capacity exceeded: cannot hold {requested} slots")
            }
            Self::IllegalArgument(reason) => write!(f, "illegal argument: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

/// Table result
pub type Result<T> = std::result::Result<T, Error>;
