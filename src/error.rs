//! Crate error type
//!
//! Absence ("no entry at this position/offset/name") is never an error:
//! it is reported through end sentinels and `None`. Errors here mean the
//! backing structure could not be read or decoded, and propagate to the
//! immediate caller of the triggering operation. Contract violations
//! (querying an end position, navigating from one) panic instead.

use crate::adapter::{AdapterError, Offset};

/// Fault raised while navigating or querying the entry tree.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reader adapter reported a decode or I/O fault.
    #[error("reader fault near offset {offset:#x}")]
    Adapter {
        offset: Offset,
        #[source]
        source: AdapterError,
    },

    /// A unit header was requested for an offset the unit cursor never
    /// produced, even after a full replay.
    #[error("no unit header known for offset {0:#x}")]
    UnknownUnit(Offset),
}

pub type Result<T> = std::result::Result<T, Error>;
