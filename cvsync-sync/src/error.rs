//! Error types for cvsync-sync.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use cvsync_core::BusinessCode;

use crate::service::ServiceError;

/// Which remote system a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// MetaContrata.
    Source,
    /// CVSecurity.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "MetaContrata"),
            Side::Target => write!(f, "CVSecurity"),
        }
    }
}

/// A write phase of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Create => write!(f, "create"),
            Phase::Update => write!(f, "update"),
            Phase::Delete => write!(f, "delete"),
        }
    }
}

/// All errors that can arise from a reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A listing call failed; nothing was written for this entity type.
    #[error("failed to fetch {what} from {side}: {source}")]
    Fetch {
        side: Side,
        what: &'static str,
        #[source]
        source: ServiceError,
    },

    /// A single department write failed; the remaining items were still attempted.
    #[error("failed to {phase} department {code}: {source}")]
    Write {
        phase: Phase,
        code: BusinessCode,
        #[source]
        source: ServiceError,
    },

    /// A bulk person write failed; later batches of the same phase were skipped.
    #[error("{phase} batch {batch} failed after {applied} applied batch(es): {source}")]
    Batch {
        phase: Phase,
        batch: usize,
        applied: usize,
        #[source]
        source: ServiceError,
    },
}

/// Convenience constructor for [`SyncError::Fetch`].
pub(crate) fn fetch_err(side: Side, what: &'static str) -> impl FnOnce(ServiceError) -> SyncError {
    move |source| SyncError::Fetch { side, what, source }
}

/// Serialize a list of errors as their display strings (report JSON output).
pub(crate) fn serialize_errors<S: serde::Serializer>(
    errors: &[SyncError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}
