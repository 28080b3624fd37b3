#![forbid(unsafe_code)]

use lakescope_core::{ConnectionId, ScopeId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickerError {
    #[error("fetch failed for column {column}: {message}")]
    FetchFailure { column: usize, message: String },
    #[error("stale response for connection {owner}")]
    StaleResponse { owner: ConnectionId },
    #[error("selection id {0} has no loaded node")]
    UnresolvableSelection(ScopeId),
    #[error("unknown column {0}")]
    UnknownColumn(usize),
    #[error("unknown node {0}")]
    UnknownNode(ScopeId),
}

pub type PickerResult<T> = Result<T, PickerError>;
