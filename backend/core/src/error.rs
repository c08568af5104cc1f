use thiserror::Error;

use crate::types::{Provider, ResourceKind};

/// Top-level error type for permission resolution and policy synthesis.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{kind} {type_name} not implemented")]
    NotImplemented { type_name: String, kind: ResourceKind },

    #[error("provider '{0}' not supported")]
    UnsupportedProvider(String),

    #[error("invalid resource record: {0}")]
    InvalidRecord(String),

    #[error("malformed attributes at '{path}': {reason}")]
    MalformedAttributes { path: String, reason: String },

    #[error("malformed {side} document: {reason}")]
    MalformedDocument { side: String, reason: String },

    #[error("cannot merge {left} policy with {right} policy")]
    ProviderMismatch { left: Provider, right: Provider },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PolicyError {
    /// True for failures scoped to a single resource; a scan records these and
    /// keeps going.
    pub fn is_per_resource(&self) -> bool {
        matches!(
            self,
            Self::NotImplemented { .. } | Self::UnsupportedProvider(_) | Self::InvalidRecord(_)
        )
    }

    pub fn malformed_document(side: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedDocument {
            side: side.into(),
            reason: reason.to_string(),
        }
    }
}
