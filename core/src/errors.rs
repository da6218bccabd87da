use thiserror::Error;

use crate::entitlements::{Limit, ResourceKind};

#[derive(Debug, Error)]
pub enum CozyError {
    #[error("Invalid argument: {0}")] InvalidArgument(String),
    #[error("Free plan is limited to {limit} {kind}")] LimitReached { kind: ResourceKind, limit: Limit },
    #[error("Invalid wallpaper catalog: {0}")] InvalidCatalog(String),
    #[error("Database unavailable")] DbUnavailable,
    #[error("Storage error: {0}")] Storage(String),
    #[error("Serialization error: {0}")] Serialization(#[from] serde_json::Error),
}

impl CozyError {
    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "GEN-1001",
            Self::LimitReached { .. } => "ENT-1001",
            Self::InvalidCatalog(_) => "WLP-1001",
            Self::DbUnavailable => "DB-1001",
            Self::Storage(_) => "DB-1002",
            Self::Serialization(_) => "GEN-1002",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "The caller passed a value outside the accepted set.",
            Self::LimitReached { .. } => "The free plan cap for this resource was reached. Upgrade to Premium to create more.",
            Self::InvalidCatalog(_) => "The wallpaper catalog configuration is missing a mood or repeats an id.",
            Self::DbUnavailable => "The application could not access the SQLite database.",
            Self::Storage(_) => "A SQLite statement against the subscription store failed.",
            Self::Serialization(_) => "A stored JSON payload could not be encoded or decoded.",
        }
    }
}
