use thiserror::Error;

use crate::cache::FetchError;
use crate::config::LoadError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;
use crate::infra::transport::ApiError;

/// Why a mutation did not go through. The cache is untouched in every case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    /// Rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl MutationError {
    /// Alert text for the control that issued the mutation. Cancelled requests have none.
    pub fn user_message(&self) -> Option<String> {
        match self {
            MutationError::Validation(err) => Some(err.to_string()),
            MutationError::Api(err) => err.user_message(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MutationError::Api(err) if err.is_cancelled())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Message shown to a person at a terminal, preferring the alert text of API failures.
    pub fn presentation_message(&self) -> String {
        let alert = match self {
            AppError::Api(err) | AppError::Fetch(FetchError::Api(err)) => err.user_message(),
            AppError::Mutation(err) => err.user_message(),
            _ => None,
        };
        alert.unwrap_or_else(|| self.to_string())
    }
}
