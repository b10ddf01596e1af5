// Streaming Error Types

use bilijean_providers::ProviderClientError;

use super::constants::StreamingCategory;

/// Errors raised while normalizing pages or negotiating a stream source
#[derive(Debug, thiserror::Error)]
pub enum StreamingError {
    #[error("{category} resource not found")]
    NotFound { category: StreamingCategory },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] ProviderClientError),

    #[error("No matching candidate: {0}")]
    NoMatchingCandidate(String),

    #[error("No component registered for category {0}")]
    UnregisteredCategory(StreamingCategory),

    #[error("Expected a {expected} response, got {actual}")]
    CategoryMismatch {
        expected: StreamingCategory,
        actual: StreamingCategory,
    },
}

impl StreamingError {
    /// Whether the caller can fix the failure by changing its input, as
    /// opposed to the platform being unavailable or returning nothing usable.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        match self {
            Self::InvalidArgument(_) | Self::CategoryMismatch { .. } | Self::UnregisteredCategory(_) => true,
            Self::Upstream(ProviderClientError::InvalidArgument(_)) => true,
            Self::NotFound { .. } | Self::Upstream(_) | Self::NoMatchingCandidate(_) => false,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StreamingError>;
