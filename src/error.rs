use axum::http::StatusCode;

/// Failures the recommendation pipeline can report to its caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("Classification unavailable: {0}")]
    ClassificationUnavailable(String),

    #[error("Unknown genre: {0}")]
    UnknownGenre(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Seen-set persistence error: {0}")]
    Persistence(String),
}

impl RecommendError {
    /// Recoverable errors degrade to an empty result list instead of failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RecommendError::UnknownGenre(_) | RecommendError::Provider(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RecommendError::ClassificationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RecommendError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RecommendError::UnknownGenre(_) | RecommendError::Provider(_) => StatusCode::OK,
        }
    }
}

pub type RecommendResult<T> = Result<T, RecommendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fatal_errors_change_status() {
        assert!(RecommendError::UnknownGenre("x".into()).is_recoverable());
        assert!(RecommendError::Provider("x".into()).is_recoverable());
        assert!(!RecommendError::Persistence("x".into()).is_recoverable());
        assert_eq!(
            RecommendError::ClassificationUnavailable("cold".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RecommendError::Provider("502".into()).status_code(),
            StatusCode::OK
        );
    }
}
