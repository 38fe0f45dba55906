use thiserror::Error;

/// How a failed fetch is treated by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Provider answered 429 or 403.
    RateLimited,
    /// Anything else: transport errors, other statuses, bad payloads.
    NetworkFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("rate limited by provider (HTTP {status})")]
    RateLimited { status: u16 },
    #[error("request failed: {0}")]
    Network(String),
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::RateLimited { .. } => FailureKind::RateLimited,
            FetchError::Network(_) | FetchError::Decode(_) => FailureKind::NetworkFailure,
        }
    }

    /// Maps an HTTP status code onto a failure, `None` for success codes.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            429 | 403 => Some(FetchError::RateLimited { status }),
            other => Some(FetchError::Network(format!("HTTP status {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(FetchError::from_status(200), None);
        assert_eq!(
            FetchError::from_status(429).map(|e| e.kind()),
            Some(FailureKind::RateLimited)
        );
        assert_eq!(
            FetchError::from_status(403).map(|e| e.kind()),
            Some(FailureKind::RateLimited)
        );
        assert_eq!(
            FetchError::from_status(500).map(|e| e.kind()),
            Some(FailureKind::NetworkFailure)
        );
        assert_eq!(
            FetchError::from_status(404).map(|e| e.kind()),
            Some(FailureKind::NetworkFailure)
        );
    }

    #[test]
    fn test_decode_is_generic_failure() {
        let err = FetchError::Decode("missing field `rates`".to_string());
        assert_eq!(err.kind(), FailureKind::NetworkFailure);
    }
}
