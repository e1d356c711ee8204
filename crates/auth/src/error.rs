//! Access decision errors.

use serde::Serialize;
use thiserror::Error;

/// Denial raised by the access resolver and resource guards.
///
/// The contract with callers is the *kind*, not the message text: transport
/// layers translate kinds to their own presentation (status codes, bodies).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No authenticated caller identity was supplied.
    ///
    /// Recoverable through the caller's login flow; distinct from
    /// [`AccessError::Forbidden`].
    #[error("unauthenticated")]
    Unauthenticated,

    /// The target resource id does not exist.
    #[error("not found")]
    NotFound,

    /// The caller is authenticated but lacks the required membership/role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The membership store failed; safe to retry with backoff.
    ///
    /// Never produced for a policy decision — infrastructure failures must
    /// not masquerade as denials.
    #[error("membership store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AccessError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable(reason.into())
    }

    pub fn kind(&self) -> DenialKind {
        match self {
            Self::Unauthenticated => DenialKind::Unauthenticated,
            Self::NotFound => DenialKind::NotFound,
            Self::Forbidden(_) => DenialKind::Forbidden,
            Self::StoreUnavailable(_) => DenialKind::StoreUnavailable,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Machine-readable classification of an [`AccessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    NotFound,
    Forbidden,
    StoreUnavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_classify_every_variant() {
        assert_eq!(AccessError::Unauthenticated.kind(), DenialKind::Unauthenticated);
        assert_eq!(AccessError::NotFound.kind(), DenialKind::NotFound);
        assert_eq!(AccessError::forbidden("nope").kind(), DenialKind::Forbidden);
        assert_eq!(
            AccessError::store_unavailable("down").kind(),
            DenialKind::StoreUnavailable
        );
    }

    #[test]
    fn denial_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DenialKind::StoreUnavailable).unwrap(),
            "\"store_unavailable\""
        );
        assert_eq!(
            serde_json::to_string(&DenialKind::NotFound).unwrap(),
            "\"not_found\""
        );
    }

    #[test]
    fn only_store_failures_are_retriable() {
        assert!(AccessError::store_unavailable("down").is_retriable());
        assert!(!AccessError::forbidden("nope").is_retriable());
        assert!(!AccessError::NotFound.is_retriable());
        assert!(!AccessError::Unauthenticated.is_retriable());
    }
}
