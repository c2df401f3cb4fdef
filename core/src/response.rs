//! Normalizes how the API signals "missing" versus "empty".
//!
//! Single-entity operations must receive a payload: a missing one is an
//! `InvalidResponse`, never "not found". Collections inside a list response
//! degrade to empty when absent.

use tracing::warn;

use crate::error::ApiError;

/// Unwrap a payload that the operation contract says must be present.
pub fn require<T>(payload: Option<T>, what: &str) -> Result<T, ApiError> {
    payload.ok_or_else(|| {
        warn!(what, "transport succeeded without a payload");
        ApiError::InvalidResponse(format!("{what}: response had no payload"))
    })
}

/// Treat an absent collection as empty.
pub fn or_empty<T>(items: Option<Vec<T>>) -> Vec<T> {
    items.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_passes_payload_through() {
        assert_eq!(require(Some(5), "task").unwrap(), 5);
    }

    #[test]
    fn require_rejects_missing_payload() {
        let err = require::<u8>(None, "get_task").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(ref m) if m.contains("get_task")));
        assert!(!err.is_not_found());
    }

    #[test]
    fn missing_collection_is_empty() {
        assert!(or_empty::<u8>(None).is_empty());
        assert_eq!(or_empty(Some(vec![1, 2])), vec![1, 2]);
    }
}
