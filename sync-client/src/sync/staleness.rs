//! Staleness comparison between two readings for the same resource
//!
//! The whole engine relies on this comparison instead of arrival order: a
//! race between a pull response and a push event in flight must never let a
//! stale value overwrite a newer one.

use crate::sync::resource::ResourceValue;

/// Decide whether `candidate` should replace `incumbent`.
///
/// - No incumbent: candidate is newer (bootstrap case).
/// - Both timestamped: strict greater-than wins; ties keep the incumbent.
/// - Either side lacks a timestamp: staleness cannot be proven, so the
///   fresher-arriving candidate wins. This favors push events, which are
///   more specific than a bulk pull.
pub fn is_newer(candidate: &ResourceValue, incumbent: Option<&ResourceValue>) -> bool {
    match incumbent {
        None => true,
        Some(incumbent) => newer_observation(candidate.observed_at, incumbent.observed_at),
    }
}

/// Timestamp-only comparison used by [`is_newer`]
pub fn newer_observation(candidate: Option<i64>, incumbent: Option<i64>) -> bool {
    match (candidate, incumbent) {
        (Some(candidate), Some(incumbent)) => candidate > incumbent,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::resource::{ResourceAttributes, ResourceKey};

    fn value(observed_at: Option<i64>) -> ResourceValue {
        ResourceValue {
            key: ResourceKey::DeviceSensor(1),
            attributes: ResourceAttributes::default(),
            value: serde_json::json!(0),
            observed_at,
        }
    }

    #[test]
    fn test_absent_incumbent_is_always_older() {
        assert!(is_newer(&value(Some(10)), None));
        assert!(is_newer(&value(None), None));
    }

    #[test]
    fn test_strictly_greater_timestamp_wins() {
        assert!(is_newer(&value(Some(11)), Some(&value(Some(10)))));
        assert!(!is_newer(&value(Some(9)), Some(&value(Some(10)))));
    }

    #[test]
    fn test_tie_keeps_incumbent() {
        assert!(!is_newer(&value(Some(10)), Some(&value(Some(10)))));
    }

    #[test]
    fn test_missing_timestamp_prefers_candidate() {
        // Cannot prove staleness in any of these, so the fresher arrival wins
        assert!(is_newer(&value(None), Some(&value(Some(10)))));
        assert!(is_newer(&value(Some(10)), Some(&value(None))));
        assert!(is_newer(&value(None), Some(&value(None))));
    }
}
