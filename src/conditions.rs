//! Kubernetes-standard status condition helpers
//!
//! Every managed resource carries two conditions: `Ready` describes the
//! external resource, `Synced` describes the last reconcile attempt.

use crate::crd::Condition;
use chrono::Utc;

// Condition status values
pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";
pub const CONDITION_UNKNOWN: &str = "Unknown";

// Condition types
pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_SYNCED: &str = "Synced";

// Ready reasons
pub const REASON_AVAILABLE: &str = "Available";
pub const REASON_UNAVAILABLE: &str = "Unavailable";
pub const REASON_CREATING: &str = "Creating";
pub const REASON_DELETING: &str = "Deleting";

// Synced reasons
pub const REASON_RECONCILE_SUCCESS: &str = "ReconcileSuccess";
pub const REASON_RECONCILE_ERROR: &str = "ReconcileError";

/// Finalizer placed on every managed resource.
pub const MANAGED_FINALIZER: &str = "finalizer.managedresource.crossplane.io";

/// Build a condition with the current timestamp.
pub fn build_condition(condition_type: &str, status: &str, reason: &str, message: &str) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        last_transition_time: Some(Utc::now().to_rfc3339()),
        reason: Some(reason.to_string()),
        message: if message.is_empty() {
            None
        } else {
            Some(message.to_string())
        },
    }
}

/// The external resource is ready for use.
pub fn available() -> Condition {
    build_condition(CONDITION_READY, CONDITION_TRUE, REASON_AVAILABLE, "")
}

/// The external resource exists but is not ready for use.
pub fn unavailable() -> Condition {
    build_condition(CONDITION_READY, CONDITION_FALSE, REASON_UNAVAILABLE, "")
}

/// The external resource is being created.
pub fn creating() -> Condition {
    build_condition(CONDITION_READY, CONDITION_FALSE, REASON_CREATING, "")
}

/// The external resource is being deleted.
pub fn deleting() -> Condition {
    build_condition(CONDITION_READY, CONDITION_FALSE, REASON_DELETING, "")
}

pub fn reconcile_success() -> Condition {
    build_condition(CONDITION_SYNCED, CONDITION_TRUE, REASON_RECONCILE_SUCCESS, "")
}

pub fn reconcile_error(message: &str) -> Condition {
    build_condition(CONDITION_SYNCED, CONDITION_FALSE, REASON_RECONCILE_ERROR, message)
}

/// Set or update a condition in a list, preserving lastTransitionTime when status hasn't changed.
pub fn set_condition(conditions: &mut Vec<Condition>, new: Condition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == new.r#type) {
        if existing.status != new.status {
            *existing = new;
        } else {
            existing.reason = new.reason;
            existing.message = new.message;
        }
    } else {
        conditions.push(new);
    }
}

/// Look up a condition by type.
pub fn get_condition<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Status of a condition type, `Unknown` when it has never been set.
pub fn condition_status<'a>(conditions: &'a [Condition], condition_type: &str) -> &'a str {
    get_condition(conditions, condition_type)
        .map(|c| c.status.as_str())
        .unwrap_or(CONDITION_UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_condition() {
        let cond = build_condition(CONDITION_READY, CONDITION_TRUE, "Available", "all good");
        assert_eq!(cond.r#type, "Ready");
        assert_eq!(cond.status, "True");
        assert!(cond.last_transition_time.is_some());
        assert_eq!(cond.reason.as_deref(), Some("Available"));
        assert_eq!(cond.message.as_deref(), Some("all good"));
    }

    #[test]
    fn test_empty_message_is_omitted() {
        let cond = available();
        assert!(cond.message.is_none());
    }

    #[test]
    fn test_set_condition_adds_new() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, available());
        set_condition(&mut conditions, reconcile_success());
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_set_condition_preserves_transition_time_on_same_status() {
        let mut conditions = vec![Condition {
            r#type: CONDITION_READY.to_string(),
            status: CONDITION_FALSE.to_string(),
            last_transition_time: Some("2024-01-01T00:00:00Z".to_string()),
            reason: Some(REASON_CREATING.to_string()),
            message: None,
        }];

        set_condition(&mut conditions, unavailable());

        assert_eq!(conditions.len(), 1);
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(conditions[0].reason.as_deref(), Some(REASON_UNAVAILABLE));
    }

    #[test]
    fn test_set_condition_updates_transition_time_on_status_change() {
        let mut conditions = vec![Condition {
            r#type: CONDITION_SYNCED.to_string(),
            status: CONDITION_FALSE.to_string(),
            last_transition_time: Some("2024-01-01T00:00:00Z".to_string()),
            reason: Some(REASON_RECONCILE_ERROR.to_string()),
            message: Some("boom".to_string()),
        }];

        set_condition(&mut conditions, reconcile_success());

        assert_eq!(conditions.len(), 1);
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert!(conditions[0].message.is_none());
    }

    #[test]
    fn test_get_condition() {
        let conditions = vec![creating(), reconcile_error("cannot connect")];
        let synced = get_condition(&conditions, CONDITION_SYNCED).unwrap();
        assert_eq!(synced.message.as_deref(), Some("cannot connect"));
        assert!(get_condition(&conditions, "Missing").is_none());
    }

    #[test]
    fn test_condition_status_defaults_to_unknown() {
        let conditions = vec![available()];
        assert_eq!(condition_status(&conditions, CONDITION_READY), CONDITION_TRUE);
        assert_eq!(condition_status(&conditions, CONDITION_SYNCED), CONDITION_UNKNOWN);
    }
}
