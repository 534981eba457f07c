//! Conversion between managed resource parameters and GCP API objects
//!
//! Every kind follows the same outline:
//! - `generate_*` writes the desired parameters over a GCP object. Starting
//!   from a default object yields the create request; starting from a copy
//!   of the observed object and comparing the result with the original
//!   tells whether the external resource is up to date.
//! - `generate_*_observation` copies output-only fields into `atProvider`.
//! - `late_initialize_*` fills unset parameters from the observed object so
//!   the spec reflects server-side defaults.
//!
//! These functions never talk to GCP; the controllers do.

pub mod cache;
pub mod compute;
pub mod database;
pub mod iam;
pub mod kms;
pub mod pubsub;
pub mod storage;

use std::collections::BTreeMap;

/// Overwrite `target` when the desired value is set.
pub fn set_if_some<T: Clone>(target: &mut Option<T>, desired: &Option<T>) {
    if desired.is_some() {
        target.clone_from(desired);
    }
}

/// Overwrite `target` when the desired list is non-empty.
pub fn set_if_not_empty<T: Clone>(target: &mut Vec<T>, desired: &[T]) {
    if !desired.is_empty() {
        *target = desired.to_vec();
    }
}

/// Overwrite `target` when the desired map is non-empty.
pub fn set_map_if_not_empty(target: &mut BTreeMap<String, String>, desired: &BTreeMap<String, String>) {
    if !desired.is_empty() {
        target.clone_from(desired);
    }
}

/// Fill an unset parameter from its observed value.
pub fn late_init<T: Clone>(field: &mut Option<T>, observed: &Option<T>) {
    if field.is_none() {
        field.clone_from(observed);
    }
}

pub fn late_init_vec<T: Clone>(field: &mut Vec<T>, observed: &[T]) {
    if field.is_empty() {
        *field = observed.to_vec();
    }
}

pub fn late_init_map(field: &mut BTreeMap<String, String>, observed: &BTreeMap<String, String>) {
    if field.is_empty() {
        field.clone_from(observed);
    }
}

/// Comma separated field mask as the GCP `updateMask` parameter expects.
pub fn update_mask(fields: &[&str]) -> String {
    fields.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_if_some() {
        let mut target = Some("observed".to_string());
        set_if_some(&mut target, &None);
        assert_eq!(target.as_deref(), Some("observed"));
        set_if_some(&mut target, &Some("desired".to_string()));
        assert_eq!(target.as_deref(), Some("desired"));
    }

    #[test]
    fn test_late_init_keeps_user_value() {
        let mut field = Some(10);
        late_init(&mut field, &Some(20));
        assert_eq!(field, Some(10));

        let mut unset = None;
        late_init(&mut unset, &Some(20));
        assert_eq!(unset, Some(20));
    }

    #[test]
    fn test_late_init_collections() {
        let mut tags: Vec<String> = vec![];
        late_init_vec(&mut tags, &["a".to_string()]);
        assert_eq!(tags, vec!["a"]);

        let mut labels = BTreeMap::from([("k".to_string(), "mine".to_string())]);
        late_init_map(&mut labels, &BTreeMap::from([("k".to_string(), "theirs".to_string())]));
        assert_eq!(labels["k"], "mine");
    }

    #[test]
    fn test_update_mask() {
        assert_eq!(update_mask(&["labels", "ackDeadlineSeconds"]), "labels,ackDeadlineSeconds");
        assert_eq!(update_mask(&[]), "");
    }
}
