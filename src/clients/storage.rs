//! Bucket conversion

use super::{late_init, set_if_some, set_map_if_not_empty};
use crate::crd::{
    BucketCors, BucketLifecycleAction, BucketLifecycleCondition, BucketLifecycleRule,
    BucketLogging, BucketObservation, BucketParameters, BucketRetentionPolicy, BucketVersioning,
    BucketWebsite,
};
use crate::gcp::storage;

pub fn generate_bucket(name: &str, params: &BucketParameters, target: &mut storage::Bucket) {
    target.name = name.to_string();
    target.location = params.location.clone();
    set_if_some(&mut target.storage_class, &params.storage_class);
    set_map_if_not_empty(&mut target.labels, &params.labels);
    if let Some(v) = &params.versioning {
        target.versioning = Some(storage::Versioning { enabled: v.enabled });
    }
    if let Some(enabled) = params.uniform_bucket_level_access {
        let iam = target.iam_configuration.get_or_insert_with(Default::default);
        let ubla = iam
            .uniform_bucket_level_access
            .get_or_insert_with(Default::default);
        ubla.enabled = enabled;
    }
    if let Some(requester_pays) = params.requester_pays {
        target.billing = Some(storage::Billing { requester_pays });
    }
    set_if_some(&mut target.default_event_based_hold, &params.default_event_based_hold);
    if let Some(rp) = &params.retention_policy {
        let policy = target.retention_policy.get_or_insert_with(Default::default);
        policy.retention_period = rp.retention_period.to_string();
    }
    if !params.lifecycle_rules.is_empty() {
        target.lifecycle = Some(storage::Lifecycle {
            rule: params.lifecycle_rules.iter().map(to_lifecycle_rule).collect(),
        });
    }
    if !params.cors.is_empty() {
        target.cors = params.cors.iter().map(to_cors).collect();
    }
    if let Some(w) = &params.website {
        target.website = Some(storage::Website {
            main_page_suffix: w.main_page_suffix.clone(),
            not_found_page: w.not_found_page.clone(),
        });
    }
    if let Some(l) = &params.logging {
        target.logging = Some(storage::Logging {
            log_bucket: l.log_bucket.clone(),
            log_object_prefix: l.log_object_prefix.clone(),
        });
    }
    if params.default_kms_key_name.is_some() {
        target.encryption = Some(storage::Encryption {
            default_kms_key_name: params.default_kms_key_name.clone(),
        });
    }
}

fn to_lifecycle_rule(rule: &BucketLifecycleRule) -> storage::LifecycleRule {
    storage::LifecycleRule {
        action: storage::LifecycleAction {
            r#type: rule.action.r#type.clone(),
            storage_class: rule.action.storage_class.clone(),
        },
        condition: storage::LifecycleCondition {
            age: rule.condition.age,
            created_before: rule.condition.created_before.clone(),
            is_live: rule.condition.is_live,
            matches_storage_class: rule.condition.matches_storage_class.clone(),
            num_newer_versions: rule.condition.num_newer_versions,
        },
    }
}

fn from_lifecycle_rule(rule: &storage::LifecycleRule) -> BucketLifecycleRule {
    BucketLifecycleRule {
        action: BucketLifecycleAction {
            r#type: rule.action.r#type.clone(),
            storage_class: rule.action.storage_class.clone(),
        },
        condition: BucketLifecycleCondition {
            age: rule.condition.age,
            created_before: rule.condition.created_before.clone(),
            is_live: rule.condition.is_live,
            matches_storage_class: rule.condition.matches_storage_class.clone(),
            num_newer_versions: rule.condition.num_newer_versions,
        },
    }
}

fn to_cors(c: &BucketCors) -> storage::Cors {
    storage::Cors {
        max_age_seconds: c.max_age_seconds,
        method: c.method.clone(),
        origin: c.origin.clone(),
        response_header: c.response_header.clone(),
    }
}

fn from_cors(c: &storage::Cors) -> BucketCors {
    BucketCors {
        max_age_seconds: c.max_age_seconds,
        method: c.method.clone(),
        origin: c.origin.clone(),
        response_header: c.response_header.clone(),
    }
}

pub fn generate_bucket_observation(observed: &storage::Bucket) -> BucketObservation {
    BucketObservation {
        id: observed.id.clone(),
        self_link: observed.self_link.clone(),
        time_created: observed.time_created.clone(),
        updated: observed.updated.clone(),
        metageneration: observed.metageneration.clone(),
        project_number: observed.project_number.clone(),
        location_type: observed.location_type.clone(),
    }
}

pub fn late_initialize_bucket(params: &mut BucketParameters, observed: &storage::Bucket) {
    late_init(&mut params.storage_class, &observed.storage_class);
    late_init(&mut params.default_event_based_hold, &observed.default_event_based_hold);
    if params.versioning.is_none() {
        params.versioning = observed
            .versioning
            .as_ref()
            .map(|v| BucketVersioning { enabled: v.enabled });
    }
    if params.uniform_bucket_level_access.is_none() {
        params.uniform_bucket_level_access = observed
            .iam_configuration
            .as_ref()
            .and_then(|iam| iam.uniform_bucket_level_access.as_ref())
            .map(|u| u.enabled);
    }
    if params.requester_pays.is_none() {
        params.requester_pays = observed.billing.as_ref().map(|b| b.requester_pays);
    }
    if params.retention_policy.is_none() {
        params.retention_policy = observed
            .retention_policy
            .as_ref()
            .and_then(|rp| rp.retention_period.parse().ok())
            .map(|retention_period| BucketRetentionPolicy { retention_period });
    }
    if params.lifecycle_rules.is_empty() {
        if let Some(lc) = &observed.lifecycle {
            params.lifecycle_rules = lc.rule.iter().map(from_lifecycle_rule).collect();
        }
    }
    if params.cors.is_empty() {
        params.cors = observed.cors.iter().map(from_cors).collect();
    }
    if params.website.is_none() {
        params.website = observed.website.as_ref().map(|w| BucketWebsite {
            main_page_suffix: w.main_page_suffix.clone(),
            not_found_page: w.not_found_page.clone(),
        });
    }
    if params.logging.is_none() {
        params.logging = observed.logging.as_ref().map(|l| BucketLogging {
            log_bucket: l.log_bucket.clone(),
            log_object_prefix: l.log_object_prefix.clone(),
        });
    }
    if params.default_kms_key_name.is_none() {
        params.default_kms_key_name = observed
            .encryption
            .as_ref()
            .and_then(|e| e.default_kms_key_name.clone());
    }
}

/// Location is immutable and GCS reports it upper-cased, so it is never
/// compared. Storage class is compared without regard to case.
pub fn is_bucket_up_to_date(name: &str, params: &BucketParameters, observed: &storage::Bucket) -> bool {
    let mut desired = observed.clone();
    generate_bucket(name, params, &mut desired);
    desired.location = observed.location.clone();
    if same_ignoring_case(&desired.storage_class, &observed.storage_class) {
        desired.storage_class = observed.storage_class.clone();
    }
    desired == *observed
}

fn same_ignoring_case(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn params() -> BucketParameters {
        BucketParameters {
            location: "EU".to_string(),
            storage_class: Some("STANDARD".to_string()),
            labels: BTreeMap::from([("team".to_string(), "data".to_string())]),
            uniform_bucket_level_access: Some(true),
            retention_policy: Some(BucketRetentionPolicy {
                retention_period: 86400,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_bucket_nests_settings() {
        let mut bucket = storage::Bucket::default();
        generate_bucket("b", &params(), &mut bucket);
        assert_eq!(bucket.name, "b");
        assert_eq!(bucket.location, "EU");
        assert_eq!(
            bucket.iam_configuration,
            Some(storage::IamConfiguration {
                uniform_bucket_level_access: Some(storage::UniformBucketLevelAccess {
                    enabled: true,
                    locked_time: None,
                }),
            })
        );
        assert_eq!(bucket.retention_policy.unwrap().retention_period, "86400");
    }

    #[test]
    fn test_bucket_up_to_date_ignores_output_fields() {
        let mut observed = storage::Bucket::default();
        generate_bucket("b", &params(), &mut observed);
        observed.id = Some("b".to_string());
        observed.metageneration = Some("4".to_string());
        observed.versioning = Some(storage::Versioning { enabled: false });
        assert!(is_bucket_up_to_date("b", &params(), &observed));
    }

    #[test]
    fn test_bucket_label_change_needs_update() {
        let mut observed = storage::Bucket::default();
        generate_bucket("b", &params(), &mut observed);
        let mut changed = params();
        changed.labels.insert("env".to_string(), "prod".to_string());
        assert!(!is_bucket_up_to_date("b", &changed, &observed));
    }

    #[test]
    fn test_late_initialize_bucket() {
        let observed = storage::Bucket {
            name: "b".to_string(),
            location: "EU".to_string(),
            storage_class: Some("STANDARD".to_string()),
            billing: Some(storage::Billing {
                requester_pays: false,
            }),
            retention_policy: Some(storage::RetentionPolicy {
                retention_period: "3600".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut p = BucketParameters {
            location: "EU".to_string(),
            ..Default::default()
        };
        late_initialize_bucket(&mut p, &observed);
        assert_eq!(p.storage_class.as_deref(), Some("STANDARD"));
        assert_eq!(p.requester_pays, Some(false));
        assert_eq!(p.retention_policy.unwrap().retention_period, 3600);
        assert!(p.uniform_bucket_level_access.is_none());
    }

    #[test]
    fn test_bucket_location_case_is_not_drift() {
        let observed = storage::Bucket {
            name: "b".to_string(),
            location: "US-CENTRAL1".to_string(),
            storage_class: Some("STANDARD".to_string()),
            ..Default::default()
        };
        let mut p = BucketParameters {
            location: "us-central1".to_string(),
            storage_class: Some("standard".to_string()),
            ..Default::default()
        };
        late_initialize_bucket(&mut p, &observed);
        assert!(is_bucket_up_to_date("b", &p, &observed));

        p.storage_class = Some("NEARLINE".to_string());
        assert!(!is_bucket_up_to_date("b", &p, &observed));
    }
}
