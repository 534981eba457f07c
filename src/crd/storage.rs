//! Cloud Storage managed resources

use super::common::managed_resource;
use super::{Condition, ResourceSpec};
use crate::reference::ResolveReferences;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Cloud Storage bucket
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "storage.gcp.crossplane.io",
    version = "v1alpha3",
    kind = "Bucket",
    status = "BucketStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Location","type":"string","jsonPath":".spec.forProvider.location"}"#,
    printcolumn = r#"{"name":"Storage-Class","type":"string","jsonPath":".spec.forProvider.storageClass"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: BucketParameters,
}

/// Desired state of a Bucket
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketParameters {
    /// Location of the bucket, e.g. US or europe-west1. Immutable.
    pub location: String,

    /// STANDARD, NEARLINE, COLDLINE or ARCHIVE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<BucketVersioning>,

    /// Enforce bucket-level IAM and disable object ACLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform_bucket_level_access: Option<bool>,

    /// Charge requesters for access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_pays: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_event_based_hold: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_policy: Option<BucketRetentionPolicy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lifecycle_rules: Vec<BucketLifecycleRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors: Vec<BucketCors>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<BucketWebsite>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<BucketLogging>,

    /// Cloud KMS key used to encrypt new objects by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_kms_key_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct BucketVersioning {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketRetentionPolicy {
    /// Minimum object age in seconds before deletion or replacement
    pub retention_period: i64,
}

/// Action taken on objects matching a lifecycle condition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct BucketLifecycleRule {
    pub action: BucketLifecycleAction,
    pub condition: BucketLifecycleCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketLifecycleAction {
    /// Delete or SetStorageClass
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketLifecycleCondition {
    /// Age of an object in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    /// RFC 3339 date, e.g. 2024-01-31
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches_storage_class: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_newer_versions: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketCors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub method: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub origin: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_header: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketWebsite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_page_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found_page: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketLogging {
    pub log_bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_object_prefix: Option<String>,
}

/// Observed state of a Bucket
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metageneration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_number: Option<String>,
    /// region, dual-region or multi-region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<BucketObservation>,
}

managed_resource!(Bucket);

impl ResolveReferences for Bucket {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_spec_parses() {
        let json = r#"{
            "forProvider": {
                "location": "EU",
                "storageClass": "NEARLINE",
                "labels": {"team": "data"},
                "lifecycleRules": [
                    {"action": {"type": "Delete"}, "condition": {"age": 30}}
                ]
            }
        }"#;
        let spec: BucketSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.for_provider.location, "EU");
        assert_eq!(spec.for_provider.lifecycle_rules[0].condition.age, Some(30));
        assert_eq!(spec.resource_spec.provider_config_ref.name, "default");
    }
}
