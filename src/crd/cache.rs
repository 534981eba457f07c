//! Memorystore (Redis) managed resources

use super::common::managed_resource;
use super::{Condition, ResourceSpec};
use crate::reference::ResolveReferences;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Memorystore for Redis instance
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cache.gcp.crossplane.io",
    version = "v1beta1",
    kind = "CloudMemorystoreInstance",
    status = "CloudMemorystoreInstanceStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.atProvider.state"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.forProvider.redisVersion"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CloudMemorystoreInstanceSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: CloudMemorystoreInstanceParameters,
}

/// Desired state of a CloudMemorystoreInstance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudMemorystoreInstanceParameters {
    /// Region of the instance. Immutable.
    pub region: String,

    /// BASIC or STANDARD_HA. Immutable.
    pub tier: String,

    pub memory_size_gb: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Zone of the primary node. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,

    /// Zone of the replica for STANDARD_HA. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_location_id: Option<String>,

    /// e.g. REDIS_7_0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_version: Option<String>,

    /// CIDR range reserved for the instance. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_ip_range: Option<String>,

    /// Redis configuration parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub redis_configs: BTreeMap<String, String>,

    /// Full name of the VPC network the instance is reachable from. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_network: Option<String>,

    /// DIRECT_PEERING or PRIVATE_SERVICE_ACCESS. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_mode: Option<String>,
}

/// Observed state of a CloudMemorystoreInstance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudMemorystoreInstanceObservation {
    /// projects/{project}/locations/{region}/instances/{name}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// CREATING, READY, UPDATING, DELETING, REPAIRING, MAINTENANCE, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_iam_identity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudMemorystoreInstanceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<CloudMemorystoreInstanceObservation>,
}

managed_resource!(CloudMemorystoreInstance);

impl ResolveReferences for CloudMemorystoreInstance {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memorystore_spec_parses() {
        let json = r#"{
            "forProvider": {
                "region": "us-east1",
                "tier": "STANDARD_HA",
                "memorySizeGb": 4,
                "redisConfigs": {"maxmemory-policy": "allkeys-lru"}
            }
        }"#;
        let spec: CloudMemorystoreInstanceSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.for_provider.memory_size_gb, 4);
        assert_eq!(
            spec.for_provider
                .redis_configs
                .get("maxmemory-policy")
                .map(String::as_str),
            Some("allkeys-lru")
        );
    }
}
