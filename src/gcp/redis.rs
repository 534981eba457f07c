//! Memorystore for Redis v1 wire types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BASE: &str = "https://redis.googleapis.com/v1";

pub const STATE_READY: &str = "READY";
pub const STATE_CREATING: &str = "CREATING";
pub const STATE_DELETING: &str = "DELETING";

/// `projects/{project}/locations/{region}/instances/{name}`
pub fn instance_name(project: &str, region: &str, name: &str) -> String {
    format!("projects/{}/locations/{}/instances/{}", project, region, name)
}

pub fn create_url(project: &str, region: &str, name: &str) -> String {
    format!(
        "{}/projects/{}/locations/{}/instances?instanceId={}",
        BASE, project, region, name
    )
}

pub fn resource_url(name: &str) -> String {
    format!("{}/{}", BASE, name)
}

pub fn patch_url(name: &str, update_mask: &str) -> String {
    format!("{}?updateMask={}", resource_url(name), update_mask)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tier: String,
    #[serde(default)]
    pub memory_size_gb: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_ip_range: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub redis_configs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_iam_identity: Option<String>,
}
