//! Cloud SQL Admin API v1 wire types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BASE: &str = "https://sqladmin.googleapis.com/v1/projects";

pub fn instances_url(project: &str) -> String {
    format!("{}/{}/instances", BASE, project)
}

pub fn instance_url(project: &str, name: &str) -> String {
    format!("{}/{}", instances_url(project), name)
}

pub const STATE_RUNNABLE: &str = "RUNNABLE";
pub const STATE_PENDING_CREATE: &str = "PENDING_CREATE";

pub const IP_TYPE_PRIMARY: &str = "PRIMARY";
pub const IP_TYPE_PRIVATE: &str = "PRIVATE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInstance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_instance_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gce_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<IpMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_ca_cert: Option<SslCert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_type: Option<String>,
    /// int64 encoded as a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disk_size_gb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_auto_resize: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_auto_resize_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_protection_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub database_flags: Vec<DatabaseFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_configuration: Option<IpConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_configuration: Option<BackupConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_preference: Option<LocationPreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window: Option<MaintenanceWindow>,
    /// Required on update for optimistic locking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DatabaseFlags {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorized_networks: Vec<AclEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AclEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_log_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_in_time_recovery_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LocationPreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_track: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IpMapping {
    #[serde(default)]
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_retire: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SslCert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_url() {
        assert_eq!(
            instance_url("p", "db"),
            "https://sqladmin.googleapis.com/v1/projects/p/instances/db"
        );
    }

    #[test]
    fn test_instance_decodes_int64_strings() {
        let i: DatabaseInstance = serde_json::from_str(
            r#"{
                "name": "db",
                "state": "RUNNABLE",
                "settings": {"tier": "db-f1-micro", "dataDiskSizeGb": "10", "settingsVersion": "3"},
                "ipAddresses": [{"ipAddress": "1.2.3.4", "type": "PRIMARY"}],
                "serverCaCert": {"cert": "-----BEGIN CERTIFICATE-----"}
            }"#,
        )
        .unwrap();
        let settings = i.settings.unwrap();
        assert_eq!(settings.data_disk_size_gb.as_deref(), Some("10"));
        assert_eq!(settings.settings_version.as_deref(), Some("3"));
        assert_eq!(i.ip_addresses[0].r#type.as_deref(), Some(IP_TYPE_PRIMARY));
    }
}
