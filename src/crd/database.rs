//! Cloud SQL managed resources

use super::common::managed_resource;
use super::compute::network_self_link;
use super::{Condition, Reference, ResourceSpec, Selector};
use crate::error::{OperatorError, Result};
use crate::reference::{ResolutionRequest, ResolveReferences, Resolver};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Cloud SQL database instance
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "database.gcp.crossplane.io",
    version = "v1beta1",
    kind = "CloudSQLInstance",
    status = "CloudSQLInstanceStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.atProvider.state"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.forProvider.databaseVersion"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CloudSQLInstanceSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: CloudSQLInstanceParameters,
}

/// Desired state of a CloudSQLInstance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudSQLInstanceParameters {
    /// Region of the instance. Immutable.
    pub region: String,

    /// e.g. POSTGRES_15 or MYSQL_8_0. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_version: Option<String>,

    /// Primary instance of a read replica. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_instance_name: Option<String>,

    pub settings: CloudSQLSettings,
}

/// User settings of a Cloud SQL instance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudSQLSettings {
    /// Machine tier, e.g. db-custom-2-7680
    pub tier: String,

    /// ALWAYS, NEVER or ON_DEMAND
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_policy: Option<String>,

    /// ZONAL or REGIONAL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disk_size_gb: Option<i64>,

    /// PD_SSD or PD_HDD. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disk_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_auto_resize: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_auto_resize_limit: Option<i64>,

    /// PER_USE or PACKAGE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_plan: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_protection_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub database_flags: Vec<DatabaseFlag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_configuration: Option<IpConfiguration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_configuration: Option<BackupConfiguration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_preference: Option<LocationPreference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window: Option<MaintenanceWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct DatabaseFlag {
    pub name: String,
    pub value: String,
}

/// Network access settings of an instance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    /// Assign a public IP address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_enabled: Option<bool>,

    /// VPC network reachable over a private IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_network_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_network_selector: Option<Selector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_ssl: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorized_networks: Vec<AclEntry>,
}

/// An address range allowed to connect over the public IP
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AclEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// CIDR notation
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// HH:MM in UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_log_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_in_time_recovery_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct LocationPreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    /// 1 (Monday) to 7 (Sunday)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i64>,
    /// 0 to 23, UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<i64>,
    /// canary or stable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_track: Option<String>,
}

/// Observed state of a CloudSQLInstance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudSQLInstanceObservation {
    /// RUNNABLE, PENDING_CREATE, MAINTENANCE, FAILED, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// project:region:instance, used by the Cloud SQL proxy
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
    pub settings_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

/// An IP address assigned to an instance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IpMapping {
    pub ip_address: String,
    /// PRIMARY, PRIVATE or OUTGOING
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_retire: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudSQLInstanceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<CloudSQLInstanceObservation>,
}

managed_resource!(CloudSQLInstance);

#[async_trait::async_trait]
impl ResolveReferences for CloudSQLInstance {
    async fn resolve_references(&mut self, resolver: &Resolver) -> Result<()> {
        let Some(ip) = self.spec.for_provider.settings.ip_configuration.as_ref() else {
            return Ok(());
        };
        let rsp = resolver
            .resolve(
                &*self,
                ResolutionRequest {
                    current_value: ip.private_network.as_deref(),
                    reference: ip.private_network_ref.as_ref(),
                    selector: ip.private_network_selector.as_ref(),
                },
                network_self_link,
            )
            .await
            .map_err(OperatorError::during(
                "resolve spec.forProvider.settings.ipConfiguration.privateNetwork",
            ))?;
        if let Some(ip) = self.spec.for_provider.settings.ip_configuration.as_mut() {
            ip.private_network = rsp.resolved_value;
            ip.private_network_ref = rsp.resolved_reference;
        }
        Ok(())
    }
}
