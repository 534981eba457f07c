//! Compute Engine managed resources: Network, Subnetwork, Firewall and
//! GlobalAddress.

use super::common::managed_resource;
use super::{Condition, Reference, ResourceSpec, Selector};
use crate::error::{OperatorError, Result};
use crate::reference::{ResolutionRequest, ResolveReferences, Resolver};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// A VPC network
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "compute.gcp.crossplane.io",
    version = "v1beta1",
    kind = "Network",
    status = "NetworkStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"External-Name","type":"string","jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: NetworkParameters,
}

/// Desired state of a Network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParameters {
    /// Optional description. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Create one subnetwork per region automatically. Switching from
    /// `true` to `false` converts the network to custom mode; the reverse is
    /// not possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_subnetworks: Option<bool>,

    /// Network-wide routing mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_config: Option<NetworkRoutingConfig>,
}

/// Routing behaviour of a network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRoutingConfig {
    /// REGIONAL or GLOBAL
    pub routing_mode: String,
}

/// Observed state of a Network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, rename = "gatewayIPv4", skip_serializing_if = "Option::is_none")]
    pub gateway_ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peerings: Vec<NetworkPeering>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnetworks: Vec<String>,
}

/// Peering of a network with another network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPeering {
    pub name: String,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_details: Option<String>,
    #[serde(default)]
    pub exchange_subnet_routes: bool,
    #[serde(default)]
    pub export_custom_routes: bool,
    #[serde(default)]
    pub import_custom_routes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<NetworkObservation>,
}

managed_resource!(Network);

impl ResolveReferences for Network {}

/// Self-link of a Network, the value other resources reference it by.
pub fn network_self_link(network: &Network) -> Option<String> {
    network
        .status
        .as_ref()
        .and_then(|s| s.at_provider.as_ref())
        .and_then(|o| o.self_link.clone())
}

// ---------------------------------------------------------------------------
// Subnetwork
// ---------------------------------------------------------------------------

/// A regional subnetwork of a VPC network
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "compute.gcp.crossplane.io",
    version = "v1beta1",
    kind = "Subnetwork",
    status = "SubnetworkStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Region","type":"string","jsonPath":".spec.forProvider.region"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SubnetworkSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: SubnetworkParameters,
}

/// Desired state of a Subnetwork
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubnetworkParameters {
    /// Primary internal address range, e.g. 10.0.0.0/8
    pub ip_cidr_range: String,

    /// Self-link of the network this subnetwork belongs to. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// Network to resolve `network` from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_ref: Option<Reference>,

    /// Selects a Network to resolve `network` from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_selector: Option<Selector>,

    /// Region of the subnetwork. Immutable.
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_flow_logs: Option<bool>,

    /// Allow VMs without external IPs to reach Google APIs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip_google_access: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_ip_ranges: Vec<SubnetworkSecondaryRange>,
}

/// Secondary IP range of a subnetwork
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubnetworkSecondaryRange {
    pub range_name: String,
    pub ip_cidr_range: String,
}

/// Observed state of a Subnetwork
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubnetworkObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubnetworkStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<SubnetworkObservation>,
}

managed_resource!(Subnetwork);

#[async_trait::async_trait]
impl ResolveReferences for Subnetwork {
    async fn resolve_references(&mut self, resolver: &Resolver) -> Result<()> {
        let p = &self.spec.for_provider;
        let rsp = resolver
            .resolve(
                &*self,
                ResolutionRequest {
                    current_value: p.network.as_deref(),
                    reference: p.network_ref.as_ref(),
                    selector: p.network_selector.as_ref(),
                },
                network_self_link,
            )
            .await
            .map_err(OperatorError::during("resolve spec.forProvider.network"))?;
        let p = &mut self.spec.for_provider;
        p.network = rsp.resolved_value;
        p.network_ref = rsp.resolved_reference;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Firewall
// ---------------------------------------------------------------------------

/// A VPC firewall rule
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "compute.gcp.crossplane.io",
    version = "v1beta1",
    kind = "Firewall",
    status = "FirewallStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct FirewallSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: FirewallParameters,
}

/// Desired state of a Firewall
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FirewallParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Self-link of the network the rule applies to. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_selector: Option<Selector>,

    /// Priority between 0 and 65535; lower wins. GCP defaults to 1000.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ranges: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_ranges: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_service_accounts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_service_accounts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<FirewallRuleProtocol>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denied: Vec<FirewallRuleProtocol>,

    /// INGRESS or EGRESS. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_config: Option<FirewallLogConfig>,
}

/// Protocol and ports matched by an allow or deny entry
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct FirewallRuleProtocol {
    /// tcp, udp, icmp, esp, ah, sctp, ipip, all, or a protocol number
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct FirewallLogConfig {
    pub enable: bool,
}

/// Observed state of a Firewall
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FirewallObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FirewallStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<FirewallObservation>,
}

managed_resource!(Firewall);

#[async_trait::async_trait]
impl ResolveReferences for Firewall {
    async fn resolve_references(&mut self, resolver: &Resolver) -> Result<()> {
        let p = &self.spec.for_provider;
        let rsp = resolver
            .resolve(
                &*self,
                ResolutionRequest {
                    current_value: p.network.as_deref(),
                    reference: p.network_ref.as_ref(),
                    selector: p.network_selector.as_ref(),
                },
                network_self_link,
            )
            .await
            .map_err(OperatorError::during("resolve spec.forProvider.network"))?;
        let p = &mut self.spec.for_provider;
        p.network = rsp.resolved_value;
        p.network_ref = rsp.resolved_reference;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GlobalAddress
// ---------------------------------------------------------------------------

/// A global static IP address or internal address range
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "compute.gcp.crossplane.io",
    version = "v1beta1",
    kind = "GlobalAddress",
    status = "GlobalAddressStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.atProvider.status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAddressSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: GlobalAddressParameters,
}

/// Desired state of a GlobalAddress. Every field is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAddressParameters {
    /// Static address to reserve; GCP picks one when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// INTERNAL or EXTERNAL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// IPV4 or IPV6
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<String>,

    /// Self-link of the network an INTERNAL address belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_selector: Option<Selector>,

    /// Prefix length of an address range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<i64>,

    /// e.g. VPC_PEERING for private service access ranges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
}

/// Observed state of a GlobalAddress
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAddressObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// RESERVING, RESERVED or IN_USE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAddressStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<GlobalAddressObservation>,
}

managed_resource!(GlobalAddress);

#[async_trait::async_trait]
impl ResolveReferences for GlobalAddress {
    async fn resolve_references(&mut self, resolver: &Resolver) -> Result<()> {
        let p = &self.spec.for_provider;
        let rsp = resolver
            .resolve(
                &*self,
                ResolutionRequest {
                    current_value: p.network.as_deref(),
                    reference: p.network_ref.as_ref(),
                    selector: p.network_selector.as_ref(),
                },
                network_self_link,
            )
            .await
            .map_err(OperatorError::during("resolve spec.forProvider.network"))?;
        let p = &mut self.spec.for_provider;
        p.network = rsp.resolved_value;
        p.network_ref = rsp.resolved_reference;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnetwork_spec_parses() {
        let json = r#"{
            "providerConfigRef": {"name": "gcp"},
            "forProvider": {
                "ipCidrRange": "10.2.0.0/16",
                "region": "us-central1",
                "networkRef": {"name": "my-network"},
                "secondaryIpRanges": [{"rangeName": "pods", "ipCidrRange": "192.168.10.0/24"}]
            }
        }"#;
        let spec: SubnetworkSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.resource_spec.provider_config_ref.name, "gcp");
        assert_eq!(spec.for_provider.region, "us-central1");
        assert_eq!(spec.for_provider.network_ref.unwrap().name, "my-network");
        assert_eq!(spec.for_provider.secondary_ip_ranges.len(), 1);
    }

    #[test]
    fn test_firewall_protocol_field_name() {
        let json = r#"{"IPProtocol": "tcp", "ports": ["80", "443"]}"#;
        let proto: FirewallRuleProtocol = serde_json::from_str(json).unwrap();
        assert_eq!(proto.ip_protocol, "tcp");
        assert_eq!(proto.ports, vec!["80", "443"]);
    }

    #[test]
    fn test_network_self_link_extraction() {
        let mut network = Network::new(
            "net",
            NetworkSpec {
                resource_spec: ResourceSpec::default(),
                for_provider: NetworkParameters::default(),
            },
        );
        assert_eq!(network_self_link(&network), None);

        network.status = Some(NetworkStatus {
            conditions: vec![],
            at_provider: Some(NetworkObservation {
                self_link: Some("https://compute/net".to_string()),
                ..Default::default()
            }),
        });
        assert_eq!(
            network_self_link(&network).as_deref(),
            Some("https://compute/net")
        );
    }
}
