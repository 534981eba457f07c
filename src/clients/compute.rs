//! Network, Subnetwork, Firewall and GlobalAddress conversion

use super::{late_init, late_init_vec, set_if_not_empty, set_if_some};
use crate::crd::{
    FirewallLogConfig, FirewallObservation, FirewallParameters, FirewallRuleProtocol,
    GlobalAddressObservation, GlobalAddressParameters, NetworkObservation, NetworkParameters,
    NetworkPeering, NetworkRoutingConfig, SubnetworkObservation, SubnetworkParameters,
    SubnetworkSecondaryRange,
};
use crate::gcp::compute;
use crate::gcp::parse_id;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// What an observed Network needs to match its spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkUpdate {
    UpToDate,
    /// Patch the network with the generated object
    NeedsUpdate,
    /// Auto mode networks become custom mode through a dedicated call
    SwitchToCustomMode,
}

pub fn generate_network(name: &str, params: &NetworkParameters, target: &mut compute::Network) {
    target.name = name.to_string();
    set_if_some(&mut target.description, &params.description);
    set_if_some(&mut target.auto_create_subnetworks, &params.auto_create_subnetworks);
    if let Some(rc) = &params.routing_config {
        target.routing_config = Some(compute::NetworkRoutingConfig {
            routing_mode: rc.routing_mode.clone(),
        });
    }
}

pub fn generate_network_observation(observed: &compute::Network) -> NetworkObservation {
    NetworkObservation {
        creation_timestamp: observed.creation_timestamp.clone(),
        gateway_ipv4: observed.gateway_ipv4.clone(),
        id: parse_id(observed.id.as_deref()),
        peerings: observed
            .peerings
            .iter()
            .map(|p| NetworkPeering {
                name: p.name.clone(),
                network: p.network.clone(),
                state: p.state.clone(),
                state_details: p.state_details.clone(),
                exchange_subnet_routes: p.exchange_subnet_routes,
                export_custom_routes: p.export_custom_routes,
                import_custom_routes: p.import_custom_routes,
            })
            .collect(),
        self_link: observed.self_link.clone(),
        subnetworks: observed.subnetworks.clone(),
    }
}

pub fn late_initialize_network(params: &mut NetworkParameters, observed: &compute::Network) {
    late_init(&mut params.description, &observed.description);
    late_init(&mut params.auto_create_subnetworks, &observed.auto_create_subnetworks);
    if params.routing_config.is_none() {
        params.routing_config = observed
            .routing_config
            .as_ref()
            .filter(|rc| !rc.routing_mode.is_empty())
            .map(|rc| NetworkRoutingConfig {
                routing_mode: rc.routing_mode.clone(),
            });
    }
}

pub fn is_network_up_to_date(
    name: &str,
    params: &NetworkParameters,
    observed: &compute::Network,
) -> NetworkUpdate {
    // Custom mode networks cannot go back to auto mode, so only this
    // direction is actionable.
    if params.auto_create_subnetworks == Some(false)
        && observed.auto_create_subnetworks == Some(true)
    {
        return NetworkUpdate::SwitchToCustomMode;
    }
    let mut desired = observed.clone();
    generate_network(name, params, &mut desired);
    if desired == *observed {
        NetworkUpdate::UpToDate
    } else {
        NetworkUpdate::NeedsUpdate
    }
}

// ---------------------------------------------------------------------------
// Subnetwork
// ---------------------------------------------------------------------------

/// What an observed Subnetwork needs to match its spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetworkUpdate {
    UpToDate,
    /// Only settable through setPrivateIpGoogleAccess
    PrivateIpGoogleAccess,
    /// Patch with the generated object and the observed fingerprint
    NeedsUpdate,
}

pub fn generate_subnetwork(name: &str, params: &SubnetworkParameters, target: &mut compute::Subnetwork) {
    target.name = name.to_string();
    target.ip_cidr_range = params.ip_cidr_range.clone();
    set_if_some(&mut target.network, &params.network);
    set_if_some(&mut target.description, &params.description);
    set_if_some(&mut target.enable_flow_logs, &params.enable_flow_logs);
    set_if_some(&mut target.private_ip_google_access, &params.private_ip_google_access);
    let ranges: Vec<compute::SubnetworkSecondaryRange> = params
        .secondary_ip_ranges
        .iter()
        .map(|r| compute::SubnetworkSecondaryRange {
            range_name: r.range_name.clone(),
            ip_cidr_range: r.ip_cidr_range.clone(),
        })
        .collect();
    set_if_not_empty(&mut target.secondary_ip_ranges, &ranges);
}

pub fn generate_subnetwork_observation(observed: &compute::Subnetwork) -> SubnetworkObservation {
    SubnetworkObservation {
        creation_timestamp: observed.creation_timestamp.clone(),
        fingerprint: observed.fingerprint.clone(),
        gateway_address: observed.gateway_address.clone(),
        id: parse_id(observed.id.as_deref()),
        self_link: observed.self_link.clone(),
    }
}

pub fn late_initialize_subnetwork(params: &mut SubnetworkParameters, observed: &compute::Subnetwork) {
    late_init(&mut params.description, &observed.description);
    late_init(&mut params.enable_flow_logs, &observed.enable_flow_logs);
    late_init(&mut params.private_ip_google_access, &observed.private_ip_google_access);
    let ranges: Vec<SubnetworkSecondaryRange> = observed
        .secondary_ip_ranges
        .iter()
        .map(|r| SubnetworkSecondaryRange {
            range_name: r.range_name.clone(),
            ip_cidr_range: r.ip_cidr_range.clone(),
        })
        .collect();
    late_init_vec(&mut params.secondary_ip_ranges, &ranges);
}

pub fn is_subnetwork_up_to_date(
    name: &str,
    params: &SubnetworkParameters,
    observed: &compute::Subnetwork,
) -> SubnetworkUpdate {
    let mut desired = observed.clone();
    generate_subnetwork(name, params, &mut desired);
    if desired == *observed {
        return SubnetworkUpdate::UpToDate;
    }
    if desired.private_ip_google_access != observed.private_ip_google_access {
        return SubnetworkUpdate::PrivateIpGoogleAccess;
    }
    SubnetworkUpdate::NeedsUpdate
}

// ---------------------------------------------------------------------------
// Firewall
// ---------------------------------------------------------------------------

fn to_firewall_rules(rules: &[FirewallRuleProtocol]) -> Vec<compute::FirewallRule> {
    rules
        .iter()
        .map(|r| compute::FirewallRule {
            ip_protocol: r.ip_protocol.clone(),
            ports: r.ports.clone(),
        })
        .collect()
}

fn from_firewall_rules(rules: &[compute::FirewallRule]) -> Vec<FirewallRuleProtocol> {
    rules
        .iter()
        .map(|r| FirewallRuleProtocol {
            ip_protocol: r.ip_protocol.clone(),
            ports: r.ports.clone(),
        })
        .collect()
}

pub fn generate_firewall(name: &str, params: &FirewallParameters, target: &mut compute::Firewall) {
    target.name = name.to_string();
    set_if_some(&mut target.description, &params.description);
    set_if_some(&mut target.network, &params.network);
    set_if_some(&mut target.priority, &params.priority);
    set_if_not_empty(&mut target.source_ranges, &params.source_ranges);
    set_if_not_empty(&mut target.destination_ranges, &params.destination_ranges);
    set_if_not_empty(&mut target.source_tags, &params.source_tags);
    set_if_not_empty(&mut target.target_tags, &params.target_tags);
    set_if_not_empty(&mut target.source_service_accounts, &params.source_service_accounts);
    set_if_not_empty(&mut target.target_service_accounts, &params.target_service_accounts);
    set_if_not_empty(&mut target.allowed, &to_firewall_rules(&params.allowed));
    set_if_not_empty(&mut target.denied, &to_firewall_rules(&params.denied));
    set_if_some(&mut target.direction, &params.direction);
    set_if_some(&mut target.disabled, &params.disabled);
    if let Some(lc) = &params.log_config {
        target.log_config = Some(compute::FirewallLogConfig { enable: lc.enable });
    }
}

pub fn generate_firewall_observation(observed: &compute::Firewall) -> FirewallObservation {
    FirewallObservation {
        creation_timestamp: observed.creation_timestamp.clone(),
        id: parse_id(observed.id.as_deref()),
        self_link: observed.self_link.clone(),
    }
}

pub fn late_initialize_firewall(params: &mut FirewallParameters, observed: &compute::Firewall) {
    late_init(&mut params.description, &observed.description);
    late_init(&mut params.priority, &observed.priority);
    late_init(&mut params.direction, &observed.direction);
    late_init(&mut params.disabled, &observed.disabled);
    late_init_vec(&mut params.source_ranges, &observed.source_ranges);
    late_init_vec(&mut params.destination_ranges, &observed.destination_ranges);
    late_init_vec(&mut params.allowed, &from_firewall_rules(&observed.allowed));
    late_init_vec(&mut params.denied, &from_firewall_rules(&observed.denied));
    if params.log_config.is_none() {
        params.log_config = observed
            .log_config
            .as_ref()
            .map(|lc| FirewallLogConfig { enable: lc.enable });
    }
}

pub fn is_firewall_up_to_date(name: &str, params: &FirewallParameters, observed: &compute::Firewall) -> bool {
    let mut desired = observed.clone();
    generate_firewall(name, params, &mut desired);
    desired == *observed
}

// ---------------------------------------------------------------------------
// GlobalAddress
// ---------------------------------------------------------------------------

pub fn generate_global_address(name: &str, params: &GlobalAddressParameters, target: &mut compute::Address) {
    target.name = name.to_string();
    set_if_some(&mut target.address, &params.address);
    set_if_some(&mut target.address_type, &params.address_type);
    set_if_some(&mut target.description, &params.description);
    set_if_some(&mut target.ip_version, &params.ip_version);
    set_if_some(&mut target.network, &params.network);
    set_if_some(&mut target.prefix_length, &params.prefix_length);
    set_if_some(&mut target.purpose, &params.purpose);
    set_if_some(&mut target.subnetwork, &params.subnetwork);
}

pub fn generate_global_address_observation(observed: &compute::Address) -> GlobalAddressObservation {
    GlobalAddressObservation {
        creation_timestamp: observed.creation_timestamp.clone(),
        id: parse_id(observed.id.as_deref()),
        self_link: observed.self_link.clone(),
        status: observed.status.clone(),
        users: observed.users.clone(),
    }
}

pub fn late_initialize_global_address(params: &mut GlobalAddressParameters, observed: &compute::Address) {
    late_init(&mut params.address, &observed.address);
    late_init(&mut params.address_type, &observed.address_type);
    late_init(&mut params.description, &observed.description);
    late_init(&mut params.ip_version, &observed.ip_version);
    late_init(&mut params.network, &observed.network);
    late_init(&mut params.prefix_length, &observed.prefix_length);
    late_init(&mut params.purpose, &observed.purpose);
    late_init(&mut params.subnetwork, &observed.subnetwork);
}

/// Global addresses cannot be changed after creation.
pub fn is_global_address_up_to_date() -> bool {
    true
}
