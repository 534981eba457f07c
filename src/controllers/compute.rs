//! External clients for Network, Subnetwork, Firewall and GlobalAddress

use super::required;
use crate::clients::compute::{
    generate_firewall, generate_firewall_observation, generate_global_address,
    generate_global_address_observation, generate_network, generate_network_observation,
    generate_subnetwork, generate_subnetwork_observation, is_firewall_up_to_date,
    is_global_address_up_to_date, is_network_up_to_date, is_subnetwork_up_to_date,
    late_initialize_firewall, late_initialize_global_address, late_initialize_network,
    late_initialize_subnetwork, NetworkUpdate, SubnetworkUpdate,
};
use crate::conditions;
use crate::crd::{external_name_or_name, Firewall, GlobalAddress, Managed, Network, Subnetwork};
use crate::error::{ignore_already_exists, ignore_not_found, not_found_as_none, Result};
use crate::gcp::compute;
use crate::managed::{
    ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, GcpSession,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

pub struct NetworkExternal {
    session: GcpSession,
}

impl NetworkExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<Network>> {
        Box::new(Self { session })
    }
}

#[async_trait]
impl ExternalClient<Network> for NetworkExternal {
    async fn observe(&self, cr: &mut Network) -> Result<ExternalObservation> {
        let name = external_name_or_name(cr);
        let url = compute::network_url(&self.session.project_id, &name);
        let Some(observed) = not_found_as_none(self.session.client.get::<compute::Network>(&url).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_network(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_network_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: is_network_up_to_date(&name, &cr.spec.for_provider, &observed)
                == NetworkUpdate::UpToDate,
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut Network) -> Result<ExternalCreation> {
        let mut network = compute::Network::default();
        generate_network(&external_name_or_name(cr), &cr.spec.for_provider, &mut network);
        let result = self
            .session
            .client
            .post::<_, compute::Operation>(&compute::networks_url(&self.session.project_id), &network)
            .await
            .map(drop);
        ignore_already_exists(result)?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut Network) -> Result<ExternalUpdate> {
        let name = external_name_or_name(cr);
        let project = &self.session.project_id;
        let url = compute::network_url(project, &name);
        let observed: compute::Network = self.session.client.get(&url).await?;

        match is_network_up_to_date(&name, &cr.spec.for_provider, &observed) {
            NetworkUpdate::UpToDate => {}
            NetworkUpdate::SwitchToCustomMode => {
                info!(network = %name, "Switching network to custom subnet mode");
                let _: compute::Operation = self
                    .session
                    .client
                    .post(&compute::switch_to_custom_mode_url(project, &name), &json!({}))
                    .await?;
            }
            NetworkUpdate::NeedsUpdate => {
                let mut desired = compute::Network::default();
                generate_network(&name, &cr.spec.for_provider, &mut desired);
                // Auto mode can only change through switchToCustomMode.
                desired.auto_create_subnetworks = None;
                let _: compute::Operation = self.session.client.patch(&url, &desired).await?;
            }
        }
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut Network) -> Result<()> {
        let url = compute::network_url(&self.session.project_id, &external_name_or_name(cr));
        ignore_not_found(self.session.client.delete(&url).await)
    }
}

// ---------------------------------------------------------------------------
// Subnetwork
// ---------------------------------------------------------------------------

pub struct SubnetworkExternal {
    session: GcpSession,
}

impl SubnetworkExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<Subnetwork>> {
        Box::new(Self { session })
    }

    fn url(&self, cr: &Subnetwork) -> String {
        compute::subnetwork_url(
            &self.session.project_id,
            &cr.spec.for_provider.region,
            &external_name_or_name(cr),
        )
    }
}

#[async_trait]
impl ExternalClient<Subnetwork> for SubnetworkExternal {
    async fn observe(&self, cr: &mut Subnetwork) -> Result<ExternalObservation> {
        let name = external_name_or_name(cr);
        let Some(observed) =
            not_found_as_none(self.session.client.get::<compute::Subnetwork>(&self.url(cr)).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_subnetwork(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_subnetwork_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: is_subnetwork_up_to_date(&name, &cr.spec.for_provider, &observed)
                == SubnetworkUpdate::UpToDate,
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut Subnetwork) -> Result<ExternalCreation> {
        required(&cr.spec.for_provider.network, "network")?;
        let mut subnetwork = compute::Subnetwork::default();
        generate_subnetwork(&external_name_or_name(cr), &cr.spec.for_provider, &mut subnetwork);
        let url = compute::subnetworks_url(&self.session.project_id, &cr.spec.for_provider.region);
        let result = self
            .session
            .client
            .post::<_, compute::Operation>(&url, &subnetwork)
            .await
            .map(drop);
        ignore_already_exists(result)?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut Subnetwork) -> Result<ExternalUpdate> {
        let name = external_name_or_name(cr);
        let observed: compute::Subnetwork = self.session.client.get(&self.url(cr)).await?;

        match is_subnetwork_up_to_date(&name, &cr.spec.for_provider, &observed) {
            SubnetworkUpdate::UpToDate => {}
            SubnetworkUpdate::PrivateIpGoogleAccess => {
                let request = compute::SubnetworksSetPrivateIpGoogleAccessRequest {
                    private_ip_google_access: cr
                        .spec
                        .for_provider
                        .private_ip_google_access
                        .unwrap_or_default(),
                };
                let url = compute::set_private_ip_google_access_url(
                    &self.session.project_id,
                    &cr.spec.for_provider.region,
                    &name,
                );
                let _: compute::Operation = self.session.client.post(&url, &request).await?;
            }
            SubnetworkUpdate::NeedsUpdate => {
                let mut desired = compute::Subnetwork::default();
                generate_subnetwork(&name, &cr.spec.for_provider, &mut desired);
                desired.fingerprint = observed.fingerprint.clone();
                let _: compute::Operation =
                    self.session.client.patch(&self.url(cr), &desired).await?;
            }
        }
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut Subnetwork) -> Result<()> {
        ignore_not_found(self.session.client.delete(&self.url(cr)).await)
    }
}

// ---------------------------------------------------------------------------
// Firewall
// ---------------------------------------------------------------------------

pub struct FirewallExternal {
    session: GcpSession,
}

impl FirewallExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<Firewall>> {
        Box::new(Self { session })
    }
}

#[async_trait]
impl ExternalClient<Firewall> for FirewallExternal {
    async fn observe(&self, cr: &mut Firewall) -> Result<ExternalObservation> {
        let name = external_name_or_name(cr);
        let url = compute::firewall_url(&self.session.project_id, &name);
        let Some(observed) = not_found_as_none(self.session.client.get::<compute::Firewall>(&url).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_firewall(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_firewall_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: is_firewall_up_to_date(&name, &cr.spec.for_provider, &observed),
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut Firewall) -> Result<ExternalCreation> {
        let mut firewall = compute::Firewall::default();
        generate_firewall(&external_name_or_name(cr), &cr.spec.for_provider, &mut firewall);
        let result = self
            .session
            .client
            .post::<_, compute::Operation>(&compute::firewalls_url(&self.session.project_id), &firewall)
            .await
            .map(drop);
        ignore_already_exists(result)?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut Firewall) -> Result<ExternalUpdate> {
        let name = external_name_or_name(cr);
        let mut desired = compute::Firewall::default();
        generate_firewall(&name, &cr.spec.for_provider, &mut desired);
        let url = compute::firewall_url(&self.session.project_id, &name);
        let _: compute::Operation = self.session.client.patch(&url, &desired).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut Firewall) -> Result<()> {
        let url = compute::firewall_url(&self.session.project_id, &external_name_or_name(cr));
        ignore_not_found(self.session.client.delete(&url).await)
    }
}

// ---------------------------------------------------------------------------
// GlobalAddress
// ---------------------------------------------------------------------------

pub struct GlobalAddressExternal {
    session: GcpSession,
}

impl GlobalAddressExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<GlobalAddress>> {
        Box::new(Self { session })
    }
}

#[async_trait]
impl ExternalClient<GlobalAddress> for GlobalAddressExternal {
    async fn observe(&self, cr: &mut GlobalAddress) -> Result<ExternalObservation> {
        let url = compute::global_address_url(&self.session.project_id, &external_name_or_name(cr));
        let Some(observed) = not_found_as_none(self.session.client.get::<compute::Address>(&url).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_global_address(&mut cr.spec.for_provider, &observed);
        let observation = generate_global_address_observation(&observed);
        let ready = match observation.status.as_deref() {
            Some("RESERVING") => conditions::creating(),
            Some("RESERVED") | Some("IN_USE") => conditions::available(),
            _ => conditions::unavailable(),
        };
        cr.status.get_or_insert_with(Default::default).at_provider = Some(observation);
        cr.set_condition(ready);

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: is_global_address_up_to_date(),
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut GlobalAddress) -> Result<ExternalCreation> {
        let mut address = compute::Address::default();
        generate_global_address(&external_name_or_name(cr), &cr.spec.for_provider, &mut address);
        let url = compute::global_addresses_url(&self.session.project_id);
        let result = self
            .session
            .client
            .post::<_, compute::Operation>(&url, &address)
            .await
            .map(drop);
        ignore_already_exists(result)?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, _cr: &mut GlobalAddress) -> Result<ExternalUpdate> {
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut GlobalAddress) -> Result<()> {
        let url = compute::global_address_url(&self.session.project_id, &external_name_or_name(cr));
        ignore_not_found(self.session.client.delete(&url).await)
    }
}
