//! External clients for KeyRing and CryptoKey
//!
//! Neither key rings nor crypto keys can be deleted in Cloud KMS. Deleting
//! the managed resource only releases it; the external resource stays, and
//! is reported as gone once the managed resource is being deleted so the
//! finalizer can be removed.

use super::required;
use crate::clients::kms::{
    crypto_key_update_mask, generate_crypto_key, generate_crypto_key_observation,
    generate_key_ring_observation, is_key_ring_up_to_date, late_initialize_crypto_key,
};
use crate::clients::update_mask;
use crate::conditions;
use crate::crd::{external_name_or_name, CryptoKey, KeyRing, Managed};
use crate::error::{ignore_already_exists, not_found_as_none, Result};
use crate::gcp::kms;
use crate::managed::{
    ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, GcpSession,
};
use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use tracing::info;

const UNDELETABLE: &str = "Cloud KMS resources cannot be deleted; releasing the managed resource only";

// ---------------------------------------------------------------------------
// KeyRing
// ---------------------------------------------------------------------------

pub struct KeyRingExternal {
    session: GcpSession,
}

impl KeyRingExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<KeyRing>> {
        Box::new(Self { session })
    }
}

#[async_trait]
impl ExternalClient<KeyRing> for KeyRingExternal {
    async fn observe(&self, cr: &mut KeyRing) -> Result<ExternalObservation> {
        if cr.meta().deletion_timestamp.is_some() {
            info!(kind = "KeyRing", name = %cr.name_any(), "{}", UNDELETABLE);
            return Ok(ExternalObservation::absent());
        }
        let name = kms::key_ring_name(
            &self.session.project_id,
            &cr.spec.for_provider.location,
            &external_name_or_name(cr),
        );
        let Some(observed) = not_found_as_none(
            self.session
                .client
                .get::<kms::KeyRing>(&kms::resource_url(&name))
                .await,
        )?
        else {
            return Ok(ExternalObservation::absent());
        };

        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_key_ring_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: is_key_ring_up_to_date(),
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut KeyRing) -> Result<ExternalCreation> {
        let url = kms::create_key_ring_url(
            &self.session.project_id,
            &cr.spec.for_provider.location,
            &external_name_or_name(cr),
        );
        let result = self
            .session
            .client
            .post::<_, kms::KeyRing>(&url, &kms::KeyRing::default())
            .await
            .map(drop);
        ignore_already_exists(result)?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, _cr: &mut KeyRing) -> Result<ExternalUpdate> {
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut KeyRing) -> Result<()> {
        info!(kind = "KeyRing", name = %cr.name_any(), "{}", UNDELETABLE);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CryptoKey
// ---------------------------------------------------------------------------

pub struct CryptoKeyExternal {
    session: GcpSession,
}

impl CryptoKeyExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<CryptoKey>> {
        Box::new(Self { session })
    }
}

#[async_trait]
impl ExternalClient<CryptoKey> for CryptoKeyExternal {
    async fn observe(&self, cr: &mut CryptoKey) -> Result<ExternalObservation> {
        if cr.meta().deletion_timestamp.is_some() {
            info!(kind = "CryptoKey", name = %cr.name_any(), "{}", UNDELETABLE);
            return Ok(ExternalObservation::absent());
        }
        let key_ring = required(&cr.spec.for_provider.key_ring, "keyRing")?;
        let name = kms::crypto_key_name(key_ring, &external_name_or_name(cr));
        let Some(observed) = not_found_as_none(
            self.session
                .client
                .get::<kms::CryptoKey>(&kms::resource_url(&name))
                .await,
        )?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_crypto_key(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_crypto_key_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: crypto_key_update_mask(&cr.spec.for_provider, &observed)
                .is_empty(),
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut CryptoKey) -> Result<ExternalCreation> {
        let key_ring = required(&cr.spec.for_provider.key_ring, "keyRing")?;
        let mut key = kms::CryptoKey::default();
        generate_crypto_key(&cr.spec.for_provider, &mut key);
        let url = kms::create_crypto_key_url(key_ring, &external_name_or_name(cr));
        let result = self
            .session
            .client
            .post::<_, kms::CryptoKey>(&url, &key)
            .await
            .map(drop);
        ignore_already_exists(result)?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut CryptoKey) -> Result<ExternalUpdate> {
        let key_ring = required(&cr.spec.for_provider.key_ring, "keyRing")?;
        let name = kms::crypto_key_name(key_ring, &external_name_or_name(cr));
        let observed: kms::CryptoKey = self.session.client.get(&kms::resource_url(&name)).await?;
        let mask = crypto_key_update_mask(&cr.spec.for_provider, &observed);
        if mask.is_empty() {
            return Ok(ExternalUpdate::default());
        }

        let mut desired = kms::CryptoKey::default();
        generate_crypto_key(&cr.spec.for_provider, &mut desired);
        let _: kms::CryptoKey = self
            .session
            .client
            .patch(&kms::patch_url(&name, &update_mask(&mask)), &desired)
            .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut CryptoKey) -> Result<()> {
        info!(kind = "CryptoKey", name = %cr.name_any(), "{}", UNDELETABLE);
        Ok(())
    }
}
