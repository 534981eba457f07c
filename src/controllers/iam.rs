//! External clients for ServiceAccount, ServiceAccountKey and
//! ServiceAccountPolicy

use super::required;
use crate::clients::iam::{
    generate_create_key_request, generate_service_account,
    generate_service_account_key_observation, generate_service_account_observation,
    generate_set_policy_request, is_policy_up_to_date, late_initialize_service_account,
    late_initialize_service_account_key, policy_exists, service_account_update_mask,
};
use crate::clients::update_mask;
use crate::conditions;
use crate::crd::{
    external_name, external_name_or_name, Managed, Policy, ServiceAccount, ServiceAccountKey,
    ServiceAccountPolicy,
};
use crate::error::{ignore_not_found, not_found_as_none, OperatorError, Result};
use crate::gcp::{iam, last_segment};
use crate::managed::{
    ConnectionDetails, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    GcpSession,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::info;

pub const CONNECTION_PRIVATE_KEY: &str = "privateKey";
pub const CONNECTION_PUBLIC_KEY: &str = "publicKey";

const DEFAULT_PUBLIC_KEY_TYPE: &str = "TYPE_X509_PEM_FILE";
const POLICY_VERSION: i64 = 3;

// ---------------------------------------------------------------------------
// ServiceAccount
// ---------------------------------------------------------------------------

pub struct ServiceAccountExternal {
    session: GcpSession,
}

impl ServiceAccountExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<ServiceAccount>> {
        Box::new(Self { session })
    }

    fn resource_name(&self, cr: &ServiceAccount) -> String {
        iam::service_account_name(&self.session.project_id, &external_name_or_name(cr))
    }
}

#[async_trait]
impl ExternalClient<ServiceAccount> for ServiceAccountExternal {
    async fn observe(&self, cr: &mut ServiceAccount) -> Result<ExternalObservation> {
        let url = iam::resource_url(&self.resource_name(cr));
        let Some(observed) =
            not_found_as_none(self.session.client.get::<iam::ServiceAccount>(&url).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_service_account(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_service_account_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: service_account_update_mask(&cr.spec.for_provider, &observed)
                .is_empty(),
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut ServiceAccount) -> Result<ExternalCreation> {
        let mut account = iam::ServiceAccount::default();
        generate_service_account(&cr.spec.for_provider, &mut account);
        let request = iam::CreateServiceAccountRequest {
            account_id: external_name_or_name(cr),
            service_account: account,
        };
        let _: iam::ServiceAccount = self
            .session
            .client
            .post(&iam::service_accounts_url(&self.session.project_id), &request)
            .await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut ServiceAccount) -> Result<ExternalUpdate> {
        let url = iam::resource_url(&self.resource_name(cr));
        let observed: iam::ServiceAccount = self.session.client.get(&url).await?;
        let mask = service_account_update_mask(&cr.spec.for_provider, &observed);
        if mask.is_empty() {
            return Ok(ExternalUpdate::default());
        }

        let mut account = iam::ServiceAccount {
            etag: observed.etag.clone(),
            ..Default::default()
        };
        generate_service_account(&cr.spec.for_provider, &mut account);
        let request = iam::PatchServiceAccountRequest {
            service_account: account,
            update_mask: update_mask(&mask),
        };
        let _: iam::ServiceAccount = self.session.client.patch(&url, &request).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut ServiceAccount) -> Result<()> {
        let url = iam::resource_url(&self.resource_name(cr));
        ignore_not_found(self.session.client.delete(&url).await)
    }
}

// ---------------------------------------------------------------------------
// ServiceAccountKey
// ---------------------------------------------------------------------------

pub struct ServiceAccountKeyExternal {
    session: GcpSession,
}

impl ServiceAccountKeyExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<ServiceAccountKey>> {
        Box::new(Self { session })
    }
}

#[async_trait]
impl ExternalClient<ServiceAccountKey> for ServiceAccountKeyExternal {
    async fn observe(&self, cr: &mut ServiceAccountKey) -> Result<ExternalObservation> {
        let Some(key_id) = external_name(cr).map(str::to_string) else {
            return Ok(ExternalObservation::absent());
        };
        let service_account = required(&cr.spec.for_provider.service_account, "serviceAccount")?;
        let public_key_type = cr
            .spec
            .for_provider
            .public_key_type
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_KEY_TYPE);
        let url = format!(
            "{}?publicKeyType={}",
            iam::key_url(service_account, &key_id),
            public_key_type
        );
        let Some(observed) =
            not_found_as_none(self.session.client.get::<iam::ServiceAccountKey>(&url).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_service_account_key(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_service_account_key_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: true,
            resource_late_initialized: before != cr.spec.for_provider,
            connection_details: key_connection_details(&observed)?,
        })
    }

    async fn create(&self, cr: &mut ServiceAccountKey) -> Result<ExternalCreation> {
        let service_account = required(&cr.spec.for_provider.service_account, "serviceAccount")?;
        let request = generate_create_key_request(&cr.spec.for_provider);
        let created: iam::ServiceAccountKey = self
            .session
            .client
            .post(&iam::keys_url(service_account), &request)
            .await?;
        let name = created.name.as_deref().ok_or_else(|| {
            OperatorError::InvalidState("created service account key has no name".to_string())
        })?;
        info!(service_account = %service_account, key = %name, "Created service account key");

        Ok(ExternalCreation {
            external_name_assigned: Some(last_segment(name).to_string()),
            connection_details: key_connection_details(&created)?,
        })
    }

    async fn update(&self, _cr: &mut ServiceAccountKey) -> Result<ExternalUpdate> {
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut ServiceAccountKey) -> Result<()> {
        let Some(key_id) = external_name(cr).map(str::to_string) else {
            return Ok(());
        };
        let service_account = required(&cr.spec.for_provider.service_account, "serviceAccount")?;
        ignore_not_found(
            self.session
                .client
                .delete(&iam::key_url(service_account, &key_id))
                .await,
        )
    }
}

/// Decoded key material. The private key is only present in the response
/// to a create.
fn key_connection_details(key: &iam::ServiceAccountKey) -> Result<ConnectionDetails> {
    let mut details = ConnectionDetails::new();
    for (name, data) in [
        (CONNECTION_PRIVATE_KEY, &key.private_key_data),
        (CONNECTION_PUBLIC_KEY, &key.public_key_data),
    ] {
        if let Some(data) = data.as_deref().filter(|d| !d.is_empty()) {
            let decoded = STANDARD.decode(data).map_err(|e| {
                OperatorError::InvalidState(format!("cannot decode {}: {}", name, e))
            })?;
            details.insert(name.to_string(), decoded);
        }
    }
    Ok(details)
}

// ---------------------------------------------------------------------------
// ServiceAccountPolicy
// ---------------------------------------------------------------------------

pub struct ServiceAccountPolicyExternal {
    session: GcpSession,
}

impl ServiceAccountPolicyExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<ServiceAccountPolicy>> {
        Box::new(Self { session })
    }

    async fn get_policy(&self, service_account: &str) -> Result<iam::Policy> {
        let request = iam::GetIamPolicyRequest {
            options: iam::GetPolicyOptions {
                requested_policy_version: POLICY_VERSION,
            },
        };
        self.session
            .client
            .post(&iam::get_iam_policy_url(service_account), &request)
            .await
    }

    async fn set_policy(&self, service_account: &str, desired: &Policy, etag: Option<&str>) -> Result<()> {
        let request = generate_set_policy_request(desired, etag);
        let _: iam::Policy = self
            .session
            .client
            .post(&iam::set_iam_policy_url(service_account), &request)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ExternalClient<ServiceAccountPolicy> for ServiceAccountPolicyExternal {
    async fn observe(&self, cr: &mut ServiceAccountPolicy) -> Result<ExternalObservation> {
        let service_account = required(&cr.spec.for_provider.service_account, "serviceAccount")?;
        let Some(observed) = not_found_as_none(self.get_policy(service_account).await)? else {
            return Ok(ExternalObservation::absent());
        };
        if !policy_exists(&observed) {
            return Ok(ExternalObservation::absent());
        }

        let up_to_date = is_policy_up_to_date(&cr.spec.for_provider.policy, &observed);
        cr.set_condition(conditions::available());
        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut ServiceAccountPolicy) -> Result<ExternalCreation> {
        let service_account = required(&cr.spec.for_provider.service_account, "serviceAccount")?;
        self.set_policy(service_account, &cr.spec.for_provider.policy, None)
            .await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut ServiceAccountPolicy) -> Result<ExternalUpdate> {
        let service_account = required(&cr.spec.for_provider.service_account, "serviceAccount")?;
        let observed = self.get_policy(service_account).await?;
        self.set_policy(
            service_account,
            &cr.spec.for_provider.policy,
            observed.etag.as_deref(),
        )
        .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut ServiceAccountPolicy) -> Result<()> {
        let service_account = required(&cr.spec.for_provider.service_account, "serviceAccount")?;
        let observed = match not_found_as_none(self.get_policy(service_account).await)? {
            Some(policy) => policy,
            None => return Ok(()),
        };
        ignore_not_found(
            self.set_policy(service_account, &Policy::default(), observed.etag.as_deref())
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_connection_details_decodes() {
        let key = iam::ServiceAccountKey {
            private_key_data: Some(STANDARD.encode(r#"{"type":"service_account"}"#)),
            public_key_data: Some(STANDARD.encode("-----BEGIN CERTIFICATE-----")),
            ..Default::default()
        };
        let details = key_connection_details(&key).unwrap();
        assert_eq!(
            details[CONNECTION_PRIVATE_KEY],
            br#"{"type":"service_account"}"#.to_vec()
        );
        assert_eq!(
            details[CONNECTION_PUBLIC_KEY],
            b"-----BEGIN CERTIFICATE-----".to_vec()
        );
    }

    #[test]
    fn test_key_connection_details_without_private_key() {
        let key = iam::ServiceAccountKey {
            public_key_data: Some(STANDARD.encode("pem")),
            ..Default::default()
        };
        let details = key_connection_details(&key).unwrap();
        assert!(!details.contains_key(CONNECTION_PRIVATE_KEY));
        assert_eq!(details.len(), 1);
    }

    #[test]
    fn test_key_connection_details_rejects_bad_base64() {
        let key = iam::ServiceAccountKey {
            private_key_data: Some("not base64!".to_string()),
            ..Default::default()
        };
        assert!(key_connection_details(&key).is_err());
    }
}
