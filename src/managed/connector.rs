//! ProviderConfig loading and GCP session construction

use super::{Connector, ExternalClient};
use crate::crd::{CredentialsSource, Managed, ProviderConfig};
use crate::error::{OperatorError, Result};
use crate::gcp::auth::{ServiceAccountKey, TokenSource};
use crate::gcp::GcpClient;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::{Client, ResourceExt};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// An authenticated client bound to the project of one ProviderConfig.
#[derive(Clone)]
pub struct GcpSession {
    pub client: GcpClient,
    pub project_id: String,
}

/// Builds [`GcpSession`]s from ProviderConfigs, reusing token sources for as
/// long as neither the ProviderConfig nor its credentials Secret change.
pub struct SessionFactory {
    client: Client,
    http: reqwest::Client,
    tokens: Mutex<TokenCache<TokenSource>>,
}

impl SessionFactory {
    pub fn new(client: Client, http: reqwest::Client) -> Self {
        Self {
            client,
            http,
            tokens: Mutex::new(TokenCache::default()),
        }
    }

    /// Session for the named ProviderConfig.
    pub async fn session(&self, provider_config: &str) -> Result<GcpSession> {
        let configs: Api<ProviderConfig> = Api::all(self.client.clone());
        let pc = configs.get(provider_config).await.map_err(|e| {
            OperatorError::Configuration(format!(
                "cannot get ProviderConfig {}: {}",
                provider_config, e
            ))
        })?;

        let tokens = match pc.spec.credentials.source {
            CredentialsSource::Secret => self.secret_token_source(&pc).await?,
            CredentialsSource::InjectedIdentity => {
                let version = cache_version(&pc, None);
                let mut tokens = self.tokens.lock().await;
                tokens.get_or_insert_with(&pc.name_any(), &version, || {
                    TokenSource::from_metadata_server(self.http.clone())
                })
            }
        };

        Ok(GcpSession {
            client: GcpClient::new(self.http.clone(), tokens),
            project_id: pc.spec.project_id.clone(),
        })
    }

    async fn secret_token_source(&self, pc: &ProviderConfig) -> Result<Arc<TokenSource>> {
        let selector = pc.spec.credentials.secret_ref.as_ref().ok_or_else(|| {
            OperatorError::Configuration(format!(
                "ProviderConfig {} uses Secret credentials without a secretRef",
                pc.name_any()
            ))
        })?;

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &selector.namespace);
        let secret = secrets.get(&selector.name).await.map_err(|e| {
            OperatorError::Configuration(format!(
                "cannot get credentials secret {}/{}: {}",
                selector.namespace, selector.name, e
            ))
        })?;
        let data = secret
            .data
            .as_ref()
            .and_then(|d| d.get(&selector.key))
            .ok_or_else(|| {
                OperatorError::Configuration(format!(
                    "credentials secret {}/{} has no key {}",
                    selector.namespace, selector.name, selector.key
                ))
            })?;

        let version = cache_version(pc, secret.metadata.resource_version.as_deref());
        let mut tokens = self.tokens.lock().await;
        if let Some(existing) = tokens.get(&pc.name_any(), &version) {
            return Ok(existing);
        }
        let account = ServiceAccountKey::from_json(&data.0)?;
        debug!(
            provider_config = %pc.name_any(),
            client_email = %account.client_email,
            "Loaded service account credentials"
        );
        let source = Arc::new(TokenSource::from_service_account(self.http.clone(), account));
        tokens.insert(&pc.name_any(), version, Arc::clone(&source));
        Ok(source)
    }
}

/// Cache version of a ProviderConfig's credentials; changes whenever the
/// ProviderConfig or its Secret does.
pub(crate) fn cache_version(pc: &ProviderConfig, secret_version: Option<&str>) -> String {
    format!(
        "{}/{}",
        pc.metadata.resource_version.as_deref().unwrap_or_default(),
        secret_version.unwrap_or_default()
    )
}

/// One entry per ProviderConfig name, replaced when its version changes.
pub(crate) struct TokenCache<T> {
    entries: HashMap<String, (String, Arc<T>)>,
}

impl<T> Default for TokenCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> TokenCache<T> {
    pub(crate) fn get(&self, name: &str, version: &str) -> Option<Arc<T>> {
        self.entries
            .get(name)
            .filter(|(cached, _)| cached == version)
            .map(|(_, value)| Arc::clone(value))
    }

    pub(crate) fn insert(&mut self, name: &str, version: String, value: Arc<T>) {
        self.entries.insert(name.to_string(), (version, value));
    }

    pub(crate) fn get_or_insert_with(&mut self, name: &str, version: &str, build: impl FnOnce() -> T) -> Arc<T> {
        if let Some(existing) = self.get(name, version) {
            return existing;
        }
        let value = Arc::new(build());
        self.insert(name, version.to_string(), Arc::clone(&value));
        value
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// [`Connector`] building a kind's external client from a [`GcpSession`].
pub struct GcpConnector<K> {
    sessions: Arc<SessionFactory>,
    build: fn(GcpSession) -> Box<dyn ExternalClient<K>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Managed> GcpConnector<K> {
    pub fn new(sessions: Arc<SessionFactory>, build: fn(GcpSession) -> Box<dyn ExternalClient<K>>) -> Self {
        Self {
            sessions,
            build,
            _kind: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<K: Managed> Connector<K> for GcpConnector<K> {
    async fn connect(&self, cr: &K) -> Result<Box<dyn ExternalClient<K>>> {
        let provider_config = &cr.resource_spec().provider_config_ref.name;
        let session = self.sessions.session(provider_config).await?;
        Ok((self.build)(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ProviderConfigSpec, ProviderCredentials};

    fn provider_config(version: &str) -> ProviderConfig {
        let mut pc = ProviderConfig::new(
            "default",
            ProviderConfigSpec {
                project_id: "my-project".to_string(),
                credentials: ProviderCredentials {
                    source: CredentialsSource::InjectedIdentity,
                    secret_ref: None,
                },
            },
        );
        pc.metadata.resource_version = Some(version.to_string());
        pc
    }

    #[test]
    fn test_cache_version_tracks_versions() {
        let pc = provider_config("10");
        assert_eq!(cache_version(&pc, Some("7")), "10/7");
        assert_eq!(cache_version(&pc, None), "10/");
        assert_ne!(cache_version(&pc, Some("7")), cache_version(&pc, Some("8")));
        assert_ne!(
            cache_version(&pc, None),
            cache_version(&provider_config("11"), None)
        );
    }

    #[test]
    fn test_token_cache_replaces_stale_entries() {
        let mut cache = TokenCache::default();
        let first = cache.get_or_insert_with("default", "10/7", || "first");
        let again = cache.get_or_insert_with("default", "10/7", || "unused");
        assert!(Arc::ptr_eq(&first, &again));

        let rotated = cache.get_or_insert_with("default", "10/8", || "rotated");
        assert_eq!(*rotated, "rotated");
        assert!(cache.get("default", "10/7").is_none());
        assert_eq!(cache.len(), 1);

        cache.get_or_insert_with("other", "3/", || "other");
        assert_eq!(cache.len(), 2);
    }
}
