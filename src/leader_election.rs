//! Lease-based leader election
//!
//! Several provider replicas may run at once; only the holder of the
//! `coordination.k8s.io/v1` Lease runs controllers. The others wait in
//! [`LeaderElector::acquire`] until the lease is released or expires.

use crate::error::Result;
use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::api::{Api, PostParams};
use kube::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

const SERVICE_ACCOUNT_NAMESPACE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Lease name and timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseConfig {
    pub name: String,
    /// How long a lease stays valid without renewal
    pub lease_duration: Duration,
    pub renew_interval: Duration,
    pub retry_interval: Duration,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            name: "provider-gcp-leader".to_string(),
            lease_duration: Duration::from_secs(15),
            renew_interval: Duration::from_secs(10),
            retry_interval: Duration::from_secs(5),
        }
    }
}

/// Explicit namespace, else the pod's own namespace, else `default`.
pub fn detect_namespace(explicit: &str) -> String {
    if !explicit.is_empty() {
        return explicit.to_string();
    }
    std::fs::read_to_string(SERVICE_ACCOUNT_NAMESPACE)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "default".to_string())
}

pub struct LeaderElector {
    leases: Api<Lease>,
    identity: String,
    config: LeaseConfig,
}

impl LeaderElector {
    pub fn new(client: Client, namespace: &str, config: LeaseConfig) -> Self {
        let identity = std::env::var("POD_NAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .unwrap_or_else(|_| format!("provider-gcp-{:08x}", rand::random::<u32>()));
        info!(identity = %identity, namespace = %namespace, lease = %config.name, "Initialized leader elector");
        Self {
            leases: Api::namespaced(client, namespace),
            identity,
            config,
        }
    }

    /// Block until this replica holds the lease.
    pub async fn acquire(&self) -> Result<()> {
        info!(identity = %self.identity, "Waiting to acquire leader lease '{}'", self.config.name);
        loop {
            match self.try_acquire().await {
                Ok(true) => {
                    info!(identity = %self.identity, "Acquired leader lease");
                    return Ok(());
                }
                Ok(false) => debug!("Lease held by another replica"),
                Err(e) => warn!("Lease acquisition error: {}", e),
            }
            tokio::time::sleep(self.config.retry_interval).await;
        }
    }

    /// Renew the lease; `Ok(false)` means leadership was lost.
    pub async fn renew(&self) -> Result<bool> {
        let lease = self.leases.get(&self.config.name).await?;
        if holder(&lease) != Some(self.identity.as_str()) {
            return Ok(false);
        }
        let mut updated = lease.clone();
        if let Some(spec) = updated.spec.as_mut() {
            spec.renew_time = Some(MicroTime(Utc::now()));
        }
        self.replace(&updated).await
    }

    /// Hand the lease back so a standby replica can take over at once.
    pub async fn release(&self) {
        let lease = match self.leases.get(&self.config.name).await {
            Ok(l) => l,
            Err(e) => {
                warn!("Failed to read lease for release: {}", e);
                return;
            }
        };
        if holder(&lease) != Some(self.identity.as_str()) {
            return;
        }
        let mut updated = lease.clone();
        if let Some(spec) = updated.spec.as_mut() {
            spec.holder_identity = None;
        }
        match self.replace(&updated).await {
            Ok(_) => info!("Released leader lease"),
            Err(e) => warn!("Failed to release leader lease: {}", e),
        }
    }

    pub fn renew_interval(&self) -> Duration {
        self.config.renew_interval
    }

    async fn try_acquire(&self) -> Result<bool> {
        let now = Utc::now();
        let Some(existing) = self.leases.get_opt(&self.config.name).await? else {
            let lease = Lease {
                metadata: ObjectMeta {
                    name: Some(self.config.name.clone()),
                    ..Default::default()
                },
                spec: Some(self.lease_spec(None, now)),
            };
            return match self.leases.create(&PostParams::default(), &lease).await {
                Ok(_) => Ok(true),
                Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
                Err(e) => Err(e.into()),
            };
        };

        let ours = holder(&existing) == Some(self.identity.as_str());
        if !ours && !is_expired(existing.spec.as_ref(), now, self.config.lease_duration) {
            return Ok(false);
        }
        let mut updated = existing.clone();
        updated.spec = Some(self.lease_spec(existing.spec.as_ref().filter(|_| ours), now));
        if !ours {
            if let Some(spec) = updated.spec.as_mut() {
                let previous = existing.spec.as_ref().and_then(|s| s.lease_transitions);
                spec.lease_transitions = Some(previous.unwrap_or(0) + 1);
            }
        }
        self.replace(&updated).await
    }

    /// Spec naming this replica as holder. `held` is the current spec when
    /// the lease is already ours, preserving its acquire time.
    fn lease_spec(&self, held: Option<&LeaseSpec>, now: DateTime<Utc>) -> LeaseSpec {
        LeaseSpec {
            holder_identity: Some(self.identity.clone()),
            lease_duration_seconds: Some(self.config.lease_duration.as_secs() as i32),
            acquire_time: held
                .and_then(|s| s.acquire_time.clone())
                .or(Some(MicroTime(now))),
            renew_time: Some(MicroTime(now)),
            lease_transitions: Some(held.and_then(|s| s.lease_transitions).unwrap_or(0)),
            ..Default::default()
        }
    }

    async fn replace(&self, lease: &Lease) -> Result<bool> {
        match self
            .leases
            .replace(&self.config.name, &PostParams::default(), lease)
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                warn!("Lease conflict, another replica updated it first");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn holder(lease: &Lease) -> Option<&str> {
    lease.spec.as_ref().and_then(|s| s.holder_identity.as_deref())
}

/// A lease without a holder, or not renewed within its duration, is free.
fn is_expired(spec: Option<&LeaseSpec>, now: DateTime<Utc>, default_duration: Duration) -> bool {
    let Some(spec) = spec else {
        return true;
    };
    if spec.holder_identity.is_none() {
        return true;
    }
    let duration = spec
        .lease_duration_seconds
        .map(i64::from)
        .unwrap_or(default_duration.as_secs() as i64);
    match spec.renew_time.as_ref() {
        Some(MicroTime(renewed)) => now.signed_duration_since(*renewed).num_seconds() > duration,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(holder: Option<&str>, renewed_secs_ago: i64) -> LeaseSpec {
        LeaseSpec {
            holder_identity: holder.map(str::to_string),
            lease_duration_seconds: Some(15),
            renew_time: Some(MicroTime(
                Utc::now() - chrono::Duration::seconds(renewed_secs_ago),
            )),
            ..Default::default()
        }
    }

    #[test]
    fn test_lease_expiry() {
        let now = Utc::now();
        let ttl = Duration::from_secs(15);
        assert!(!is_expired(Some(&spec(Some("a"), 5)), now, ttl));
        assert!(is_expired(Some(&spec(Some("a"), 60)), now, ttl));
        assert!(is_expired(Some(&spec(None, 1)), now, ttl));
        assert!(is_expired(None, now, ttl));
    }

    #[test]
    fn test_explicit_namespace_wins() {
        assert_eq!(detect_namespace("crossplane-system"), "crossplane-system");
    }

    #[test]
    fn test_default_lease_config() {
        let config = LeaseConfig::default();
        assert_eq!(config.name, "provider-gcp-leader");
        assert!(config.renew_interval < config.lease_duration);
    }
}
