//! GCP provider for Kubernetes
//!
//! Reconciles cluster-scoped custom resources against Google Cloud Platform,
//! creating, updating, and deleting the GCP objects they describe and
//! publishing connection details into Kubernetes Secrets.
//!
//! ## Custom Resources
//!
//! - `ProviderConfig`: project and credentials used by managed resources
//! - Compute: `Network`, `Subnetwork`, `Firewall`, `GlobalAddress`
//! - Storage: `Bucket`
//! - IAM: `ServiceAccount`, `ServiceAccountKey`, `ServiceAccountPolicy`
//! - Database: `CloudSQLInstance`
//! - Pub/Sub: `Topic`, `Subscription`
//! - KMS: `KeyRing`, `CryptoKey`
//! - Cache: `CloudMemorystoreInstance`
//!
//! ## Example
//!
//! ```yaml
//! apiVersion: compute.gcp.crossplane.io/v1beta1
//! kind: Network
//! metadata:
//!   name: example-network
//! spec:
//!   forProvider:
//!     autoCreateSubnetworks: false
//!     routingConfig:
//!       routingMode: REGIONAL
//!   providerConfigRef:
//!     name: default
//! ```

pub mod clients;
pub mod conditions;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod gcp;
pub mod leader_election;
pub mod managed;
pub mod reference;

#[cfg(test)]
mod testing;

pub use controllers::{spawn_all, ControllerHandle};
pub use crd::{all_crds, Managed, ProviderConfig};
pub use error::{OperatorError, Result};
pub use managed::{Reconciler, ReconcilerOptions};
