//! Generic reconciliation of managed resources
//!
//! Every GCP kind is driven by the same [`Reconciler`]. What differs per
//! kind is the [`ExternalClient`] that talks to the GCP API; the reconciler
//! owns finalizers, conditions, external names, reference resolution and
//! the connection secret.

mod connector;
mod publisher;
mod reconciler;

pub use connector::{GcpConnector, GcpSession, SessionFactory};
pub use publisher::ConnectionPublisher;
pub use reconciler::{Reconciler, ReconcilerOptions};

use crate::crd::Managed;
use crate::error::Result;
use std::collections::BTreeMap;

/// Key/value pairs written to a resource's connection secret.
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// What an [`ExternalClient`] learned about the external resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    /// The client filled unset spec fields from the observed resource and
    /// the spec must be persisted.
    pub resource_late_initialized: bool,
    pub connection_details: ConnectionDetails,
}

impl ExternalObservation {
    /// The external resource does not exist.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Outcome of creating an external resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalCreation {
    /// Identifier GCP assigned to the new resource, stored as the external
    /// name annotation.
    pub external_name_assigned: Option<String>,
    pub connection_details: ConnectionDetails,
}

/// Outcome of updating an external resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// CRUD operations against the external resource backing a managed kind.
///
/// `observe` may fill `status.atProvider`, the `Ready` condition and, through
/// late initialization, unset spec fields of the object it is handed.
#[async_trait::async_trait]
pub trait ExternalClient<K: Managed>: Send + Sync {
    async fn observe(&self, cr: &mut K) -> Result<ExternalObservation>;

    async fn create(&self, cr: &mut K) -> Result<ExternalCreation>;

    async fn update(&self, cr: &mut K) -> Result<ExternalUpdate>;

    async fn delete(&self, cr: &mut K) -> Result<()>;
}

/// Produces an [`ExternalClient`] for a managed resource, typically by
/// loading the ProviderConfig it references.
#[async_trait::async_trait]
pub trait Connector<K: Managed>: Send + Sync {
    async fn connect(&self, cr: &K) -> Result<Box<dyn ExternalClient<K>>>;
}
