//! The managed resource reconcile loop

use super::{ConnectionDetails, ConnectionPublisher, Connector};
use crate::conditions::{self, MANAGED_FINALIZER};
use crate::crd::{
    external_name, set_external_name, DeletionPolicy, Managed, ANNOTATION_EXTERNAL_NAME,
};
use crate::error::{OperatorError, Result};
use crate::reference::{ResolveReferences, Resolver};
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tunables shared by every managed resource controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// How often an up-to-date resource is observed again
    pub poll_interval: Duration,
    /// Requeue delay after a create, a delete or a failed step
    pub short_wait: Duration,
    /// Maximum concurrent reconciles per kind
    pub max_concurrent: u16,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            short_wait: Duration::from_secs(30),
            max_concurrent: 10,
        }
    }
}

/// Drives one managed kind through observe, create, update and delete.
pub struct Reconciler<K: ResolveReferences> {
    client: Client,
    connector: Box<dyn Connector<K>>,
    resolver: Resolver,
    publisher: ConnectionPublisher,
    options: ReconcilerOptions,
}

impl<K: ResolveReferences> Reconciler<K> {
    pub fn new(client: Client, connector: Box<dyn Connector<K>>, options: ReconcilerOptions) -> Self {
        Self {
            resolver: Resolver::new(client.clone()),
            publisher: ConnectionPublisher::new(client.clone()),
            client,
            connector,
            options,
        }
    }

    /// Watch every object of kind `K` until a shutdown signal arrives.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let api: Api<K> = Api::all(self.client.clone());
        let kind = K::kind(&()).to_string();

        info!(kind = %kind, concurrency = self.options.max_concurrent, "Starting controller");

        Controller::new(api, watcher::Config::default())
            .with_config(controller::Config::default().concurrency(self.options.max_concurrent))
            .shutdown_on_signal()
            .run(
                |obj, ctx| async move { ctx.reconcile(obj).await },
                Self::error_policy,
                Arc::clone(&self),
            )
            .for_each(|result| {
                let kind = kind.clone();
                async move {
                    match result {
                        Ok((obj, _action)) => debug!(kind = %kind, name = %obj.name, "Reconciled"),
                        Err(e) => warn!(kind = %kind, "Reconciliation failed: {}", e),
                    }
                }
            })
            .await;

        info!(kind = %K::kind(&()), "Controller stopped");
        Ok(())
    }

    fn error_policy(obj: Arc<K>, err: &OperatorError, ctx: Arc<Self>) -> Action {
        error!(kind = %K::kind(&()), name = %obj.name_any(), "Reconcile error: {}", err);
        Action::requeue(ctx.options.short_wait)
    }

    async fn reconcile(&self, obj: Arc<K>) -> Result<Action> {
        let mut cr = (*obj).clone();
        let api: Api<K> = Api::all(self.client.clone());
        let name = cr.name_any();
        let deleting = cr.meta().deletion_timestamp.is_some();

        debug!(
            kind = %K::kind(&()),
            name = %name,
            deleting,
            ready = conditions::condition_status(cr.conditions(), conditions::CONDITION_READY),
            "Reconciling"
        );

        if deleting && cr.resource_spec().deletion_policy == DeletionPolicy::Orphan {
            info!(kind = %K::kind(&()), name = %name, "Orphaning external resource");
            if let Err(e) = self.publisher.unpublish(&cr).await {
                return self.fail(&api, cr, "unpublish connection details", e).await;
            }
            self.remove_finalizer(&api, &cr).await?;
            return Ok(Action::await_change());
        }

        if K::NAME_AS_EXTERNAL_NAME && external_name(&cr).is_none() {
            set_external_name(&mut cr, &name);
            self.persist_external_name(&api, &cr).await?;
        }

        let external = match self.connector.connect(&cr).await {
            Ok(external) => external,
            Err(e) => return self.fail(&api, cr, "connect to GCP", e).await,
        };

        if !deleting {
            let before = cr.spec_json()?;
            if let Err(e) = cr.resolve_references(&self.resolver).await {
                return self.fail(&api, cr, "resolve references", e).await;
            }
            if cr.spec_json()? != before {
                debug!(name = %name, "Persisting resolved references");
                self.persist_spec(&api, &cr).await?;
            }
        }

        let observation = match external.observe(&mut cr).await {
            Ok(o) => o,
            Err(e) => return self.fail(&api, cr, "observe external resource", e).await,
        };

        if deleting {
            if observation.resource_exists {
                info!(kind = %K::kind(&()), name = %name, "Deleting external resource");
                cr.set_condition(conditions::deleting());
                if let Err(e) = external.delete(&mut cr).await {
                    return self.fail(&api, cr, "delete external resource", e).await;
                }
                cr.set_condition(conditions::reconcile_success());
                self.update_status(&api, &cr).await?;
                return Ok(Action::requeue(self.options.short_wait));
            }
            if let Err(e) = self.publisher.unpublish(&cr).await {
                return self.fail(&api, cr, "unpublish connection details", e).await;
            }
            self.remove_finalizer(&api, &cr).await?;
            info!(kind = %K::kind(&()), name = %name, "External resource deleted");
            return Ok(Action::await_change());
        }

        if let Err(e) = self.publish(&cr, &observation.connection_details).await {
            return self.fail(&api, cr, "publish connection details", e).await;
        }
        if let Err(e) = self.add_finalizer(&api, &cr).await {
            return self.fail(&api, cr, "add finalizer", e).await;
        }

        if !observation.resource_exists {
            info!(kind = %K::kind(&()), name = %name, "Creating external resource");
            cr.set_condition(conditions::creating());
            let creation = match external.create(&mut cr).await {
                Ok(c) => c,
                Err(e) => return self.fail(&api, cr, "create external resource", e).await,
            };
            if let Some(assigned) = creation.external_name_assigned.as_deref() {
                set_external_name(&mut cr, assigned);
                self.persist_external_name(&api, &cr).await?;
            }
            if let Err(e) = self.publish(&cr, &creation.connection_details).await {
                return self.fail(&api, cr, "publish connection details", e).await;
            }
            cr.set_condition(conditions::reconcile_success());
            self.update_status(&api, &cr).await?;
            return Ok(Action::requeue(self.options.short_wait));
        }

        if observation.resource_late_initialized {
            debug!(name = %name, "Persisting late-initialized spec");
            if let Err(e) = self.persist_spec(&api, &cr).await {
                return self.fail(&api, cr, "update managed resource", e).await;
            }
        }

        if observation.resource_up_to_date {
            cr.set_condition(conditions::reconcile_success());
            self.update_status(&api, &cr).await?;
            return Ok(Action::requeue(self.options.poll_interval));
        }

        info!(kind = %K::kind(&()), name = %name, "Updating external resource");
        let update = match external.update(&mut cr).await {
            Ok(u) => u,
            Err(e) => return self.fail(&api, cr, "update external resource", e).await,
        };
        if let Err(e) = self.publish(&cr, &update.connection_details).await {
            return self.fail(&api, cr, "publish connection details", e).await;
        }
        cr.set_condition(conditions::reconcile_success());
        self.update_status(&api, &cr).await?;
        Ok(Action::requeue(self.options.poll_interval))
    }

    /// Record a failed step as `Synced=False` and retry later.
    async fn fail(&self, api: &Api<K>, mut cr: K, step: &'static str, err: OperatorError) -> Result<Action> {
        let err = OperatorError::during(step)(err);
        warn!(kind = %K::kind(&()), name = %cr.name_any(), "{}", err);
        cr.set_condition(conditions::reconcile_error(&err.to_string()));
        self.update_status(api, &cr).await?;
        Ok(Action::requeue(self.options.short_wait))
    }

    async fn publish(&self, cr: &K, details: &ConnectionDetails) -> Result<()> {
        self.publisher.publish(cr, details).await
    }

    async fn update_status(&self, api: &Api<K>, cr: &K) -> Result<()> {
        let patch = json!({ "status": cr.status_json()? });
        api.patch_status(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn persist_spec(&self, api: &Api<K>, cr: &K) -> Result<()> {
        let patch = json!({ "spec": cr.spec_json()? });
        api.patch(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn persist_external_name(&self, api: &Api<K>, cr: &K) -> Result<()> {
        let patch = json!({
            "metadata": {
                "annotations": {
                    ANNOTATION_EXTERNAL_NAME: external_name(cr)
                }
            }
        });
        api.patch(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn add_finalizer(&self, api: &Api<K>, cr: &K) -> Result<()> {
        let Some(finalizers) = with_finalizer(cr.meta()) else {
            return Ok(());
        };
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn remove_finalizer(&self, api: &Api<K>, cr: &K) -> Result<()> {
        let Some(finalizers) = without_finalizer(cr.meta()) else {
            return Ok(());
        };
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        info!(kind = %K::kind(&()), name = %cr.name_any(), "Finalizer removed");
        Ok(())
    }
}

/// Finalizers with ours appended, or `None` when it is already present.
fn with_finalizer(meta: &ObjectMeta) -> Option<Vec<String>> {
    let current = meta.finalizers.as_deref().unwrap_or_default();
    if current.iter().any(|f| f == MANAGED_FINALIZER) {
        return None;
    }
    let mut finalizers = current.to_vec();
    finalizers.push(MANAGED_FINALIZER.to_string());
    Some(finalizers)
}

/// Finalizers with ours removed, or `None` when it is not present.
fn without_finalizer(meta: &ObjectMeta) -> Option<Vec<String>> {
    let current = meta.finalizers.as_deref().unwrap_or_default();
    if !current.iter().any(|f| f == MANAGED_FINALIZER) {
        return None;
    }
    Some(
        current
            .iter()
            .filter(|f| f.as_str() != MANAGED_FINALIZER)
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Network, NetworkParameters, NetworkSpec, ResourceSpec};
    use crate::managed::{ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate};
    use crate::testing::{self, Recorded, Requests};
    use http::StatusCode;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::Mutex;

    /// What the fake GCP API does, and the calls it received.
    #[derive(Default)]
    struct Script {
        observation: ExternalObservation,
        observe_error: Option<(u16, &'static str)>,
        assigned_name: Option<&'static str>,
        late_init_description: Option<&'static str>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl Script {
        fn existing(up_to_date: bool) -> Self {
            Self {
                observation: ExternalObservation {
                    resource_exists: true,
                    resource_up_to_date: up_to_date,
                    ..Default::default()
                },
                ..Default::default()
            }
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct FakeConnector(Arc<Script>);

    struct FakeExternal(Arc<Script>);

    #[async_trait::async_trait]
    impl Connector<Network> for FakeConnector {
        async fn connect(&self, _cr: &Network) -> Result<Box<dyn ExternalClient<Network>>> {
            Ok(Box::new(FakeExternal(Arc::clone(&self.0))))
        }
    }

    #[async_trait::async_trait]
    impl ExternalClient<Network> for FakeExternal {
        async fn observe(&self, cr: &mut Network) -> Result<ExternalObservation> {
            self.0.record("observe");
            if let Some((code, message)) = self.0.observe_error {
                return Err(OperatorError::Gcp {
                    code,
                    message: message.to_string(),
                });
            }
            if let Some(description) = self.0.late_init_description {
                cr.spec.for_provider.description = Some(description.to_string());
            }
            Ok(self.0.observation.clone())
        }

        async fn create(&self, _cr: &mut Network) -> Result<ExternalCreation> {
            self.0.record("create");
            Ok(ExternalCreation {
                external_name_assigned: self.0.assigned_name.map(str::to_string),
                ..Default::default()
            })
        }

        async fn update(&self, _cr: &mut Network) -> Result<ExternalUpdate> {
            self.0.record("update");
            Ok(ExternalUpdate::default())
        }

        async fn delete(&self, _cr: &mut Network) -> Result<()> {
            self.0.record("delete");
            Ok(())
        }
    }

    const NETWORK_PATH: &str = "/apis/compute.gcp.crossplane.io/v1beta1/networks/vpc";

    fn network(finalizers: &[&str]) -> Network {
        let mut n = Network::new(
            "vpc",
            NetworkSpec {
                resource_spec: ResourceSpec::default(),
                for_provider: NetworkParameters::default(),
            },
        );
        n.metadata.uid = Some("uid-1".to_string());
        n.metadata.annotations =
            Some([(ANNOTATION_EXTERNAL_NAME.to_string(), "vpc".to_string())].into());
        n.metadata.finalizers = Some(finalizers.iter().map(|f| f.to_string()).collect());
        n
    }

    fn deleted(mut n: Network, policy: DeletionPolicy) -> Network {
        n.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
        n.spec.resource_spec.deletion_policy = policy;
        n
    }

    /// Reconcile `cr` once against a fake API server that accepts every
    /// patch and knows no other object.
    async fn reconcile_once(script: Script, cr: Network) -> (Action, Requests, Arc<Script>) {
        let served = serde_json::to_value(&cr).unwrap();
        let (client, requests) = testing::mock_client(move |method, _, _| {
            if method == "PATCH" {
                (StatusCode::OK, served.clone())
            } else {
                testing::not_found()
            }
        });
        let script = Arc::new(script);
        let reconciler = Reconciler::new(
            client,
            Box::new(FakeConnector(Arc::clone(&script))),
            ReconcilerOptions::default(),
        );
        let action = reconciler.reconcile(Arc::new(cr)).await.unwrap();
        (action, requests, script)
    }

    fn spec_patches(requests: &Requests) -> Vec<Value> {
        testing::matching(requests, "PATCH", NETWORK_PATH)
            .into_iter()
            .map(|r: Recorded| r.body)
            .collect()
    }

    /// Condition of `type` in the last status patch.
    fn last_condition(requests: &Requests, condition_type: &str) -> Value {
        let patches = testing::matching(requests, "PATCH", "/networks/vpc/status");
        let last = patches.last().expect("no status patch");
        last.body["status"]["conditions"]
            .as_array()
            .and_then(|c| c.iter().find(|c| c["type"] == condition_type))
            .cloned()
            .unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn test_orphan_leaves_external_resource() {
        let cr = deleted(network(&[MANAGED_FINALIZER]), DeletionPolicy::Orphan);
        let (action, requests, script) = reconcile_once(Script::existing(true), cr).await;

        assert_eq!(action, Action::await_change());
        assert!(script.calls().is_empty());
        let patches = spec_patches(&requests);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0]["metadata"]["finalizers"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_delete_existing_resource() {
        let cr = deleted(network(&[MANAGED_FINALIZER]), DeletionPolicy::Delete);
        let (action, requests, script) = reconcile_once(Script::existing(true), cr).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(30)));
        assert_eq!(script.calls(), vec!["observe", "delete"]);
        assert!(spec_patches(&requests).is_empty());
        assert_eq!(last_condition(&requests, "Ready")["reason"], "Deleting");
        assert_eq!(last_condition(&requests, "Synced")["status"], "True");
    }

    #[tokio::test]
    async fn test_delete_gone_resource_removes_finalizer() {
        let cr = deleted(network(&["other", MANAGED_FINALIZER]), DeletionPolicy::Delete);
        let (action, requests, script) = reconcile_once(Script::default(), cr).await;

        assert_eq!(action, Action::await_change());
        assert_eq!(script.calls(), vec!["observe"]);
        let patches = spec_patches(&requests);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0]["metadata"]["finalizers"], serde_json::json!(["other"]));
    }

    #[tokio::test]
    async fn test_create_persists_assigned_external_name() {
        let mut cr = network(&[]);
        cr.metadata.annotations = None;
        let script = Script {
            assigned_name: Some("net-1234"),
            ..Default::default()
        };
        let (action, requests, script) = reconcile_once(script, cr).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(30)));
        assert_eq!(script.calls(), vec!["observe", "create"]);

        let patches = spec_patches(&requests);
        assert_eq!(patches.len(), 3);
        assert_eq!(patches[0]["metadata"]["annotations"][ANNOTATION_EXTERNAL_NAME], "vpc");
        assert_eq!(
            patches[1]["metadata"]["finalizers"],
            serde_json::json!([MANAGED_FINALIZER])
        );
        assert_eq!(
            patches[2]["metadata"]["annotations"][ANNOTATION_EXTERNAL_NAME],
            "net-1234"
        );
        assert_eq!(last_condition(&requests, "Ready")["reason"], "Creating");
        assert_eq!(last_condition(&requests, "Synced")["status"], "True");
    }

    #[tokio::test]
    async fn test_late_initialized_spec_is_persisted() {
        let mut script = Script::existing(true);
        script.observation.resource_late_initialized = true;
        script.late_init_description = Some("observed description");
        let (action, requests, script) = reconcile_once(script, network(&[MANAGED_FINALIZER])).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(60)));
        assert_eq!(script.calls(), vec!["observe"]);
        let patches = spec_patches(&requests);
        assert_eq!(patches.len(), 1);
        assert_eq!(
            patches[0]["spec"]["forProvider"]["description"],
            "observed description"
        );
    }

    #[tokio::test]
    async fn test_up_to_date_resource_is_polled() {
        let (action, requests, script) =
            reconcile_once(Script::existing(true), network(&[MANAGED_FINALIZER])).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(60)));
        assert_eq!(script.calls(), vec!["observe"]);
        assert!(spec_patches(&requests).is_empty());
        assert_eq!(last_condition(&requests, "Synced")["reason"], "ReconcileSuccess");
    }

    #[tokio::test]
    async fn test_drifted_resource_is_updated() {
        let (action, requests, script) =
            reconcile_once(Script::existing(false), network(&[MANAGED_FINALIZER])).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(60)));
        assert_eq!(script.calls(), vec!["observe", "update"]);
        assert_eq!(last_condition(&requests, "Synced")["status"], "True");
    }

    #[tokio::test]
    async fn test_failed_observe_sets_synced_false() {
        let script = Script {
            observe_error: Some((500, "boom")),
            ..Default::default()
        };
        let (action, requests, script) = reconcile_once(script, network(&[MANAGED_FINALIZER])).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(30)));
        assert_eq!(script.calls(), vec!["observe"]);
        let synced = last_condition(&requests, "Synced");
        assert_eq!(synced["status"], "False");
        assert_eq!(synced["reason"], "ReconcileError");
        assert_eq!(
            synced["message"],
            "cannot observe external resource: GCP API error 500: boom"
        );
    }

    fn meta(finalizers: &[&str]) -> ObjectMeta {
        ObjectMeta {
            finalizers: Some(finalizers.iter().map(|f| f.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_with_finalizer() {
        assert_eq!(
            with_finalizer(&ObjectMeta::default()),
            Some(vec![MANAGED_FINALIZER.to_string()])
        );
        assert_eq!(
            with_finalizer(&meta(&["other"])),
            Some(vec!["other".to_string(), MANAGED_FINALIZER.to_string()])
        );
        assert_eq!(with_finalizer(&meta(&[MANAGED_FINALIZER])), None);
    }

    #[test]
    fn test_without_finalizer() {
        assert_eq!(without_finalizer(&ObjectMeta::default()), None);
        assert_eq!(
            without_finalizer(&meta(&["other", MANAGED_FINALIZER])),
            Some(vec!["other".to_string()])
        );
    }

    #[test]
    fn test_default_options() {
        let options = ReconcilerOptions::default();
        assert_eq!(options.poll_interval, Duration::from_secs(60));
        assert_eq!(options.max_concurrent, 10);
        assert!(options.short_wait < options.poll_interval);
    }
}
