//! GCP provider
//!
//! Runs one controller per managed GCP resource kind.
//!
//! ## Usage
//!
//! ```bash
//! # Run the provider (requires kubeconfig)
//! provider-gcp
//!
//! # Poll every five minutes with verbose logs
//! provider-gcp --poll-interval 300 --debug
//! ```

use clap::Parser;
use futures::future::select_all;
use kube::Client;
use provider_gcp::leader_election::{self, LeaderElector, LeaseConfig};
use provider_gcp::{spawn_all, ReconcilerOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "provider-gcp")]
#[command(version, about = "Kubernetes provider for Google Cloud Platform resources")]
struct Args {
    /// Enable leader election for HA deployments
    #[arg(long, env = "LEADER_ELECTION", default_value = "false")]
    leader_election: bool,

    /// Namespace for the leader election Lease (auto-detected if empty)
    #[arg(long, env = "LEADER_ELECTION_NAMESPACE", default_value = "")]
    leader_election_namespace: String,

    /// Seconds between observations of an up-to-date resource
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 60)]
    poll_interval: u64,

    /// Concurrent reconciles per resource kind
    #[arg(long, env = "MAX_RECONCILE_RATE", default_value_t = 10)]
    max_reconcile_rate: u16,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        leader_election = args.leader_election,
        poll_interval = args.poll_interval,
        max_reconcile_rate = args.max_reconcile_rate,
        "Starting GCP provider"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let http = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(60))
        .build()?;

    // Acquire the lease before starting any controller
    let elector = if args.leader_election {
        let ns = leader_election::detect_namespace(&args.leader_election_namespace);
        info!("Leader election namespace: {}", ns);
        let elector = LeaderElector::new(client.clone(), &ns, LeaseConfig::default());
        elector.acquire().await?;
        Some(Arc::new(elector))
    } else {
        None
    };

    let options = ReconcilerOptions {
        poll_interval: Duration::from_secs(args.poll_interval),
        max_concurrent: args.max_reconcile_rate,
        ..Default::default()
    };
    let handles = spawn_all(client, http, options);
    let kinds: Vec<String> = handles.iter().map(|h| h.kind.clone()).collect();
    info!(controllers = kinds.len(), "Started controllers");
    let controllers = select_all(handles.into_iter().map(|h| h.handle));

    // Never completes when leader election is disabled
    let elector_for_renew = elector.clone();
    let renew_handle = tokio::spawn(async move {
        match elector_for_renew {
            Some(e) => loop {
                tokio::time::sleep(e.renew_interval()).await;
                match e.renew().await {
                    Ok(true) => {}
                    Ok(false) => {
                        error!("Lost leader lease");
                        break;
                    }
                    Err(err) => {
                        error!("Failed to renew leader lease: {}", err);
                        break;
                    }
                }
            },
            None => std::future::pending::<()>().await,
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        (result, index, _) = controllers => {
            let kind = kinds.get(index).map(String::as_str).unwrap_or("unknown");
            match result {
                Ok(()) => error!(kind = %kind, "Controller stopped"),
                Err(e) => error!(kind = %kind, "Controller task failed: {}", e),
            }
        }
        _ = renew_handle => {
            error!("Leader lease lost, initiating shutdown");
        }
    }

    if let Some(e) = &elector {
        e.release().await;
    }

    info!("GCP provider shutting down");
    Ok(())
}
