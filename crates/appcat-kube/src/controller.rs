//! Controller runner
//!
//! Drives the [`Reconciler`] from watch events:
//! - catalog changes and catalog-managed definition changes (mapped back to
//!   the owning catalog) go through a `kube::runtime::Controller`
//! - catalog deletions go through a separate watcher, since the controller
//!   never reconciles objects that no longer exist. A failed release is
//!   retried with the error backoff until it succeeds.
//! - a periodic sweep releases definitions whose catalog vanished while no
//!   watch saw it go

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use appcat_core::ownership::{self, MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use appcat_core::{ApplicationCatalog, ApplicationDefinition};
use axum::{Router, routing::get};
use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{self, Config as WatcherConfig};
use kube::runtime::{Controller, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SyncError};
use crate::reconciler::{DEFAULT_RECONCILE_TIMEOUT, DEFAULTS_PENDING_REQUEUE, ReconcileOutcome, Reconciler};
use crate::store::{KubeCatalogStore, KubeDefinitionStore};

/// Default period between full reconciliations of a healthy catalog
pub const DEFAULT_RECONCILIATION_INTERVAL: Duration = Duration::from_secs(600);

/// Watch timeout, below the client read timeout so idle watches are closed by the server
const WATCH_TIMEOUT_SECS: u32 = 25;

const BACKOFF_BASE: Duration = Duration::from_secs(5);
const BACKOFF_MAX: Duration = Duration::from_secs(300);

/// Controller settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Requeue delay after a successful pass; zero waits for the next change
    pub reconciliation_interval: Duration,
    /// Deadline of a single reconcile pass
    pub reconcile_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconciliation_interval: DEFAULT_RECONCILIATION_INTERVAL,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reconcile_timeout.is_zero() {
            return Err(SyncError::InvalidConfig("reconcile timeout must be positive".to_string()));
        }
        if !self.reconciliation_interval.is_zero() && self.reconciliation_interval < Duration::from_secs(1) {
            return Err(SyncError::InvalidConfig(format!(
                "reconciliation interval {:?} is below one second",
                self.reconciliation_interval
            )));
        }
        Ok(())
    }

    /// Period of the orphan sweep; follows the resync interval when it is enabled
    pub fn sweep_period(&self) -> Duration {
        if self.reconciliation_interval.is_zero() {
            DEFAULT_RECONCILIATION_INTERVAL
        } else {
            self.reconciliation_interval
        }
    }
}

/// Shared state handed to every reconcile call
pub struct Context {
    reconciler: Arc<Reconciler>,
    config: ControllerConfig,
    /// Consecutive failures per catalog name
    failures: Mutex<HashMap<String, u32>>,
}

impl Context {
    pub fn new(reconciler: Arc<Reconciler>, config: ControllerConfig) -> Self {
        Self {
            reconciler,
            config,
            failures: Mutex::new(HashMap::new()),
        }
    }

    fn record_failure(&self, name: &str) -> u32 {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(name.to_string()).or_default();
        *count = count.saturating_add(1);
        *count
    }

    fn reset_failures(&self, name: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

/// Requeue delay after a successful pass, `None` to wait for the next event
pub fn requeue_after(outcome: &ReconcileOutcome, interval: Duration) -> Option<Duration> {
    match outcome {
        ReconcileOutcome::AwaitingDefaults => Some(DEFAULTS_PENDING_REQUEUE),
        ReconcileOutcome::Orphaned { .. } => None,
        ReconcileOutcome::Synced(_) if interval.is_zero() => None,
        ReconcileOutcome::Synced(_) => Some(interval),
    }
}

/// Delay before retrying after the `failures`-th consecutive failure
pub fn backoff_delay(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    BACKOFF_BASE.saturating_mul(1 << exponent).min(BACKOFF_MAX)
}

async fn reconcile(catalog: Arc<ApplicationCatalog>, ctx: Arc<Context>) -> Result<Action> {
    let name = catalog.name_any();
    let outcome = ctx.reconciler.reconcile(&name).await?;
    ctx.reset_failures(&name);

    debug!(catalog = %name, outcome = ?outcome, "reconcile finished");
    Ok(match requeue_after(&outcome, ctx.config.reconciliation_interval) {
        Some(delay) => Action::requeue(delay),
        None => Action::await_change(),
    })
}

fn error_policy(catalog: Arc<ApplicationCatalog>, error: &SyncError, ctx: Arc<Context>) -> Action {
    let name = catalog.name_any();
    let failures = ctx.record_failure(&name);
    let delay = backoff_delay(failures);
    warn!(catalog = %name, failures, retry_in = ?delay, error = %error, "reconcile failed");
    Action::requeue(delay)
}

/// Owning catalog of a definition, if it carries one
fn owner_ref(definition: ApplicationDefinition) -> Option<ObjectRef<ApplicationCatalog>> {
    ownership::ownership(&definition.metadata)
        .owner()
        .map(ObjectRef::new)
}

/// Run the controller until a shutdown signal is received
pub async fn run(client: Client, config: ControllerConfig) -> Result<()> {
    config.validate()?;

    let reconciler = Arc::new(
        Reconciler::new(
            Arc::new(KubeCatalogStore::new(client.clone())),
            Arc::new(KubeDefinitionStore::new(client.clone())),
        )
        .with_timeout(config.reconcile_timeout),
    );

    let catalogs: Api<ApplicationCatalog> = Api::all(client.clone());
    let definitions: Api<ApplicationDefinition> = Api::all(client);
    let managed = WatcherConfig::default()
        .labels(&format!("{}={}", MANAGED_BY_LABEL, MANAGED_BY_VALUE))
        .timeout(WATCH_TIMEOUT_SECS);

    let sweeps = tokio::spawn(sweep_periodically(Arc::clone(&reconciler), config.sweep_period()));
    let deletions = tokio::spawn(watch_deletions(catalogs.clone(), Arc::clone(&reconciler)));

    info!(
        interval = ?config.reconciliation_interval,
        timeout = ?config.reconcile_timeout,
        "starting ApplicationCatalog controller"
    );

    let ctx = Arc::new(Context::new(reconciler, config));
    Controller::new(catalogs, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .watches(definitions, managed, owner_ref)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => debug!(catalog = %object.name, ?action, "reconciled"),
                Err(e) => error!(error = %e, "controller error"),
            }
        })
        .await;

    deletions.abort();
    sweeps.abort();
    info!("controller stopped");
    Ok(())
}

/// Release the definitions of every deleted catalog
async fn watch_deletions(catalogs: Api<ApplicationCatalog>, reconciler: Arc<Reconciler>) {
    let mut events = catalog_events(catalogs).default_backoff().boxed();

    while let Some(event) = events.next().await {
        match event {
            Ok(watcher::Event::Delete(catalog)) => {
                tokio::spawn(release_deleted(Arc::clone(&reconciler), catalog.name_any(), backoff_delay));
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "deletion watch error"),
        }
    }
}

/// Reconcile the deleted catalog `name` until a pass succeeds.
///
/// `delay` maps the number of consecutive failures to the wait before the next attempt.
pub async fn release_deleted(reconciler: Arc<Reconciler>, name: String, delay: fn(u32) -> Duration) -> ReconcileOutcome {
    let mut failures = 0u32;
    loop {
        match reconciler.reconcile(&name).await {
            Ok(outcome) => {
                debug!(catalog = %name, outcome = ?outcome, failures, "handled deletion");
                return outcome;
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let retry_in = delay(failures);
                warn!(catalog = %name, failures, retry_in = ?retry_in, error = %e, "failed to release definitions of deleted catalog");
                tokio::time::sleep(retry_in).await;
            }
        }
    }
}

/// Release definitions of vanished catalogs now and then every `period`
async fn sweep_periodically(reconciler: Arc<Reconciler>, period: Duration) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;
        match reconciler.sweep_orphaned_owners().await {
            Ok(0) => {}
            Ok(released) => info!(released, "released definitions of deleted catalogs"),
            Err(e) => warn!(error = %e, retry_in = ?period, "orphan sweep failed"),
        }
    }
}

fn catalog_events(
    catalogs: Api<ApplicationCatalog>,
) -> impl futures::Stream<Item = watcher::Result<watcher::Event<ApplicationCatalog>>> {
    watcher::watcher(catalogs, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
}

/// Serve `/healthz` and `/readyz` on `addr` until shutdown
pub async fn serve_health(addr: SocketAddr) -> Result<()> {
    let router = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "serving health probes");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
