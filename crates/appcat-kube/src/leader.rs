//! Leader election using Kubernetes Leases
//!
//! Only the replica holding the `coordination.k8s.io/v1` Lease runs the
//! catalog controller. Writes use resourceVersion for compare-and-swap: if
//! the lease changes between read and write the update fails with 409 and
//! the attempt counts as lost.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::Client;
use kube::api::{Api, Patch, PatchParams, PostParams};
use rand::Rng;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};

/// Default lease name for the catalog manager
pub const DEFAULT_LEASE_NAME: &str = "application-catalog-manager-leader";

/// Default namespace holding the lease
pub const DEFAULT_LEASE_NAMESPACE: &str = "kubermatic";

const LEASE_DURATION: Duration = Duration::from_secs(30);
const RENEW_INTERVAL: Duration = Duration::from_secs(10);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// What to do with a lease observed at a given instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseAction {
    /// We hold it, refresh renewTime
    Renew,
    /// Holder is gone or expired, take it over
    TakeOver { transitions: i32 },
    /// Someone else holds a live lease
    Wait,
}

/// Decide how `identity` should treat `lease` at `now`
pub fn lease_action(lease: &Lease, identity: &str, now: DateTime<Utc>) -> LeaseAction {
    let spec = lease.spec.as_ref();
    let holder = spec.and_then(|s| s.holder_identity.as_deref());
    if holder == Some(identity) {
        return LeaseAction::Renew;
    }

    let transitions = spec.and_then(|s| s.lease_transitions).unwrap_or(0);
    if holder.is_none_or(str::is_empty) {
        return LeaseAction::TakeOver { transitions };
    }

    let renew_time = spec.and_then(|s| s.renew_time.as_ref());
    let duration = spec.and_then(|s| s.lease_duration_seconds);
    let expired = match (renew_time, duration) {
        (Some(renewed), Some(secs)) => now > renewed.0 + chrono::Duration::seconds(i64::from(secs)),
        _ => true,
    };

    if expired {
        LeaseAction::TakeOver { transitions }
    } else {
        LeaseAction::Wait
    }
}

/// Identity for this replica: `$HOSTNAME` plus a random suffix
pub fn default_identity() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "appcat".to_string());
    let suffix: u32 = rand::rng().random();
    format!("{}_{:08x}", host, suffix)
}

/// Lease based leader elector
pub struct LeaderElector {
    api: Api<Lease>,
    lease_name: String,
    identity: String,
    lease_duration: Duration,
    renew_interval: Duration,
    retry_interval: Duration,
}

impl LeaderElector {
    pub fn new(client: Client, namespace: &str, lease_name: &str, identity: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            lease_name: lease_name.to_string(),
            identity: identity.to_string(),
            lease_duration: LEASE_DURATION,
            renew_interval: RENEW_INTERVAL,
            retry_interval: RETRY_INTERVAL,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Block until leadership is acquired.
    ///
    /// The returned guard renews the lease in the background and signals
    /// through [`LeaderGuard::lost`] when renewal fails.
    pub async fn acquire(self: Arc<Self>) -> LeaderGuard {
        info!(identity = %self.identity, lease = %self.lease_name, "waiting for leadership");

        loop {
            match self.try_acquire_or_renew().await {
                Ok(true) => {
                    info!(identity = %self.identity, "leadership acquired");
                    return self.guard();
                }
                Ok(false) => debug!(identity = %self.identity, "lease held by another replica"),
                Err(e) => warn!(identity = %self.identity, error = %e, "failed to acquire lease"),
            }
            tokio::time::sleep(self.retry_interval).await;
        }
    }

    fn guard(self: &Arc<Self>) -> LeaderGuard {
        let (lost_tx, lost_rx) = oneshot::channel();
        let elector = Arc::clone(self);
        let renewal_task = tokio::spawn(async move { elector.renewal_loop(lost_tx).await });

        LeaderGuard {
            elector: Arc::clone(self),
            renewal_task,
            lost_rx: Some(lost_rx),
        }
    }

    async fn try_acquire_or_renew(&self) -> Result<bool> {
        let now = Utc::now();
        let Some(lease) = self.api.get_opt(&self.lease_name).await? else {
            return self.write(None, now, 0).await;
        };

        match lease_action(&lease, &self.identity, now) {
            LeaseAction::Wait => Ok(false),
            LeaseAction::Renew => {
                let mut renewed = lease;
                if let Some(spec) = renewed.spec.as_mut() {
                    spec.renew_time = Some(MicroTime(now));
                }
                self.replace(&renewed).await
            }
            LeaseAction::TakeOver { transitions } => {
                let resource_version = lease.metadata.resource_version.clone().ok_or_else(|| {
                    SyncError::LeaderElection("lease has no resourceVersion".to_string())
                })?;
                self.write(Some(resource_version), now, transitions + 1).await
            }
        }
    }

    /// Create the lease, or take it over when `resource_version` is set
    async fn write(&self, resource_version: Option<String>, now: DateTime<Utc>, transitions: i32) -> Result<bool> {
        let lease = Lease {
            metadata: ObjectMeta {
                name: Some(self.lease_name.clone()),
                resource_version: resource_version.clone(),
                ..Default::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: Some(self.identity.clone()),
                lease_duration_seconds: Some(self.lease_duration.as_secs() as i32),
                acquire_time: Some(MicroTime(now)),
                renew_time: Some(MicroTime(now)),
                lease_transitions: Some(transitions),
                ..Default::default()
            }),
        };

        if resource_version.is_some() {
            return self.replace(&lease).await;
        }

        match self.api.create(&PostParams::default(), &lease).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, lease: &Lease) -> Result<bool> {
        match self.api.replace(&self.lease_name, &PostParams::default(), lease).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn renewal_loop(&self, lost_tx: oneshot::Sender<()>) {
        loop {
            tokio::time::sleep(self.renew_interval).await;

            match self.try_acquire_or_renew().await {
                Ok(true) => debug!(identity = %self.identity, "lease renewed"),
                Ok(false) | Err(_) => {
                    warn!(identity = %self.identity, "leadership lost");
                    let _ = lost_tx.send(());
                    return;
                }
            }
        }
    }

    /// Clear the holder so a standby can take over without waiting for expiry
    async fn release(&self) -> Result<()> {
        let Some(lease) = self.api.get_opt(&self.lease_name).await? else {
            return Ok(());
        };
        let holder = lease.spec.as_ref().and_then(|s| s.holder_identity.as_deref());
        if holder != Some(self.identity.as_str()) {
            return Ok(());
        }

        let patch = json!({
            "metadata": {"resourceVersion": lease.metadata.resource_version},
            "spec": {"holderIdentity": null}
        });
        self.api
            .patch(&self.lease_name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        info!(identity = %self.identity, "lease released");
        Ok(())
    }
}

/// Held while this replica is the leader
pub struct LeaderGuard {
    elector: Arc<LeaderElector>,
    renewal_task: JoinHandle<()>,
    lost_rx: Option<oneshot::Receiver<()>>,
}

impl LeaderGuard {
    /// Wait until leadership is lost
    pub async fn lost(&mut self) {
        if let Some(rx) = self.lost_rx.take() {
            let _ = rx.await;
        }
    }

    /// Give up leadership on shutdown
    pub async fn release(self) -> Result<()> {
        self.renewal_task.abort();
        self.elector.release().await
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        self.renewal_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lease(holder: Option<&str>, renewed_secs_ago: i64, duration: i32) -> Lease {
        Lease {
            metadata: ObjectMeta::default(),
            spec: Some(LeaseSpec {
                holder_identity: holder.map(str::to_string),
                lease_duration_seconds: Some(duration),
                renew_time: Some(MicroTime(Utc::now() - chrono::Duration::seconds(renewed_secs_ago))),
                lease_transitions: Some(2),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_own_lease_is_renewed() {
        assert_eq!(lease_action(&lease(Some("me"), 100, 30), "me", Utc::now()), LeaseAction::Renew);
    }

    #[test]
    fn test_live_foreign_lease_waits() {
        assert_eq!(lease_action(&lease(Some("other"), 5, 30), "me", Utc::now()), LeaseAction::Wait);
    }

    #[test]
    fn test_expired_lease_is_taken_over() {
        assert_eq!(
            lease_action(&lease(Some("other"), 60, 30), "me", Utc::now()),
            LeaseAction::TakeOver { transitions: 2 }
        );
    }

    #[test]
    fn test_released_lease_is_taken_over() {
        assert_eq!(
            lease_action(&lease(None, 1, 30), "me", Utc::now()),
            LeaseAction::TakeOver { transitions: 2 }
        );
        let empty = Lease::default();
        assert_eq!(lease_action(&empty, "me", Utc::now()), LeaseAction::TakeOver { transitions: 0 });
    }

    #[test]
    fn test_identities_are_unique() {
        assert_ne!(default_identity(), default_identity());
    }
}
