//! Manager command - run the catalog controller

use appcat_kube::controller::{self, ControllerConfig, serve_health};
use appcat_kube::leader::{LeaderElector, default_identity};
use kube::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{CliError, Result};

/// Flags of the manager command
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub reconciliation_interval: Duration,
    pub reconcile_timeout: Duration,
    pub leader_elect: bool,
    pub leader_election_namespace: String,
    pub leader_election_id: String,
    pub health_probe_address: SocketAddr,
}

pub async fn run(options: ManagerOptions) -> Result<()> {
    let config = ControllerConfig {
        reconciliation_interval: options.reconciliation_interval,
        reconcile_timeout: options.reconcile_timeout,
    };
    config.validate()?;

    let client = Client::try_default().await?;
    let health = tokio::spawn(serve_health(options.health_probe_address));

    let result = if options.leader_elect {
        run_as_leader(client, config, &options).await
    } else {
        controller::run(client, config).await.map_err(CliError::from)
    };

    health.abort();
    result
}

/// Run the controller while holding the lease; losing it stops the process
async fn run_as_leader(client: Client, config: ControllerConfig, options: &ManagerOptions) -> Result<()> {
    let elector = Arc::new(LeaderElector::new(
        client.clone(),
        &options.leader_election_namespace,
        &options.leader_election_id,
        &default_identity(),
    ));
    let mut guard = elector.acquire().await;

    let finished = tokio::select! {
        result = controller::run(client, config) => Some(result),
        _ = guard.lost() => None,
    };

    match finished {
        Some(result) => {
            if let Err(e) = guard.release().await {
                warn!(error = %e, "failed to release leader lease");
            }
            result?;
            info!("manager stopped");
            Ok(())
        }
        None => Err(CliError::Kube {
            message: "leader lease lost, stopping".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_config_fails_before_connecting() {
        let options = ManagerOptions {
            reconciliation_interval: Duration::from_secs(600),
            reconcile_timeout: Duration::ZERO,
            leader_elect: false,
            leader_election_namespace: "kubermatic".to_string(),
            leader_election_id: "appcat".to_string(),
            health_probe_address: "127.0.0.1:0".parse().unwrap(),
        };

        let err = run(options).await.unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }
}
