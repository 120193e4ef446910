//! Webhook command - serve the admission webhooks over TLS

use appcat_kube::webhook::{WebhookState, serve_tls, webhook_router};
use appcat_kube::{ConflictDetector, KubeDefinitionStore};
use kube::Client;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::{CliError, Result};

pub async fn run(listen_address: SocketAddr, cert_dir: &Path, admission_timeout: Duration) -> Result<()> {
    if admission_timeout.is_zero() {
        return Err(CliError::config("admission timeout must be positive"));
    }

    let client = Client::try_default().await?;
    let detector = ConflictDetector::new(Arc::new(KubeDefinitionStore::new(client)));
    let state = Arc::new(WebhookState::new(detector).with_timeout(admission_timeout));

    info!(cert_dir = %cert_dir.display(), timeout = ?admission_timeout, "webhook configured");
    serve_tls(webhook_router(state), listen_address, cert_dir).await?;
    Ok(())
}
