//! Admission webhooks for ApplicationCatalog
//!
//! - **Mutation**: injects or synchronizes the built-in default charts
//! - **Validation**: rejects catalogs that would fight over an ApplicationDefinition
//!
//! Both handlers compute from the decoded request only; the validator performs an
//! unlocked read of the current definitions.

pub mod mutation;
pub mod validation;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use appcat_core::ApplicationCatalog;
use axum::{
    Router,
    routing::{get, post},
};
use axum_server::tls_rustls::RustlsConfig;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse};
use tracing::info;

use crate::conflicts::ConflictDetector;
use crate::error::{Result, SyncError};

/// Path of the mutating webhook
pub const MUTATE_PATH: &str = "/mutate-applicationcatalog-k8c-io-v1alpha1-applicationcatalog";

/// Path of the validating webhook
pub const VALIDATE_PATH: &str = "/validate-applicationcatalog-k8c-io-v1alpha1-applicationcatalog";

/// Default deadline for a validation request
pub const DEFAULT_ADMISSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    pub detector: ConflictDetector,
    pub admission_timeout: Duration,
}

impl WebhookState {
    pub fn new(detector: ConflictDetector) -> Self {
        Self {
            detector,
            admission_timeout: DEFAULT_ADMISSION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.admission_timeout = timeout;
        self
    }
}

/// Create the webhook router with both admission endpoints and health probes
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_PATH, post(mutation::mutate_handler))
        .route(VALIDATE_PATH, post(validation::validate_handler))
        .route("/healthz", get(health))
        .route("/readyz", get(health))
        .with_state(state)
}

/// Serve `router` over TLS using `tls.crt` and `tls.key` from `cert_dir`.
///
/// Returns once a shutdown signal has been received and connections drained.
pub async fn serve_tls(router: Router, addr: SocketAddr, cert_dir: &Path) -> Result<()> {
    let tls_config = RustlsConfig::from_pem_file(cert_dir.join("tls.crt"), cert_dir.join("tls.key"))
        .await
        .map_err(|e| SyncError::InvalidConfig(format!("TLS config error in {}: {}", cert_dir.display(), e)))?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, draining webhook connections");
            shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
        }
    });

    info!(addr = %addr, "starting webhook server");
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// Decode the request object as an ApplicationCatalog
pub(crate) fn decode_catalog(
    object: &DynamicObject,
) -> std::result::Result<ApplicationCatalog, serde_json::Error> {
    serde_json::to_value(object).and_then(serde_json::from_value)
}

/// Reject a request with an HTTP-like status code
pub(crate) fn errored(
    request: &AdmissionRequest<DynamicObject>,
    code: u16,
    message: impl ToString,
) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request).deny(message);
    response.result.code = code;
    response
}

#[cfg(test)]
pub(crate) mod test_support {
    use kube::api::DynamicObject;
    use kube::core::admission::{AdmissionRequest, AdmissionReview};
    use serde_json::{Value, json};

    /// Admission review for an ApplicationCatalog
    pub fn review(operation: &str, object: Option<Value>) -> Value {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "applicationcatalog.k8c.io", "version": "v1alpha1", "kind": "ApplicationCatalog"},
                "resource": {"group": "applicationcatalog.k8c.io", "version": "v1alpha1", "resource": "applicationcatalogs"},
                "name": "c1",
                "operation": operation,
                "userInfo": {"username": "admin"},
                "object": object,
                "oldObject": null,
                "dryRun": false
            }
        })
    }

    pub fn request(operation: &str, object: Option<Value>) -> AdmissionRequest<DynamicObject> {
        let review: AdmissionReview<DynamicObject> =
            serde_json::from_value(review(operation, object)).unwrap();
        review.try_into().unwrap()
    }

    pub fn catalog_json(spec: Value) -> Value {
        json!({
            "apiVersion": "applicationcatalog.k8c.io/v1alpha1",
            "kind": "ApplicationCatalog",
            "metadata": {"name": "c1"},
            "spec": spec
        })
    }
}
