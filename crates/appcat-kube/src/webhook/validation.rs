//! Validating webhook

use std::sync::Arc;

use axum::{Json, extract::State};
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use tracing::{error, info, warn};

use super::{WebhookState, decode_catalog, errored};
use crate::conflicts::Verdict;

/// Handle a validating admission review for ApplicationCatalogs
pub async fn validate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    Json(validate(&state, &request).await.into_review())
}

/// Admit or deny the catalog carried by `request`.
///
/// Only creates and updates are checked; deletes never conflict.
pub async fn validate(state: &WebhookState, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    if !matches!(request.operation, Operation::Create | Operation::Update) {
        return AdmissionResponse::from(request);
    }

    let Some(object) = &request.object else {
        return errored(request, 400, "admission request carries no object");
    };

    let catalog = match decode_catalog(object) {
        Ok(catalog) => catalog,
        Err(e) => return errored(request, 400, format!("failed to decode ApplicationCatalog: {}", e)),
    };

    let verdict = match tokio::time::timeout(state.admission_timeout, state.detector.validate(&catalog)).await {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => {
            error!(uid = %request.uid, catalog = %request.name, error = %e, "conflict check failed");
            return errored(request, 500, format!("failed to check for conflicts: {}", e));
        }
        Err(_) => {
            warn!(uid = %request.uid, catalog = %request.name, "conflict check timed out");
            return errored(
                request,
                500,
                format!("conflict check timed out after {:?}", state.admission_timeout),
            );
        }
    };

    match verdict {
        Verdict::Allowed => AdmissionResponse::from(request),
        Verdict::Denied(message) => {
            info!(uid = %request.uid, catalog = %request.name, "denied ApplicationCatalog");
            AdmissionResponse::from(request).deny(message)
        }
    }
}
