//! Defaulting webhook
//!
//! Applies the defaulting rules to the incoming catalog and answers with a JSON
//! patch limited to `spec.helm.charts`.

use axum::Json;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use serde_json::Value;
use tracing::{debug, error, info};

use appcat_core::{DefaultingOutcome, default_application_catalog};

use super::{decode_catalog, errored};

/// Handle a mutating admission review for ApplicationCatalogs
pub async fn mutate_handler(
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    Json(mutate(&request).into_review())
}

/// Default the catalog carried by `request`
pub fn mutate(request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    if !matches!(request.operation, Operation::Create | Operation::Update) {
        return AdmissionResponse::from(request);
    }

    let Some(object) = &request.object else {
        return errored(request, 400, "admission request carries no object");
    };

    let mut catalog = match decode_catalog(object) {
        Ok(catalog) => catalog,
        Err(e) => {
            debug!(uid = %request.uid, error = %e, "failed to decode ApplicationCatalog");
            return errored(request, 400, format!("failed to decode ApplicationCatalog: {}", e));
        }
    };

    let outcome = default_application_catalog(&mut catalog);
    if outcome == DefaultingOutcome::Unchanged {
        return AdmissionResponse::from(request);
    }

    let original = match serde_json::to_value(object) {
        Ok(value) => value,
        Err(e) => return errored(request, 500, e),
    };
    let charts = catalog.spec.helm.as_ref().and_then(|helm| helm.charts.as_ref());
    let mutated = match serde_json::to_value(charts) {
        Ok(charts) => with_charts(&original, charts),
        Err(e) => return errored(request, 500, e),
    };

    let patch = json_patch::diff(&original, &mutated);
    info!(
        uid = %request.uid,
        catalog = %request.name,
        outcome = ?outcome,
        operations = patch.0.len(),
        "defaulted ApplicationCatalog"
    );

    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            error!(uid = %request.uid, error = %e, "failed to serialize patch");
            errored(request, 500, format!("patch serialization error: {}", e))
        }
    }
}

/// Copy of `object` with `spec.helm.charts` replaced, creating parents as needed
fn with_charts(object: &Value, charts: Value) -> Value {
    let mut mutated = object.clone();
    let helm = ensure_object(ensure_object(&mut mutated, "spec"), "helm");
    helm["charts"] = charts;
    mutated
}

fn ensure_object<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    if !value.get(key).is_some_and(Value::is_object) {
        value[key] = Value::Object(Default::default());
    }
    &mut value[key]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::test_support::{catalog_json, request};
    use appcat_core::default_charts;
    use serde_json::json;

    fn apply(response: &AdmissionResponse, object: &Value) -> Value {
        let patch: json_patch::Patch = serde_json::from_slice(response.patch.as_ref().unwrap()).unwrap();
        let mut patched = object.clone();
        json_patch::patch(&mut patched, &patch).unwrap();
        patched
    }

    #[test]
    fn test_absent_charts_get_defaults() {
        let object = catalog_json(json!({"helm": {}}));
        let response = mutate(&request("CREATE", Some(object.clone())));

        assert!(response.allowed);
        let patched = apply(&response, &object);
        assert_eq!(
            patched["spec"]["helm"]["charts"].as_array().unwrap().len(),
            default_charts().len()
        );
    }

    #[test]
    fn test_missing_helm_block_is_created() {
        let object = catalog_json(json!({}));
        let response = mutate(&request("CREATE", Some(object.clone())));

        let patched = apply(&response, &object);
        assert!(patched["spec"]["helm"]["charts"].is_array());
    }

    #[test]
    fn test_patch_only_touches_charts() {
        let object = catalog_json(json!({
            "helm": {
                "includeDefaults": true,
                "repositorySettings": {"baseURL": "oci://example.com"},
                "charts": [{"chartName": "custom", "chartVersions": [{"chartVersion": "1.0.0", "appVersion": "v1"}]}]
            }
        }));
        let response = mutate(&request("UPDATE", Some(object.clone())));
        let patched = apply(&response, &object);

        assert_eq!(patched["metadata"], object["metadata"]);
        assert_eq!(patched["spec"]["helm"]["repositorySettings"], object["spec"]["helm"]["repositorySettings"]);
        assert_eq!(
            patched["spec"]["helm"]["charts"].as_array().unwrap().len(),
            default_charts().len() + 1
        );
    }

    #[test]
    fn test_populated_without_include_has_no_patch() {
        let object = catalog_json(json!({
            "helm": {"charts": [{"chartName": "custom", "chartVersions": []}]}
        }));
        let response = mutate(&request("UPDATE", Some(object)));

        assert!(response.allowed);
        assert!(response.patch.is_none());
    }

    #[test]
    fn test_delete_passes_through() {
        let response = mutate(&request("DELETE", None));
        assert!(response.allowed);
        assert!(response.patch.is_none());
    }

    #[test]
    fn test_malformed_object_is_rejected() {
        let object = catalog_json(json!({"helm": {"charts": "not-a-list"}}));
        let response = mutate(&request("CREATE", Some(object)));

        assert!(!response.allowed);
        assert_eq!(response.result.code, 400);
    }
}
