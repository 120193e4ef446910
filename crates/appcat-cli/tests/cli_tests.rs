//! Integration tests for the offline commands

use std::io::Write;
use std::process::Command;

/// Helper to run the appcat binary
fn appcat(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_appcat"))
        .args(args)
        .output()
        .expect("Failed to execute appcat")
}

fn manifest(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const INCLUDE_CATALOG: &str = r#"
apiVersion: applicationcatalog.k8c.io/v1alpha1
kind: ApplicationCatalog
metadata:
  name: c1
  annotations:
    defaultcatalog.k8c.io/include: "argo-cd, cert-manager"
spec:
  helm:
    includeDefaults: true
    charts:
      - chartName: nginx
        chartVersions:
          - chartVersion: "1.0.0"
            appVersion: v1.0.0
"#;

mod defaults_command {
    use super::*;

    #[test]
    fn test_names() {
        let output = appcat(&["defaults", "--names"]);
        assert!(output.status.success());

        insta::assert_snapshot!(stdout(&output), @r"
        aikit
        argo-cd
        cert-manager
        cluster-autoscaler
        external-dns
        falco
        flux2
        ingress-nginx
        k8sgpt-operator
        kube-vip
        kueue
        local-ai
        metallb
        node-feature-discovery
        nvidia-gpu-operator
        sealed-secrets
        trivy
        trivy-operator
        ");
    }

    #[test]
    fn test_json_output() {
        let output = appcat(&["defaults", "--output", "json"]);
        assert!(output.status.success());

        let charts: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(charts.as_array().unwrap().len(), 18);
    }
}

mod default_command {
    use super::*;

    #[test]
    fn test_include_filter_applied() {
        let file = manifest(INCLUDE_CATALOG);
        let output = appcat(&["default", file.path().to_str().unwrap()]);
        assert!(output.status.success());

        let catalog: serde_yaml::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
        let charts = catalog["spec"]["helm"]["charts"].as_sequence().unwrap();
        let names: Vec<&str> = charts.iter().map(|c| c["chartName"].as_str().unwrap()).collect();
        assert_eq!(names, ["argo-cd", "cert-manager", "nginx"]);
    }

    #[test]
    fn test_rejects_other_kinds() {
        let file = manifest("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: x\n");
        let output = appcat(&["default", file.path().to_str().unwrap()]);

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("ConfigMap"));
    }
}

mod convert_command {
    use super::*;

    #[test]
    fn test_converts_to_definitions() {
        let file = manifest(INCLUDE_CATALOG);
        let output = appcat(&["convert", file.path().to_str().unwrap(), "--no-defaults", "-o", "json"]);
        assert!(output.status.success());

        let definitions: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        let nginx = &definitions[0];
        assert_eq!(nginx["kind"], "ApplicationDefinition");
        assert_eq!(nginx["metadata"]["name"], "nginx");
        assert_eq!(nginx["metadata"]["labels"]["applicationcatalog.k8c.io/catalog-name"], "c1");
        assert_eq!(
            nginx["spec"]["versions"][0]["template"]["source"]["helm"]["url"],
            "oci://quay.io/kubermatic-mirror/helm-charts"
        );
    }

    #[test]
    fn test_defaults_applied_by_default() {
        let file = manifest(INCLUDE_CATALOG);
        let output = appcat(&["convert", file.path().to_str().unwrap()]);
        assert!(output.status.success());

        assert_eq!(stdout(&output).matches("kind: ApplicationDefinition").count(), 3);
    }

    #[test]
    fn test_missing_file() {
        let output = appcat(&["convert", "/nonexistent/catalog.yaml"]);
        assert!(!output.status.success());
    }
}

mod crd_command {
    use super::*;

    #[test]
    fn test_prints_catalog_crd() {
        let output = appcat(&["crd"]);
        assert!(output.status.success());

        let crd: serde_yaml::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
        assert_eq!(crd["metadata"]["name"], "applicationcatalogs.applicationcatalog.k8c.io");
        assert_eq!(crd["spec"]["scope"], "Cluster");
    }
}
