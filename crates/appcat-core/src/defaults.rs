//! Built-in default catalog
//!
//! The table is compiled into the binary, built once on first access and never
//! mutated afterwards. Entries are sorted by identity (app name).

use std::sync::LazyLock;

use crate::catalog::{ChartConfig, ChartMetadata, ChartVersion};

/// Version of the built-in default table
pub const DEFAULT_CATALOG_VERSION: &str = "2025.10.0";

static DEFAULT_CHARTS: LazyLock<Vec<ChartConfig>> = LazyLock::new(build_default_charts);

/// Built-in default chart entries, sorted by identity
pub fn default_charts() -> &'static [ChartConfig] {
    &DEFAULT_CHARTS
}

/// Identity names of the built-in entries, sorted
pub fn default_chart_names() -> Vec<&'static str> {
    DEFAULT_CHARTS.iter().map(ChartConfig::app_name).collect()
}

/// Look up a built-in entry by identity
pub fn find_default_chart(name: &str) -> Option<&'static ChartConfig> {
    DEFAULT_CHARTS.iter().find(|chart| chart.app_name() == name)
}

struct Entry {
    chart: &'static str,
    app_name: &'static str,
    display_name: &'static str,
    description: &'static str,
    documentation_url: &'static str,
    source_url: &'static str,
    values: Option<&'static str>,
    // (chart version, app version)
    versions: &'static [(&'static str, &'static str)],
}

impl Entry {
    fn into_chart(self) -> ChartConfig {
        ChartConfig {
            chart_name: self.chart.to_string(),
            metadata: Some(ChartMetadata {
                app_name: self.app_name.to_string(),
                display_name: self.display_name.to_string(),
                description: self.description.to_string(),
                documentation_url: self.documentation_url.to_string(),
                source_url: self.source_url.to_string(),
                ..Default::default()
            }),
            repository_settings: None,
            default_values_block: self.values.map(str::to_string),
            chart_versions: self
                .versions
                .iter()
                .map(|(chart, app)| ChartVersion::new(*chart, *app))
                .collect(),
        }
    }
}

fn build_default_charts() -> Vec<ChartConfig> {
    let mut charts: Vec<ChartConfig> = ENTRIES.into_iter().map(Entry::into_chart).collect();
    charts.sort_by(|a, b| a.app_name().cmp(b.app_name()));
    charts
}

const ENTRIES: [Entry; 18] = [
    Entry {
        chart: "aikit",
        app_name: "aikit",
        display_name: "AIKit",
        description: "Build and deploy open LLMs with an OpenAI compatible API.",
        documentation_url: "https://kaito-project.github.io/aikit/docs/",
        source_url: "https://github.com/kaito-project/aikit",
        values: None,
        versions: &[("0.16.0", "v0.16.0")],
    },
    Entry {
        chart: "argo-cd",
        app_name: "argo-cd",
        display_name: "Argo CD",
        description: "Declarative continuous delivery for Kubernetes following GitOps principles.",
        documentation_url: "https://argo-cd.readthedocs.io/en/stable/",
        source_url: "https://github.com/argoproj/argo-cd",
        values: Some("server:\n  service:\n    type: ClusterIP\n"),
        versions: &[("7.7.0", "v2.13.0"), ("7.8.2", "v2.14.2")],
    },
    Entry {
        chart: "cert-manager",
        app_name: "cert-manager",
        display_name: "cert-manager",
        description: "Automatically provision and manage TLS certificates in Kubernetes.",
        documentation_url: "https://cert-manager.io/docs/",
        source_url: "https://github.com/cert-manager/cert-manager",
        values: Some("crds:\n  enabled: true\n"),
        versions: &[("v1.16.2", "v1.16.2"), ("v1.17.1", "v1.17.1")],
    },
    Entry {
        chart: "cluster-autoscaler",
        app_name: "cluster-autoscaler",
        display_name: "Cluster Autoscaler",
        description: "Adjusts the size of a Kubernetes cluster to meet workload demand.",
        documentation_url: "https://github.com/kubernetes/autoscaler/tree/master/cluster-autoscaler",
        source_url: "https://github.com/kubernetes/autoscaler",
        values: None,
        versions: &[("9.43.2", "v1.31.0"), ("9.46.0", "v1.32.0")],
    },
    Entry {
        chart: "external-dns",
        app_name: "external-dns",
        display_name: "ExternalDNS",
        description: "Synchronizes exposed Services and Ingresses with DNS providers.",
        documentation_url: "https://kubernetes-sigs.github.io/external-dns/",
        source_url: "https://github.com/kubernetes-sigs/external-dns",
        values: None,
        versions: &[("1.15.0", "v0.15.0")],
    },
    Entry {
        chart: "falco",
        app_name: "falco",
        display_name: "Falco",
        description: "Cloud native runtime security for hosts, containers and Kubernetes.",
        documentation_url: "https://falco.org/docs/",
        source_url: "https://github.com/falcosecurity/falco",
        values: None,
        versions: &[("4.16.1", "0.39.2"), ("4.20.0", "0.40.0")],
    },
    Entry {
        chart: "flux2",
        app_name: "flux2",
        display_name: "Flux",
        description: "Open and extensible continuous delivery solution for Kubernetes.",
        documentation_url: "https://fluxcd.io/flux/",
        source_url: "https://github.com/fluxcd/flux2",
        values: None,
        versions: &[("2.14.0", "2.4.0"), ("2.15.0", "2.5.1")],
    },
    Entry {
        chart: "ingress-nginx",
        app_name: "ingress-nginx",
        display_name: "Ingress NGINX",
        description: "Ingress controller for Kubernetes using NGINX as a reverse proxy and load balancer.",
        documentation_url: "https://kubernetes.github.io/ingress-nginx/",
        source_url: "https://github.com/kubernetes/ingress-nginx",
        values: Some("controller:\n  replicaCount: 2\n"),
        versions: &[("4.11.3", "1.11.3"), ("4.12.0", "1.12.0")],
    },
    Entry {
        chart: "k8sgpt-operator",
        app_name: "k8sgpt-operator",
        display_name: "K8sGPT Operator",
        description: "Scans clusters and explains issues in plain language using AI backends.",
        documentation_url: "https://docs.k8sgpt.ai/",
        source_url: "https://github.com/k8sgpt-ai/k8sgpt-operator",
        values: None,
        versions: &[("0.2.9", "0.2.9")],
    },
    Entry {
        chart: "kube-vip",
        app_name: "kube-vip",
        display_name: "kube-vip",
        description: "Virtual IP and load balancer for control plane and Services.",
        documentation_url: "https://kube-vip.io/",
        source_url: "https://github.com/kube-vip/kube-vip",
        values: None,
        versions: &[("0.6.4", "v0.8.7")],
    },
    Entry {
        chart: "kueue",
        app_name: "kueue",
        display_name: "Kueue",
        description: "Kubernetes-native job queueing.",
        documentation_url: "https://kueue.sigs.k8s.io/docs/",
        source_url: "https://github.com/kubernetes-sigs/kueue",
        values: None,
        versions: &[("0.10.1", "v0.10.1")],
    },
    Entry {
        chart: "local-ai",
        app_name: "local-ai",
        display_name: "LocalAI",
        description: "Self-hosted, OpenAI compatible inference API.",
        documentation_url: "https://localai.io/docs/",
        source_url: "https://github.com/mudler/LocalAI",
        values: None,
        versions: &[("3.4.2", "v2.24.2")],
    },
    Entry {
        chart: "metallb",
        app_name: "metallb",
        display_name: "MetalLB",
        description: "Network load balancer implementation for bare metal clusters.",
        documentation_url: "https://metallb.io/",
        source_url: "https://github.com/metallb/metallb",
        values: None,
        versions: &[("0.14.8", "v0.14.8"), ("0.14.9", "v0.14.9")],
    },
    Entry {
        chart: "node-feature-discovery",
        app_name: "node-feature-discovery",
        display_name: "Node Feature Discovery",
        description: "Detects hardware features and labels nodes accordingly.",
        documentation_url: "https://kubernetes-sigs.github.io/node-feature-discovery/",
        source_url: "https://github.com/kubernetes-sigs/node-feature-discovery",
        values: None,
        versions: &[("0.16.6", "v0.16.6")],
    },
    Entry {
        chart: "gpu-operator",
        app_name: "nvidia-gpu-operator",
        display_name: "NVIDIA GPU Operator",
        description: "Automates the management of NVIDIA software components needed to provision GPUs.",
        documentation_url: "https://docs.nvidia.com/datacenter/cloud-native/gpu-operator/latest/",
        source_url: "https://github.com/NVIDIA/gpu-operator",
        values: Some("driver:\n  enabled: true\n"),
        versions: &[("v24.9.1", "v24.9.1"), ("v24.9.2", "v24.9.2")],
    },
    Entry {
        chart: "sealed-secrets",
        app_name: "sealed-secrets",
        display_name: "Sealed Secrets",
        description: "Encrypt Secrets into SealedSecrets that are safe to store in Git.",
        documentation_url: "https://github.com/bitnami-labs/sealed-secrets#readme",
        source_url: "https://github.com/bitnami-labs/sealed-secrets",
        values: None,
        versions: &[("2.17.0", "v0.28.0")],
    },
    Entry {
        chart: "trivy",
        app_name: "trivy",
        display_name: "Trivy",
        description: "Vulnerability scanner for containers and other artifacts.",
        documentation_url: "https://trivy.dev/latest/docs/",
        source_url: "https://github.com/aquasecurity/trivy",
        values: None,
        versions: &[("0.9.0", "0.56.2")],
    },
    Entry {
        chart: "trivy-operator",
        app_name: "trivy-operator",
        display_name: "Trivy Operator",
        description: "Continuously scans the cluster for security issues.",
        documentation_url: "https://aquasecurity.github.io/trivy-operator/latest/",
        source_url: "https://github.com/aquasecurity/trivy-operator",
        values: None,
        versions: &[("0.24.1", "0.22.1"), ("0.26.1", "0.24.1")],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_size() {
        assert_eq!(default_charts().len(), 18);
    }

    #[test]
    fn test_sorted_and_unique() {
        let names = default_chart_names();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_every_entry_has_versions() {
        for chart in default_charts() {
            assert!(!chart.chart_versions.is_empty(), "{} has no versions", chart.chart_name);
            assert!(chart.repository_settings.is_none());
        }
    }

    #[test]
    fn test_identity_override() {
        let gpu = find_default_chart("nvidia-gpu-operator").unwrap();
        assert_eq!(gpu.chart_name, "gpu-operator");
        assert!(find_default_chart("gpu-operator").is_none());
    }
}
