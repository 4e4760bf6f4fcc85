//! Domain views of the cluster resources the locator works with.
//!
//! Raw `kube` objects are converted at the backend boundary into these small
//! structs so the locator and the category builders never touch API machinery.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Annotation Argo CD stamps on resources it manages.
pub const TRACKING_ID_ANNOTATION: &str = "argocd.argoproj.io/tracking-id";

/// Subject of one links request. Constructed once at the transport edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRef {
    pub namespace: String,
    pub app_name: String,
}

impl ApplicationRef {
    pub fn new(namespace: &str, app_name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            app_name: app_name.to_string(),
        }
    }
}

/// Composite key binding a child resource to its owning application,
/// `{app}:{group}/{kind}:{namespace}/{name}`. Compared by exact equality
/// against the tracking annotation, never by prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationKey {
    app: String,
    group: String,
    kind: String,
    namespace: String,
    name: String,
}

impl CorrelationKey {
    pub fn deployment(app: &str, namespace: &str, name: &str) -> Self {
        Self::new(app, "apps", "Deployment", namespace, name)
    }

    pub fn external_secret(app: &str, namespace: &str, name: &str) -> Self {
        Self::new(app, "external-secrets.io", "ExternalSecret", namespace, name)
    }

    fn new(app: &str, group: &str, kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            app: app.to_string(),
            group: group.to_string(),
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn matches(&self, annotations: &BTreeMap<String, String>) -> bool {
        annotations
            .get(TRACKING_ID_ANNOTATION)
            .is_some_and(|tracking_id| *tracking_id == self.to_string())
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}:{}/{}",
            self.app, self.group, self.kind, self.namespace, self.name
        )
    }
}

/// Argo CD Application manifest, reduced to what link construction needs.
#[derive(Debug, Clone)]
pub struct ArgoApplication {
    pub name: String,
    pub namespace: String,
    pub spec: Value,
}

impl ArgoApplication {
    pub fn from_dynamic(obj: &DynamicObject) -> Self {
        Self {
            name: obj.metadata.name.clone().unwrap_or_default(),
            namespace: obj.metadata.namespace.clone().unwrap_or_default(),
            spec: obj.data.get("spec").cloned().unwrap_or(Value::Null),
        }
    }

    /// Namespace the application deploys into. The Application object itself
    /// lives in the control namespace.
    pub fn destination_namespace(&self) -> Option<&str> {
        self.spec
            .pointer("/destination/namespace")
            .and_then(Value::as_str)
    }

    pub fn source_repo(&self) -> Option<SourceRepo> {
        SourceRepo::parse(&self.spec)
    }
}

/// Source repository reference parsed from a multi-source Application spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRepo {
    pub repo_url: String,
    pub app_path: String,
    pub branch: String,
}

impl SourceRepo {
    /// The values repository is the source carrying `ref: values`; the app
    /// path comes from a helm `valueFiles` entry shaped `.../apps/{name}/base/...`.
    pub fn parse(spec: &Value) -> Option<Self> {
        let sources = spec.get("sources")?.as_array()?;

        let values_source = sources
            .iter()
            .find(|s| s.get("ref").and_then(Value::as_str) == Some("values"))?;
        let repo_url = values_source
            .get("repoURL")
            .and_then(Value::as_str)?
            .trim_end_matches('/')
            .to_string();
        let branch = values_source
            .get("targetRevision")
            .and_then(Value::as_str)
            .unwrap_or("main")
            .to_string();

        let value_files = sources
            .iter()
            .find_map(|s| s.pointer("/helm/valueFiles").and_then(Value::as_array))?;
        let app_path = value_files
            .iter()
            .filter_map(Value::as_str)
            .find_map(Self::app_path_from_value_file)?;

        Some(Self {
            repo_url,
            app_path,
            branch,
        })
    }

    // "$values/apps/checkout/base/base-values.yaml" -> "apps/checkout"
    fn app_path_from_value_file(value_file: &str) -> Option<String> {
        if !value_file.contains("/base/") {
            return None;
        }
        let rest = value_file.split("/apps/").nth(1)?;
        let app_name = rest.split('/').next().filter(|s| !s.is_empty())?;
        Some(format!("apps/{app_name}"))
    }
}

/// Deployment, reduced to correlation and pod-selection fields.
#[derive(Debug, Clone, Default)]
pub struct DeploymentInfo {
    pub name: String,
    pub annotations: BTreeMap<String, String>,
    pub selector: BTreeMap<String, String>,
}

impl DeploymentInfo {
    pub fn from_k8s(deployment: &Deployment) -> Self {
        Self {
            name: deployment.metadata.name.clone().unwrap_or_default(),
            annotations: deployment.metadata.annotations.clone().unwrap_or_default(),
            selector: deployment
                .spec
                .as_ref()
                .and_then(|s| s.selector.match_labels.clone())
                .unwrap_or_default(),
        }
    }

    /// `matchLabels` rendered as a list-call label selector.
    pub fn label_selector(&self) -> String {
        self.selector
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone)]
pub struct PodInfo {
    pub name: String,
    pub phase: String,
}

impl PodInfo {
    pub fn from_k8s(pod: &Pod) -> Self {
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            phase: pod
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// ExternalSecret, kept with its raw spec so the vault builder can extract
/// secret keys itself.
#[derive(Debug, Clone)]
pub struct ExternalSecretInfo {
    pub name: String,
    pub annotations: BTreeMap<String, String>,
    pub spec: Value,
}

impl ExternalSecretInfo {
    pub fn from_dynamic(obj: &DynamicObject) -> Self {
        Self {
            name: obj.metadata.name.clone().unwrap_or_default(),
            annotations: obj.metadata.annotations.clone().unwrap_or_default(),
            spec: obj.data.get("spec").cloned().unwrap_or(Value::Null),
        }
    }
}

/// Everything discovery produced for one request. Read-only after
/// construction; absence is data, never an error.
#[derive(Debug, Clone)]
pub struct DiscoveredResources {
    pub argocd_app_found: bool,
    pub argocd_manifest: Option<ArgoApplication>,
    /// Namespace the children live in, resolved from the manifest destination
    /// when present, the request namespace otherwise.
    pub target_namespace: String,
    pub deployment: Option<DeploymentInfo>,
    pub pods: Vec<PodInfo>,
    pub external_secrets: Vec<ExternalSecretInfo>,
}

impl DiscoveredResources {
    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            argocd_app: self.argocd_app_found,
            deployment: self.deployment.is_some(),
            pods_found: self.pods.len() as u32,
            external_secrets_found: self.external_secrets.len() as u32,
        }
    }
}

/// Discovery outcome counts included in every catalog for debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub argocd_app: bool,
    pub deployment: bool,
    pub pods_found: u32,
    pub external_secrets_found: u32,
}
