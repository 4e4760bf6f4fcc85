//! Resource discovery for one application.
//!
//! Every lookup is isolated: a backend failure or timeout degrades that one
//! lookup to "not found" and the rest proceed. The locator never returns an
//! error; absence lives in the returned structure.

use crate::config::Settings;
use crate::k8s::client::ResourceBackend;
use crate::k8s::types::{
    ApplicationRef, ArgoApplication, CorrelationKey, DeploymentInfo, DiscoveredResources,
    ExternalSecretInfo, PodInfo,
};
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

pub struct ResourceLocator {
    backend: Arc<dyn ResourceBackend>,
    argocd_namespace: String,
    lookup_timeout: Duration,
}

impl ResourceLocator {
    pub fn new(backend: Arc<dyn ResourceBackend>, settings: &Settings) -> Self {
        Self {
            backend,
            argocd_namespace: settings.argocd_namespace.clone(),
            lookup_timeout: settings.lookup_timeout,
        }
    }

    pub async fn locate(&self, app_ref: &ApplicationRef) -> DiscoveredResources {
        let manifest = self.locate_application(app_ref).await;

        // The Application object lives in the control namespace but deploys
        // elsewhere; children are looked up where they actually run.
        let target_namespace = manifest
            .as_ref()
            .and_then(ArgoApplication::destination_namespace)
            .unwrap_or(&app_ref.namespace)
            .to_string();

        let ((deployment, pods), external_secrets) = futures::join!(
            self.locate_workload(&app_ref.app_name, &target_namespace),
            self.locate_external_secrets(&app_ref.app_name, &target_namespace),
        );

        DiscoveredResources {
            argocd_app_found: manifest.is_some(),
            argocd_manifest: manifest,
            target_namespace,
            deployment,
            pods,
            external_secrets,
        }
    }

    async fn locate_application(&self, app_ref: &ApplicationRef) -> Option<ArgoApplication> {
        let mut namespaces = vec![self.argocd_namespace.as_str()];
        if app_ref.namespace != self.argocd_namespace {
            namespaces.push(app_ref.namespace.as_str());
        }

        for namespace in namespaces {
            let found = self
                .bounded(
                    "argocd application",
                    self.backend.get_application(namespace, &app_ref.app_name),
                )
                .await
                .flatten();
            if let Some(app) = found {
                debug!(name = %app.name, namespace, "Argo CD application found");
                return Some(app);
            }
        }

        debug!(app_name = %app_ref.app_name, "Argo CD application not found");
        None
    }

    async fn locate_workload(
        &self,
        app_name: &str,
        namespace: &str,
    ) -> (Option<DeploymentInfo>, Vec<PodInfo>) {
        let deployment = self.locate_deployment(app_name, namespace).await;

        let mut pods = Vec::new();
        if let Some(deployment) = &deployment {
            let selector = deployment.label_selector();
            if selector.is_empty() {
                warn!(deployment = %deployment.name, "Deployment has no selector labels");
            } else if let Some(found) = self
                .bounded("pods", self.backend.list_pods(namespace, &selector))
                .await
            {
                pods = found;
                // Product decision: one pod link; the namespace dashboard
                // covers the rest.
                pods.truncate(1);
            }
        }

        (deployment, pods)
    }

    async fn locate_deployment(&self, app_name: &str, namespace: &str) -> Option<DeploymentInfo> {
        let deployments = self
            .bounded("deployments", self.backend.list_deployments(namespace))
            .await?;

        deployments.into_iter().find(|deployment| {
            CorrelationKey::deployment(app_name, namespace, &deployment.name)
                .matches(&deployment.annotations)
        })
    }

    async fn locate_external_secrets(
        &self,
        app_name: &str,
        namespace: &str,
    ) -> Vec<ExternalSecretInfo> {
        let Some(secrets) = self
            .bounded(
                "external secrets",
                self.backend.list_external_secrets(namespace),
            )
            .await
        else {
            return Vec::new();
        };

        secrets
            .into_iter()
            .filter(|secret| {
                CorrelationKey::external_secret(app_name, namespace, &secret.name)
                    .matches(&secret.annotations)
            })
            .collect()
    }

    /// Run one backend lookup with a bounded timeout; failure and timeout
    /// both degrade to `None` for this lookup only.
    async fn bounded<T>(&self, lookup: &str, fut: impl Future<Output = Result<T>>) -> Option<T> {
        match timeout(self.lookup_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(lookup, error = %e, "Resource lookup failed");
                None
            }
            Err(_) => {
                warn!(lookup, timeout_ms = self.lookup_timeout.as_millis() as u64, "Resource lookup timed out");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::types::TRACKING_ID_ANNOTATION;
    use crate::ApplinksError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct FakeBackend {
        application: Option<ArgoApplication>,
        deployments: Vec<DeploymentInfo>,
        pods: Vec<PodInfo>,
        external_secrets: Vec<ExternalSecretInfo>,
        fail_deployments: bool,
    }

    #[async_trait]
    impl ResourceBackend for FakeBackend {
        async fn get_application(
            &self,
            namespace: &str,
            _name: &str,
        ) -> Result<Option<ArgoApplication>> {
            Ok(self
                .application
                .as_ref()
                .filter(|app| app.namespace == namespace)
                .cloned())
        }

        async fn list_deployments(&self, _namespace: &str) -> Result<Vec<DeploymentInfo>> {
            if self.fail_deployments {
                return Err(ApplinksError::Kubernetes("connection refused".to_string()));
            }
            Ok(self.deployments.clone())
        }

        async fn list_pods(
            &self,
            _namespace: &str,
            _label_selector: &str,
        ) -> Result<Vec<PodInfo>> {
            Ok(self.pods.clone())
        }

        async fn list_external_secrets(
            &self,
            _namespace: &str,
        ) -> Result<Vec<ExternalSecretInfo>> {
            Ok(self.external_secrets.clone())
        }

        async fn ping(&self) -> bool {
            true
        }
    }

    fn tracked(annotation: &str) -> BTreeMap<String, String> {
        let mut annotations = BTreeMap::new();
        annotations.insert(TRACKING_ID_ANNOTATION.to_string(), annotation.to_string());
        annotations
    }

    fn locator(backend: FakeBackend) -> ResourceLocator {
        ResourceLocator {
            backend: Arc::new(backend),
            argocd_namespace: "argocd".to_string(),
            lookup_timeout: Duration::from_millis(200),
        }
    }

    fn pod(name: &str) -> PodInfo {
        PodInfo {
            name: name.to_string(),
            phase: "Running".to_string(),
        }
    }

    #[tokio::test]
    async fn absence_is_not_an_error() {
        let locator = locator(FakeBackend::default());
        let discovered = locator
            .locate(&ApplicationRef::new("nonprod", "ghost-app"))
            .await;

        assert!(!discovered.argocd_app_found);
        assert!(discovered.deployment.is_none());
        assert!(discovered.pods.is_empty());
        assert!(discovered.external_secrets.is_empty());
        assert_eq!(discovered.target_namespace, "nonprod");
    }

    #[tokio::test]
    async fn matches_deployment_by_exact_tracking_id() {
        let mut selector = BTreeMap::new();
        selector.insert("app.kubernetes.io/name".to_string(), "checkout".to_string());
        let backend = FakeBackend {
            deployments: vec![
                DeploymentInfo {
                    name: "checkout-extra".to_string(),
                    annotations: tracked("checkout:apps/Deployment:nonprod/checkout"),
                    selector: BTreeMap::new(),
                },
                DeploymentInfo {
                    name: "checkout".to_string(),
                    annotations: tracked("checkout:apps/Deployment:nonprod/checkout"),
                    selector,
                },
            ],
            pods: vec![pod("checkout-7f8d9"), pod("checkout-x1y2z")],
            ..FakeBackend::default()
        };

        let discovered = locator(backend)
            .locate(&ApplicationRef::new("nonprod", "checkout"))
            .await;

        let deployment = discovered.deployment.expect("deployment matched");
        assert_eq!(deployment.name, "checkout");
        // Only the first pod in discovery order is kept.
        assert_eq!(discovered.pods.len(), 1);
        assert_eq!(discovered.pods[0].name, "checkout-7f8d9");
    }

    #[tokio::test]
    async fn backend_failure_degrades_that_lookup_only() {
        let backend = FakeBackend {
            external_secrets: vec![ExternalSecretInfo {
                name: "checkout-secrets".to_string(),
                annotations: tracked(
                    "checkout:external-secrets.io/ExternalSecret:nonprod/checkout-secrets",
                ),
                spec: json!({}),
            }],
            fail_deployments: true,
            ..FakeBackend::default()
        };

        let discovered = locator(backend)
            .locate(&ApplicationRef::new("nonprod", "checkout"))
            .await;

        assert!(discovered.deployment.is_none());
        assert!(discovered.pods.is_empty());
        assert_eq!(discovered.external_secrets.len(), 1);
    }

    #[tokio::test]
    async fn destination_namespace_overrides_request_namespace() {
        let backend = FakeBackend {
            application: Some(ArgoApplication {
                name: "checkout".to_string(),
                namespace: "argocd".to_string(),
                spec: json!({"destination": {"namespace": "prod"}}),
            }),
            ..FakeBackend::default()
        };

        let discovered = locator(backend)
            .locate(&ApplicationRef::new("argocd", "checkout"))
            .await;

        assert!(discovered.argocd_app_found);
        assert_eq!(discovered.target_namespace, "prod");
    }
}
