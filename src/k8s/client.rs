//! Kubernetes resource backend.
//!
//! `ResourceBackend` is the read-only lookup interface the locator consumes;
//! `K8sClient` is its in-cluster implementation. Built-in kinds go through
//! typed APIs, the Argo CD and ExternalSecret CRDs through dynamic ones.

use crate::k8s::types::{ArgoApplication, DeploymentInfo, ExternalSecretInfo, PodInfo};
use crate::{ApplinksError, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use tracing::{debug, info};

/// Read-only lookup operations over the resource kinds link discovery needs.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Fetch an Argo CD Application by name. `Ok(None)` means not found.
    async fn get_application(&self, namespace: &str, name: &str)
        -> Result<Option<ArgoApplication>>;

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<DeploymentInfo>>;

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodInfo>>;

    async fn list_external_secrets(&self, namespace: &str) -> Result<Vec<ExternalSecretInfo>>;

    /// Whether the backend is reachable at all, for readiness reporting.
    async fn ping(&self) -> bool;
}

pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    pub async fn try_default() -> Result<Self> {
        debug!("Initializing Kubernetes client");

        let client = Client::try_default().await.map_err(|e| {
            ApplinksError::Kubernetes(format!("Failed to create K8s client: {e}"))
        })?;

        info!("Successfully connected to Kubernetes cluster");

        Ok(Self { client })
    }

    fn applications(&self, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk("argoproj.io", "v1alpha1", "Application");
        Api::namespaced_with(self.client.clone(), namespace, &ApiResource::from_gvk(&gvk))
    }

    fn external_secrets(&self, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk("external-secrets.io", "v1beta1", "ExternalSecret");
        Api::namespaced_with(self.client.clone(), namespace, &ApiResource::from_gvk(&gvk))
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ResourceBackend for K8sClient {
    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ArgoApplication>> {
        let found = self.applications(namespace).get_opt(name).await.map_err(|e| {
            ApplinksError::Kubernetes(format!(
                "Failed to get application {namespace}/{name}: {e}"
            ))
        })?;

        Ok(found.map(|obj| ArgoApplication::from_dynamic(&obj)))
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<DeploymentInfo>> {
        let list = self
            .deployments(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| {
                ApplinksError::Kubernetes(format!(
                    "Failed to list deployments in {namespace}: {e}"
                ))
            })?;

        Ok(list.items.iter().map(DeploymentInfo::from_k8s).collect())
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodInfo>> {
        let params = ListParams::default().labels(label_selector);
        let list = self.pods(namespace).list(&params).await.map_err(|e| {
            ApplinksError::Kubernetes(format!("Failed to list pods in {namespace}: {e}"))
        })?;

        Ok(list.items.iter().map(PodInfo::from_k8s).collect())
    }

    async fn list_external_secrets(&self, namespace: &str) -> Result<Vec<ExternalSecretInfo>> {
        let list = self
            .external_secrets(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| {
                ApplinksError::Kubernetes(format!(
                    "Failed to list external secrets in {namespace}: {e}"
                ))
            })?;

        Ok(list
            .items
            .iter()
            .map(ExternalSecretInfo::from_dynamic)
            .collect())
    }

    async fn ping(&self) -> bool {
        self.client.apiserver_version().await.is_ok()
    }
}
