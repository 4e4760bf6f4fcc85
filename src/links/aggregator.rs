//! Catalog assembly.
//!
//! Runs the identity normalizer once, discovery once, then every category
//! builder, and assembles the result in the contract order. Infallible: a
//! catalog where every category reports `error` is still a valid answer.

use crate::config::Settings;
use crate::identity;
use crate::k8s::{ApplicationRef, ResourceLocator};
use crate::links::{BuildContext, CategoryId, LinkCatalog};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

pub struct LinkEngine {
    locator: ResourceLocator,
    settings: Arc<Settings>,
}

impl LinkEngine {
    pub fn new(locator: ResourceLocator, settings: Arc<Settings>) -> Self {
        Self { locator, settings }
    }

    pub async fn assemble(&self, app_ref: &ApplicationRef) -> LinkCatalog {
        debug!(app_name = %app_ref.app_name, namespace = %app_ref.namespace, "Assembling link catalog");

        let service_identity = identity::normalize(&app_ref.app_name);
        let display_label = identity::display_label(&app_ref.app_name);

        let discovered = self.locator.locate(app_ref).await;
        let summary = discovered.summary();

        let ctx = BuildContext {
            identity: &service_identity,
            namespace: &discovered.target_namespace,
            discovered: &discovered,
            settings: &self.settings,
        };
        let categories = CategoryId::ALL
            .iter()
            .map(|id| id.build(&ctx))
            .collect::<Vec<_>>();

        info!(
            app_name = %app_ref.app_name,
            namespace = %discovered.target_namespace,
            argocd_app = summary.argocd_app,
            pods_found = summary.pods_found,
            "Link catalog assembled"
        );

        LinkCatalog {
            app_name: app_ref.app_name.clone(),
            namespace: discovered.target_namespace.clone(),
            service_identity,
            display_label,
            categories,
            generated_at: Utc::now(),
            max_rows: self.settings.max_rows,
            resource_summary: summary,
        }
    }
}
