//! The link catalog wire model.
//!
//! Shapes here are a compatibility contract with the UI extension: category
//! order, ids, and the status/links invariant are all depended on upstream.

pub mod aggregator;
pub mod builders;
pub mod quick_links;

pub use aggregator::LinkEngine;
pub use builders::BuildContext;

use crate::identity::{DisplayLabel, ServiceIdentity};
use crate::k8s::ResourceSummary;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Query-value encoding matching the dashboard tool's own URL serialization:
/// unreserved characters and `/` pass through, everything else is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

pub(crate) fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

impl Link {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Quicklinks,
    Apm,
    Namespace,
    Pod,
    Logs,
    Traces,
    Vault,
    Iaac,
}

impl CategoryId {
    pub fn label(self) -> &'static str {
        match self {
            CategoryId::Quicklinks => "Quick Links",
            CategoryId::Apm => "APM Overview",
            CategoryId::Namespace => "Kubernetes Overview",
            CategoryId::Pod => "Pod Metrics",
            CategoryId::Logs => "Logs",
            CategoryId::Traces => "Traces",
            CategoryId::Vault => "Vault Secrets",
            CategoryId::Iaac => "IaaC",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            CategoryId::Quicklinks => "🌟",
            CategoryId::Apm => "📊",
            CategoryId::Namespace => "📦",
            CategoryId::Pod => "🔲",
            CategoryId::Logs => "📋",
            CategoryId::Traces => "🔍",
            CategoryId::Vault => "🔐",
            CategoryId::Iaac => "⚙️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Ok,
    Empty,
    Error,
}

/// One category of links with its own status. Constructed only through
/// [`LinkCategory::ok`], [`LinkCategory::empty`], and [`LinkCategory::error`],
/// which keep the status/links/message fields consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCategory {
    pub id: CategoryId,
    pub label: String,
    pub icon: String,
    pub status: CategoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub links: Vec<Link>,
}

impl LinkCategory {
    pub fn ok(id: CategoryId, links: Vec<Link>) -> Self {
        debug_assert!(!links.is_empty(), "ok categories carry at least one link");
        Self {
            id,
            label: id.label().to_string(),
            icon: id.icon().to_string(),
            status: CategoryStatus::Ok,
            message: None,
            links,
        }
    }

    pub fn empty(id: CategoryId, message: impl Into<String>) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            icon: id.icon().to_string(),
            status: CategoryStatus::Empty,
            message: Some(message.into()),
            links: Vec::new(),
        }
    }

    pub fn error(id: CategoryId, message: impl Into<String>) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            icon: id.icon().to_string(),
            status: CategoryStatus::Error,
            message: Some(message.into()),
            links: Vec::new(),
        }
    }
}

/// The assembled answer for one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCatalog {
    pub app_name: String,
    pub namespace: String,
    pub service_identity: ServiceIdentity,
    pub display_label: DisplayLabel,
    pub categories: Vec<LinkCategory>,
    pub generated_at: DateTime<Utc>,
    pub max_rows: u32,
    pub resource_summary: ResourceSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_constructors_uphold_status_invariant() {
        let ok = LinkCategory::ok(
            CategoryId::Apm,
            vec![Link::new("checkout", "https://grafana.example.com/d/x")],
        );
        assert_eq!(ok.status, CategoryStatus::Ok);
        assert!(ok.message.is_none());
        assert!(!ok.links.is_empty());

        let empty = LinkCategory::empty(CategoryId::Pod, "No pods currently running");
        assert_eq!(empty.status, CategoryStatus::Empty);
        assert!(empty.links.is_empty());
        assert!(empty.message.is_some());

        let error = LinkCategory::error(CategoryId::Iaac, "ArgoCD application not found");
        assert_eq!(error.status, CategoryStatus::Error);
        assert!(error.links.is_empty());
        assert!(error.message.is_some());
    }

    #[test]
    fn category_ids_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&CategoryId::Quicklinks).unwrap(),
            "\"quicklinks\""
        );
        assert_eq!(serde_json::to_string(&CategoryId::Iaac).unwrap(), "\"iaac\"");
        assert_eq!(
            serde_json::to_string(&CategoryStatus::Empty).unwrap(),
            "\"empty\""
        );
    }

    #[test]
    fn encode_matches_upstream_query_conventions() {
        assert_eq!(encode("checkout-prod"), "checkout-prod");
        assert_eq!(encode("a b"), "a%20b");
        assert_eq!(encode("{\"k\":\"v\"}"), "%7B%22k%22%3A%22v%22%7D");
        assert_eq!(encode("a/b"), "a/b");
    }
}
