//! One builder per link category.
//!
//! Builders are independent: each consumes the shared build context and
//! produces a complete `LinkCategory`, converting its own parse failures into
//! an `error` status instead of letting anything escape to the aggregator.
//! URL shapes are a byte-level contract with the upstream tools.

use crate::config::Settings;
use crate::identity::ServiceIdentity;
use crate::k8s::DiscoveredResources;
use crate::links::{encode, quick_links, CategoryId, Link, LinkCategory};
use serde_json::{json, Value};

pub struct BuildContext<'a> {
    pub identity: &'a ServiceIdentity,
    /// Namespace the application's children live in.
    pub namespace: &'a str,
    pub discovered: &'a DiscoveredResources,
    pub settings: &'a Settings,
}

impl CategoryId {
    /// Catalog order. Part of the UI contract; quick links always lead.
    pub const ALL: [CategoryId; 8] = [
        CategoryId::Quicklinks,
        CategoryId::Apm,
        CategoryId::Namespace,
        CategoryId::Pod,
        CategoryId::Logs,
        CategoryId::Traces,
        CategoryId::Vault,
        CategoryId::Iaac,
    ];

    pub fn build(self, ctx: &BuildContext<'_>) -> LinkCategory {
        match self {
            CategoryId::Quicklinks => quick_links::build(&ctx.settings.captain_domain),
            CategoryId::Apm => build_apm(ctx),
            CategoryId::Namespace => build_namespace(ctx),
            CategoryId::Pod => build_pod(ctx),
            CategoryId::Logs => build_logs(ctx),
            CategoryId::Traces => build_traces(ctx),
            CategoryId::Vault => build_vault(ctx),
            CategoryId::Iaac => build_iaac(ctx),
        }
    }
}

fn build_apm(ctx: &BuildContext<'_>) -> LinkCategory {
    let service = ctx.identity.as_str();
    let url = format!(
        "{}/d/opentelemetry-apm/apm-overview\
         ?orgId=1&refresh=30s&from=now-1h&to=now&var-app={}&var-route=All",
        ctx.settings.grafana_base_url,
        encode(service),
    );

    LinkCategory::ok(CategoryId::Apm, vec![Link::new(service, url)])
}

fn build_namespace(ctx: &BuildContext<'_>) -> LinkCategory {
    let url = format!(
        "{}/d/ee58kcteeir5sf/kubernetes-overview?orgId=1&var-namespace={}",
        ctx.settings.grafana_base_url,
        encode(ctx.namespace),
    );

    LinkCategory::ok(CategoryId::Namespace, vec![Link::new(ctx.namespace, url)])
}

fn build_pod(ctx: &BuildContext<'_>) -> LinkCategory {
    let Some(pod) = ctx.discovered.pods.first() else {
        return LinkCategory::empty(CategoryId::Pod, "No pods currently running");
    };

    let url = format!(
        "{}/d/ce60j8f8umhhcc/kubernetes-pod-overview\
         ?orgId=1&refresh=10s&from=now-1h&to=now\
         &var-datasource=default&var-cluster=&var-namespace={}&var-pod={}",
        ctx.settings.grafana_base_url,
        encode(ctx.namespace),
        encode(&pod.name),
    );

    LinkCategory::ok(CategoryId::Pod, vec![Link::new(&pod.name, url)])
}

fn build_logs(ctx: &BuildContext<'_>) -> LinkCategory {
    let service = ctx.identity.as_str();
    let url = format!(
        "{base}/a/grafana-lokiexplore-app/explore/service/{svc}/logs\
         ?patterns=%5B%5D&from=now-15m&to=now\
         &var-filters=service_name%7C%3D%7C{svc}\
         &var-fields=&var-levels=&var-metadata=&var-patterns=&var-lineFilterV2=&var-lineFilters=&timezone=browser\
         &var-all-fields=&urlColumns=%5B%5D&visualizationType=%22logs%22&displayedFields=%5B%5D\
         &sortOrder=%22Descending%22&wrapLogMessage=false",
        base = ctx.settings.grafana_base_url,
        svc = encode(service),
    );

    LinkCategory::ok(CategoryId::Logs, vec![Link::new(service, url)])
}

fn build_traces(ctx: &BuildContext<'_>) -> LinkCategory {
    let service = ctx.identity.as_str();

    // Grafana explore pane state, passed as one JSON-encoded query value.
    let mut pane = json!({
        "queries": [{
            "refId": "A",
            "queryType": "traceqlSearch",
            "limit": 20,
            "tableType": "traces",
            "filters": [{
                "id": "service-name",
                "tag": "service.name",
                "operator": "=",
                "scope": "resource",
                "value": [service],
                "valueType": "string"
            }]
        }],
        "range": {"from": "now-1h", "to": "now"}
    });

    if let Some(uid) = &ctx.settings.tempo_datasource_uid {
        pane["datasource"] = json!(uid);
        pane["queries"][0]["datasource"] = json!({"type": "tempo", "uid": uid});
    }

    let panes = json!({ "trc": pane });
    let url = format!(
        "{}/explore?schemaVersion=1&panes={}&orgId=1",
        ctx.settings.grafana_base_url,
        encode(&panes.to_string()),
    );

    LinkCategory::ok(CategoryId::Traces, vec![Link::new(service, url)])
}

fn build_vault(ctx: &BuildContext<'_>) -> LinkCategory {
    if ctx.discovered.external_secrets.is_empty() {
        return LinkCategory::empty(CategoryId::Vault, "No external secrets found");
    }

    let mut links = Vec::new();
    for secret in &ctx.discovered.external_secrets {
        for key in secret_keys(&secret.spec) {
            // Keys are "mount/path"; the UI addresses them per mount.
            if let Some((mount, path)) = key.split_once('/') {
                let url = format!(
                    "{}/ui/vault/secrets/{}/show/{}",
                    ctx.settings.vault_base_url, mount, path
                );
                links.push(Link::new(path, url));
            }
        }
    }

    if links.is_empty() {
        return LinkCategory::empty(CategoryId::Vault, "No secret paths found in ExternalSecrets");
    }

    LinkCategory::ok(CategoryId::Vault, links)
}

fn secret_keys(spec: &Value) -> impl Iterator<Item = &str> {
    spec.get("dataFrom")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.pointer("/extract/key").and_then(Value::as_str))
        .filter(|key| !key.is_empty())
}

fn build_iaac(ctx: &BuildContext<'_>) -> LinkCategory {
    let Some(manifest) = &ctx.discovered.argocd_manifest else {
        return LinkCategory::error(CategoryId::Iaac, "ArgoCD application not found");
    };

    let Some(repo) = manifest.source_repo() else {
        return LinkCategory::error(CategoryId::Iaac, "Could not parse source repository");
    };

    let url = format!("{}/tree/{}/{}", repo.repo_url, repo.branch, repo.app_path);
    LinkCategory::ok(
        CategoryId::Iaac,
        vec![Link::new("Deployment Configuration", url)],
    )
}
