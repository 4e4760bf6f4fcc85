use anyhow::Context;
use applinks::cache::{CacheStore, CachedCatalogService, MemoryStore, RedisStore};
use applinks::config::Settings;
use applinks::http::{build_router, AppState};
use applinks::k8s::{K8sClient, ResourceBackend, ResourceLocator};
use applinks::links::LinkEngine;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "applinks", version, about = "Deep-link aggregation backend for Argo CD applications")]
struct Cli {
    /// Bind address, overrides APPLINKS_BIND
    #[arg(long)]
    bind: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("applinks=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting applinks v{}", applinks::VERSION);

    let mut settings = Settings::from_env().context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        settings.bind = bind;
    }

    let backend: Arc<dyn ResourceBackend> = Arc::new(
        K8sClient::try_default()
            .await
            .context("Failed to initialize Kubernetes client")?,
    );

    let store: Arc<dyn CacheStore> = match &settings.cache_url {
        Some(url) => Arc::new(
            RedisStore::connect(url, settings.cache_timeout)
                .context("Failed to initialize cache store")?,
        ),
        None => {
            warn!("No cache URL configured, using in-process cache");
            Arc::new(MemoryStore::new())
        }
    };

    let settings = Arc::new(settings);
    let locator = ResourceLocator::new(backend.clone(), &settings);
    let engine = LinkEngine::new(locator, settings.clone());
    let catalog = Arc::new(CachedCatalogService::new(
        engine,
        store.clone(),
        settings.cache_ttl,
    ));

    let state = AppState {
        catalog,
        backend,
        store,
    };

    let listener = TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;
    info!("Listening on {}", settings.bind);

    axum::serve(listener, build_router(state))
        .await
        .context("Server error")?;

    Ok(())
}
