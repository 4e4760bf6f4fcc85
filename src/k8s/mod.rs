pub mod client;
pub mod locator;
pub mod types;

pub use client::{K8sClient, ResourceBackend};
pub use locator::ResourceLocator;
pub use types::{
    ApplicationRef, ArgoApplication, CorrelationKey, DeploymentInfo, DiscoveredResources,
    ExternalSecretInfo, PodInfo, ResourceSummary, SourceRepo, TRACKING_ID_ANNOTATION,
};
