pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod k8s;
pub mod links;

pub use error::{ApplinksError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
