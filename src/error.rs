use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplinksError {
    #[error("Kubernetes error: {0}")]
    Kubernetes(String),

    #[error("Cache store error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ApplinksError>;
