use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Required credential or root identifier absent; fatal at startup.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),
    /// Discovered-by-name root folder does not exist in the store.
    #[error("root folder not found: {0}")]
    RootNotFound(String),
    #[error("Invalid payload")]
    InvalidPayload(String),
    /// Any failure reported by the remote store or while (de)serialising its content.
    #[error("{0}")]
    StoreOperationFailed(String),
}

impl ServiceError {
    pub fn store(op: &str, e: impl std::fmt::Display) -> Self {
        Self::StoreOperationFailed(format!("{op}: {e}"))
    }
}

impl From<configs::ConfigError> for ServiceError {
    fn from(e: configs::ConfigError) -> Self {
        Self::ConfigurationMissing(e.to_string())
    }
}
