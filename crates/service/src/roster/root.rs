use std::fmt;

use crate::errors::ServiceError;
use crate::storage::{EntryKind, FileStore};

/// Where the container holding every school folder comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootLocator {
    /// Pre-provisioned container (a shared drive) whose id is configured.
    Configured(String),
    /// A folder with this exact name, searched for on every resolve.
    Named(String),
}

impl RootLocator {
    pub async fn resolve(&self, store: &dyn FileStore) -> Result<String, ServiceError> {
        match self {
            RootLocator::Configured(id) => Ok(id.clone()),
            RootLocator::Named(name) => store
                .find(None, name, EntryKind::Folder)
                .await?
                .into_iter()
                .next()
                .map(|e| e.id)
                .ok_or_else(|| ServiceError::RootNotFound(name.clone())),
        }
    }
}

impl fmt::Display for RootLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootLocator::Configured(id) => write!(f, "configured:{id}"),
            RootLocator::Named(name) => write!(f, "named:{name}"),
        }
    }
}
