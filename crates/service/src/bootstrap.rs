use std::sync::Arc;

use configs::{RootMode, StoreBackend, StoreConfig};
use tracing::info;

use crate::errors::ServiceError;
use crate::roster::{RootLocator, RosterStore};
use crate::storage::{
    google_drive::DriveStore,
    memory::MemoryStore,
    token::{ServiceAccountKey, ServiceAccountTokenSource},
    FileStore,
};

fn root_locator(cfg: &StoreConfig) -> Result<RootLocator, ServiceError> {
    match cfg.root_mode {
        RootMode::SharedDrive => cfg
            .shared_drive_id
            .clone()
            .map(RootLocator::Configured)
            .ok_or_else(|| ServiceError::ConfigurationMissing("shared drive id".into())),
        RootMode::NamedFolder => Ok(RootLocator::Named(cfg.root_folder_name.clone())),
    }
}

/// Builds the store selected by `cfg.backend` and wraps it in the roster adapter.
pub async fn build_roster_store(cfg: &StoreConfig) -> Result<RosterStore, ServiceError> {
    let root = root_locator(cfg)?;
    let store: Arc<dyn FileStore> = match cfg.backend {
        StoreBackend::GoogleDrive => {
            let key = ServiceAccountKey::from_json(&cfg.credentials()?)?;
            info!(client_email = %key.client_email, "using google drive store");
            let client = DriveStore::build_client(cfg.request_timeout())?;
            let tokens = Arc::new(ServiceAccountTokenSource::new(key, client.clone())?);
            Arc::new(DriveStore::new(
                client,
                tokens,
                &cfg.api_base,
                &cfg.upload_base,
                cfg.shared_drive_id.clone(),
            ))
        }
        StoreBackend::Memory => {
            let mem = MemoryStore::new();
            // nothing to discover in a fresh store, so provide the named root
            if let RootLocator::Named(name) = &root {
                mem.seed_folder(name).await;
            }
            info!("using in-memory store; data is not persisted");
            Arc::new(mem)
        }
    };
    info!(%root, "roster store ready");
    Ok(RosterStore::new(store, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_with_named_root_resolves() -> Result<(), anyhow::Error> {
        let cfg = StoreConfig {
            backend: StoreBackend::Memory,
            root_mode: RootMode::NamedFolder,
            ..StoreConfig::default()
        };
        let rs = build_roster_store(&cfg).await?;
        assert!(rs.resolve_root().await?.starts_with("mem-"));
        Ok(())
    }

    #[tokio::test]
    async fn shared_drive_mode_without_id_is_rejected() {
        let cfg = StoreConfig { backend: StoreBackend::Memory, ..StoreConfig::default() };
        let err = build_roster_store(&cfg).await.err().unwrap();
        assert!(matches!(err, ServiceError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn drive_backend_needs_a_parsable_key() {
        let cfg = StoreConfig {
            credentials_json: Some("{}".into()),
            shared_drive_id: Some("0AbC".into()),
            ..StoreConfig::default()
        };
        let err = build_roster_store(&cfg).await.err().unwrap();
        assert!(matches!(err, ServiceError::ConfigurationMissing(_)));
    }
}
