use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{MemoryStore, PgStore, Store},
    storage::{self, LocalStorage, StorageClient},
};

/// Shared handles built once at startup and cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and opens the configured storage.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let pg = PgStore::connect(&config).await?;
        if let Err(e) = pg.migrate().await {
            tracing::warn!(error = %e, "migrations failed; continuing with existing schema");
        }

        let storage = storage::from_config(&config.storage).await?;

        Ok(Self {
            store: Arc::new(pg) as Arc<dyn Store>,
            config,
            storage,
        })
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            store,
            config,
            storage,
        }
    }

    /// In-process store plus local files under `uploads_root`.
    pub fn in_memory(uploads_root: &std::path::Path) -> Self {
        let config = AppConfig::for_tests(uploads_root.to_string_lossy());
        Self::from_parts(
            Arc::new(MemoryStore::default()),
            Arc::new(config),
            Arc::new(LocalStorage::new(uploads_root)),
        )
    }
}
