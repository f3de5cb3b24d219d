use crate::api::{ContentProvider, HttpContentProvider};
use crate::config::{self, AppConfig};
use crate::repository::RandomStringRepository;
use crate::storage::StorageManager;
use crate::view_model::GeneratorViewModel;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

// Core application state accessible by Tauri commands
#[derive(Clone)] // Allow cloning for background tasks
pub struct AppState {
    pub config: AppConfig,
    pub view_model: Arc<GeneratorViewModel>,
}

impl AppState {
    /// Wires storage, provider, repository and view model together.
    /// Must run inside a tokio runtime.
    pub async fn initialize(config: AppConfig, db_path: &Path) -> Result<Self, anyhow::Error> {
        let storage = StorageManager::new(db_path).await?;

        let token = config::get_provider_token(&config)?;
        let provider: Arc<dyn ContentProvider> =
            Arc::new(HttpContentProvider::new(config.provider_url.clone(), token));

        Ok(Self::with_parts(config, storage, provider).await)
    }

    pub async fn with_parts(
        config: AppConfig,
        storage: StorageManager,
        provider: Arc<dyn ContentProvider>,
    ) -> Self {
        // Storage is shared behind a mutex so each write and its snapshot stay in order
        let storage = Arc::new(Mutex::new(storage));
        let repository = Arc::new(RandomStringRepository::new(provider, storage).await);
        let view_model = Arc::new(GeneratorViewModel::new(repository));

        log::info!("Application state ready, provider at {}", config.provider_url);
        Self { config, view_model }
    }
}
