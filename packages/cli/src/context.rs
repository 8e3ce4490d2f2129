// ABOUTME: Application context shared by every CLI command
// ABOUTME: Opens the SQLite store, runs migrations and wires the optional generation backend

use std::sync::Arc;

use anyhow::{Context, Result};
use proposekit_ai::{AIService, AIServiceConfig};
use proposekit_config::Settings;
use proposekit_engine::{AnthropicBackend, Engine, EngineConfig, GenerationBackend};
use proposekit_storage::{ProposalStorage, SqliteStorage, StorageConfig};
use tracing::{debug, info};

pub struct AppContext {
    pub settings: Settings,
    pub engine: Engine,
}

impl AppContext {
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let storage_config = StorageConfig::new(
            settings.database_path.to_string_lossy().to_string(),
            settings.max_db_connections,
        );
        let storage = SqliteStorage::new(storage_config)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    settings.database_path.display()
                )
            })?;
        storage
            .initialize()
            .await
            .context("Failed to run database migrations")?;
        debug!("Database ready at {}", settings.database_path.display());

        let backend = generation_backend(&settings)?;
        let config = EngineConfig {
            generation_timeout: settings.generation_timeout,
            public_base_url: settings.public_base_url.clone(),
        };
        let engine = Engine::new(Arc::new(storage), backend, config);

        Ok(Self { settings, engine })
    }
}

/// Anthropic backend when a key is configured; templates only otherwise
fn generation_backend(settings: &Settings) -> Result<Option<Arc<dyn GenerationBackend>>> {
    let Some(api_key) = settings.anthropic_api_key.clone() else {
        info!("No Anthropic API key configured, proposals will use the template");
        return Ok(None);
    };

    let mut config = AIServiceConfig::with_api_key(api_key);
    if let Some(model) = &settings.anthropic_model {
        config.model = model.clone();
    }
    config.request_timeout = settings.generation_timeout;

    let service = AIService::new(config).context("Failed to build the Anthropic client")?;
    Ok(Some(Arc::new(AnthropicBackend::new(service))))
}
