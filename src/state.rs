use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::{
    auth::{
        repo::{PgUserRepo, UserRepo},
        tokens::TokenKeys,
    },
    config::AppConfig,
    memory::{MemoryRecipeRepo, MemoryUserRepo},
    recipes::repo::{PgRecipeRepo, RecipeRepo},
};

/// `DATABASE_URL` value that selects the in-process backend.
pub const MEMORY_URL: &str = "memory://";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: Arc<TokenKeys>,
    pub users: Arc<dyn UserRepo>,
    pub recipes: Arc<dyn RecipeRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::connect(config).await
    }

    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        if config.database_url.starts_with(MEMORY_URL) {
            warn!("using in-memory storage; data is lost on restart");
            return Ok(Self::in_memory(config));
        }

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!("database ready");

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(db.clone())),
            Arc::new(PgRecipeRepo::new(db)),
        ))
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(
            config,
            Arc::new(MemoryUserRepo::new()),
            Arc::new(MemoryRecipeRepo::new()),
        )
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserRepo>,
        recipes: Arc<dyn RecipeRepo>,
    ) -> Self {
        let keys = Arc::new(TokenKeys::from_config(&config.jwt));
        Self {
            config: Arc::new(config),
            keys,
            users,
            recipes,
        }
    }
}
