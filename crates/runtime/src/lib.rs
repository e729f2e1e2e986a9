use std::sync::Arc;

use anyhow::{Context, Result};
use carelink_api::{AppState, SessionSettings, StatsService};
use carelink_auth::{mailer_from_config, Authenticator};
use carelink_chat::ChatHub;
use carelink_config::AppConfig;
use carelink_database::initialize_database;
use sqlx::SqlitePool;
use tracing::{info, warn};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the HTTP layer needs, built once at startup.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub hub: Arc<ChatHub>,
    pub stats: StatsService,
    pub settings: SessionSettings,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let mailer =
            mailer_from_config(&config.mail).context("failed to configure outbound mail")?;
        let authenticator = Authenticator::new(
            db_pool.clone(),
            &config.auth,
            mailer,
            config.http.public_url.clone(),
        );

        let stats =
            StatsService::from_config(&config.stats).context("failed to build statistics client")?;
        let hub = Arc::new(ChatHub::new(config.chat.bot_name.clone()));

        info!(bot = %hub.bot_name(), "chat hub ready");

        Ok(Self {
            db_pool,
            authenticator,
            hub,
            stats,
            settings: SessionSettings::from_config(config),
        })
    }

    /// Fetch statistics in the background so the first request hits a warm cache.
    pub fn warm_stats(&self) -> tokio::task::JoinHandle<()> {
        let stats = self.stats.clone();
        tokio::spawn(async move {
            if let Err(error) = stats.refresh().await {
                warn!(%error, "initial statistics fetch failed");
            }
        })
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.db_pool.clone(),
            self.authenticator.clone(),
            self.hub.clone(),
            self.stats.clone(),
            self.settings.clone(),
        )
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
