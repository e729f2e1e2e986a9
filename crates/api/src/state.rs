use std::sync::Arc;

use axum::http::HeaderMap;
use carelink_auth::{Account, Authenticator};
use carelink_chat::ChatHub;
use carelink_config::AppConfig;
use sqlx::SqlitePool;

use crate::services::stats::StatsService;
use crate::util::require_token;
use crate::ApiError;

/// Cookie and socket settings handlers need at request time.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_expire_days: u32,
    pub secure_cookies: bool,
    pub outbound_buffer: usize,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cookie_expire_days: config.auth.cookie_expire_days,
            secure_cookies: config.auth.secure_cookies,
            outbound_buffer: config.chat.outbound_buffer.max(1),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Clone)]
pub struct AppState {
    db_pool: SqlitePool,
    authenticator: Authenticator,
    hub: Arc<ChatHub>,
    stats: StatsService,
    settings: SessionSettings,
}

impl AppState {
    pub fn new(
        db_pool: SqlitePool,
        authenticator: Authenticator,
        hub: Arc<ChatHub>,
        stats: StatsService,
        settings: SessionSettings,
    ) -> Self {
        Self {
            db_pool,
            authenticator,
            hub,
            stats,
            settings,
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.db_pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn hub(&self) -> &Arc<ChatHub> {
        &self.hub
    }

    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub async fn authenticate(&self, token: &str) -> Result<Account, ApiError> {
        self.authenticator
            .authenticate(token)
            .await
            .map_err(ApiError::from)
    }

    /// Resolve the caller from the bearer header or the `token` cookie.
    pub async fn protect(&self, headers: &HeaderMap) -> Result<Account, ApiError> {
        let token = require_token(headers)?;
        self.authenticate(&token).await
    }
}
