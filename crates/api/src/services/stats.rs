//! COVID-19 figures from disease.sh, cached in memory.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use carelink_config::StatsConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Statistics service unavailable")]
    Request(#[from] reqwest::Error),
    #[error("Statistics service answered with status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Figures {
    pub cases: i64,
    pub today_cases: i64,
    pub deaths: i64,
    pub today_deaths: i64,
    pub recovered: i64,
    pub today_recovered: i64,
    pub active: i64,
    pub critical: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryFigures {
    pub country: String,
    #[serde(flatten)]
    pub figures: Figures,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CovidStats {
    pub global: Figures,
    pub country: CountryFigures,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch(&self) -> Result<CovidStats, StatsError>;
}

/// Reads `/all` and `/countries/{country}` from a disease.sh compatible API.
pub struct HttpStatsSource {
    client: reqwest::Client,
    base_url: String,
    country: String,
}

impl HttpStatsSource {
    pub fn new(config: &StatsConfig) -> Result<Self, StatsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country: config.country.clone(),
        })
    }

    async fn get(&self, path: &str) -> Result<Figures, StatsError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "fetching statistics");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(StatsError::Status(response.status().as_u16()));
        }
        Ok(response.json::<Figures>().await?)
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn fetch(&self) -> Result<CovidStats, StatsError> {
        let country_path = format!("countries/{}", self.country);
        let (global, country) = tokio::try_join!(self.get("all"), self.get(&country_path))?;
        Ok(CovidStats {
            global,
            country: CountryFigures {
                country: self.country.clone(),
                figures: country,
            },
            fetched_at: Utc::now(),
        })
    }
}

struct Cached {
    stats: CovidStats,
    stored_at: Instant,
}

#[derive(Clone)]
pub struct StatsService {
    source: Arc<dyn StatsSource>,
    cache: Arc<RwLock<Option<Cached>>>,
    ttl: Duration,
}

impl StatsService {
    pub fn new(source: Arc<dyn StatsSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    pub fn from_config(config: &StatsConfig) -> Result<Self, StatsError> {
        let source = HttpStatsSource::new(config)?;
        Ok(Self::new(
            Arc::new(source),
            Duration::from_secs(config.refresh_seconds),
        ))
    }

    /// Cached figures while fresh. After expiry the source is asked again;
    /// if that fails the stale copy is served.
    pub async fn current(&self) -> Result<CovidStats, StatsError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.stored_at.elapsed() < self.ttl {
                return Ok(cached.stats.clone());
            }
        }

        match self.refresh().await {
            Ok(stats) => Ok(stats),
            Err(err) => match self.cache.read().await.as_ref() {
                Some(cached) => {
                    warn!(error = %err, "statistics refresh failed, serving stale figures");
                    Ok(cached.stats.clone())
                }
                None => Err(err),
            },
        }
    }

    pub async fn refresh(&self) -> Result<CovidStats, StatsError> {
        let stats = self.source.fetch().await?;
        *self.cache.write().await = Some(Cached {
            stats: stats.clone(),
            stored_at: Instant::now(),
        });
        info!(country = %stats.country.country, "statistics refreshed");
        Ok(stats)
    }
}
