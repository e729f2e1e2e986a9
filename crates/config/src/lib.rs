use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "carelink.toml",
    "config/carelink.toml",
    "crates/config/carelink.toml",
    "../carelink.toml",
    "../config/carelink.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    /// Base URL used when building links sent to users (password reset mails).
    #[serde(default = "HttpConfig::default_public_url")]
    pub public_url: String,
}

impl HttpConfig {
    fn default_public_url() -> String {
        "http://127.0.0.1:5000".to_string()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 5000,
            public_url: Self::default_public_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://carelink.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Token and credential settings.
///
/// ```
/// use carelink_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.jwt_expire_days, 30);
/// assert_eq!(auth.reset_token_ttl_minutes, 10);
/// assert!(!auth.secure_cookies);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_issuer")]
    pub jwt_issuer: String,
    #[serde(default = "AuthConfig::default_expire_days")]
    pub jwt_expire_days: u32,
    #[serde(default = "AuthConfig::default_expire_days")]
    pub cookie_expire_days: u32,
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "AuthConfig::default_reset_ttl")]
    pub reset_token_ttl_minutes: u32,
}

impl AuthConfig {
    fn default_issuer() -> String {
        "carelink".to_string()
    }

    const fn default_expire_days() -> u32 {
        30
    }

    const fn default_reset_ttl() -> u32 {
        10
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_issuer: Self::default_issuer(),
            jwt_expire_days: Self::default_expire_days(),
            cookie_expire_days: Self::default_expire_days(),
            secure_cookies: false,
            reset_token_ttl_minutes: Self::default_reset_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub bot_name: String,
    /// Capacity of the per-connection outbound queue.
    pub outbound_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_name: "COVID-19 Utility Bot".to_string(),
            outbound_buffer: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    pub base_url: String,
    pub country: String,
    pub refresh_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://disease.sh/v3/covid-19".to_string(),
            country: "Pakistan".to_string(),
            refresh_seconds: 600,
            request_timeout_seconds: 10,
        }
    }
}

/// Outbound mail. Without an `smtp_host` mails are only logged, which is
/// meant for local development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from_address: String,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "MailConfig::default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default, skip_serializing)]
    pub smtp_password: Option<String>,
    /// Upgrade the connection with STARTTLS. Disable only for local relays.
    #[serde(default = "MailConfig::default_starttls")]
    pub smtp_starttls: bool,
}

impl MailConfig {
    const fn default_smtp_port() -> u16 {
        587
    }

    const fn default_starttls() -> bool {
        true
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: "noreply@carelink.local".to_string(),
            smtp_host: None,
            smtp_port: Self::default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            smtp_starttls: Self::default_starttls(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use carelink_config::load;
///
/// std::env::remove_var("CARELINK_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("http.public_url", defaults.http.public_url.clone())?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default("auth.jwt_secret", defaults.auth.jwt_secret.clone())?
        .set_default("chat.bot_name", defaults.chat.bot_name.clone())?
        .set_default(
            "chat.outbound_buffer",
            i64::try_from(defaults.chat.outbound_buffer).unwrap_or(i64::MAX),
        )?
        .set_default("stats.base_url", defaults.stats.base_url.clone())?
        .set_default("stats.country", defaults.stats.country.clone())?
        .set_default(
            "stats.refresh_seconds",
            i64::try_from(defaults.stats.refresh_seconds).unwrap_or(i64::MAX),
        )?
        .set_default(
            "stats.request_timeout_seconds",
            i64::try_from(defaults.stats.request_timeout_seconds).unwrap_or(i64::MAX),
        )?
        .set_default("mail.from_address", defaults.mail.from_address.clone())?;

    let mut builder = builder;
    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CARELINK_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CARELINK_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(config::Environment::with_prefix("CARELINK").separator("__"));

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.chat.outbound_buffer == 0 {
        config.chat.outbound_buffer = 1;
    }

    debug!(
        http = ?config.http,
        database = ?config.database,
        stats = ?config.stats,
        "loaded backend configuration"
    );
    Ok(config)
}
