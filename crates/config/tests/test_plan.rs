//! Test plan for the `carelink-config` crate.
//!
//! Covers default handling, file discovery, environment overrides and
//! invalid input.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use carelink_config::{load, AppConfig, ChatConfig, HttpConfig, MailConfig, StatsConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "CARELINK_CONFIG",
    "CARELINK__AUTH__JWT_SECRET",
    "CARELINK__AUTH__JWT_EXPIRE_DAYS",
    "CARELINK__AUTH__SECURE_COOKIES",
    "CARELINK__CHAT__BOT_NAME",
    "CARELINK__CHAT__OUTBOUND_BUFFER",
    "CARELINK__DATABASE__MAX_CONNECTIONS",
    "CARELINK__DATABASE__URL",
    "CARELINK__HTTP__ADDRESS",
    "CARELINK__HTTP__PORT",
    "CARELINK__HTTP__PUBLIC_URL",
    "CARELINK__MAIL__FROM_ADDRESS",
    "CARELINK__MAIL__SMTP_HOST",
    "CARELINK__MAIL__SMTP_PORT",
    "CARELINK__MAIL__SMTP_USERNAME",
    "CARELINK__MAIL__SMTP_PASSWORD",
    "CARELINK__MAIL__SMTP_STARTTLS",
    "CARELINK__STATS__BASE_URL",
    "CARELINK__STATS__COUNTRY",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.http.public_url, defaults.http.public_url);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(config.auth.jwt_expire_days, 30);
    assert_eq!(config.auth.reset_token_ttl_minutes, 10);
    assert_eq!(config.chat.bot_name, "COVID-19 Utility Bot");
    assert_eq!(config.stats.country, "Pakistan");
    assert_eq!(config.mail.from_address, defaults.mail.from_address);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "carelink.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/carelink.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "carelink.toml",
        r#"
        [http]
        port = 8181

        [auth]
        jwt_secret = "file-secret"
        secure_cookies = true

        [database]
        max_connections = 50
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.auth.jwt_secret, "file-secret");
    assert!(config.auth.secure_cookies);
    assert_eq!(config.auth.cookie_expire_days, defaults.auth.cookie_expire_days);
    assert_eq!(config.stats.base_url, defaults.stats.base_url);
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "carelink.toml",
        r#"
        [http]
        port = 1111
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [http]
        port = 2222
        "#,
    );

    let custom = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("CARELINK_CONFIG", custom.display().to_string());

    let config = load().expect("configuration load should use CARELINK_CONFIG");
    assert_eq!(config.http.port, 2222);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "carelink.toml",
        r#"
        [http]
        port = 3030

        [chat]
        bot_name = "File Bot"
        "#,
    );

    ctx.set_var("CARELINK__HTTP__PORT", "8080");
    ctx.set_var("CARELINK__CHAT__BOT_NAME", "Env Bot");
    ctx.set_var("CARELINK__STATS__COUNTRY", "Germany");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.chat.bot_name, "Env Bot");
    assert_eq!(config.stats.country, "Germany");
}

#[test]
#[serial]
fn load_supports_database_url_environment_variable() {
    let (_dir, mut ctx) = isolated();

    let url = "sqlite://data/carelink-test.db";
    ctx.set_var("CARELINK__DATABASE__URL", url);

    let config = load().expect("configuration load should read database env override");
    assert_eq!(config.database.url, url);
}

#[test]
#[serial]
fn load_raises_zero_outbound_buffer_to_one() {
    let (_dir, mut ctx) = isolated();

    ctx.set_var("CARELINK__CHAT__OUTBOUND_BUFFER", "0");

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.chat.outbound_buffer, 1);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "carelink.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration")
            || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
#[serial]
fn load_reads_smtp_settings_from_file_and_environment() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "carelink.toml",
        r#"
        [mail]
        from_address = "care@carelink.test"
        smtp_host = "smtp.carelink.test"
        smtp_username = "mailer"
        "#,
    );
    ctx.set_var("CARELINK__MAIL__SMTP_PORT", "2525");
    ctx.set_var("CARELINK__MAIL__SMTP_PASSWORD", "hunter22");

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.mail.from_address, "care@carelink.test");
    assert_eq!(config.mail.smtp_host.as_deref(), Some("smtp.carelink.test"));
    assert_eq!(config.mail.smtp_port, 2525);
    assert_eq!(config.mail.smtp_username.as_deref(), Some("mailer"));
    assert_eq!(config.mail.smtp_password.as_deref(), Some("hunter22"));
    assert!(config.mail.smtp_starttls);
}

#[test]
fn mail_config_defaults_to_logging_only() {
    let defaults = MailConfig::default();
    assert!(defaults.smtp_host.is_none());
    assert_eq!(defaults.smtp_port, 587);
    assert!(defaults.smtp_starttls);
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 5000);
}

#[test]
fn stats_config_defaults_point_at_disease_sh() {
    let defaults = StatsConfig::default();
    assert!(defaults.base_url.starts_with("https://disease.sh"));
    assert_eq!(defaults.refresh_seconds, 600);
}

#[test]
fn chat_config_has_non_zero_buffer() {
    assert!(ChatConfig::default().outbound_buffer > 0);
}
