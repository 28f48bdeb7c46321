// src/config.rs
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::session::DEFAULT_SESSION_TTL_DAYS;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Path to the SQLite database file
    pub db_url: String,

    /// Socket address the HTTP server binds to
    pub listen_addr: String,

    /// Absolute base URL used to mint links and ids in the Atom feed
    pub public_url: String,

    /// Key for the per-action CSRF tokens
    pub csrf_key: SecretString,

    /// Key for hashing remember-me tokens before they reach the store
    pub hmac_key: SecretString,

    pub session_ttl_days: i64,
}

/// The subset of settings a TOML file may provide; absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    db_url: Option<String>,
    listen_addr: Option<String>,
    public_url: Option<String>,
    csrf_key: Option<String>,
    hmac_key: Option<String>,
    session_ttl_days: Option<i64>,
}

/// Settings before the required secrets have been checked.
#[derive(Debug)]
struct PartialSettings {
    db_url: String,
    listen_addr: String,
    public_url: String,
    csrf_key: Option<SecretString>,
    hmac_key: Option<SecretString>,
    session_ttl_days: i64,
}

fn default_db_path() -> String {
    let db_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config/sparkmark");

    // Ensure directory exists
    std::fs::create_dir_all(&db_dir).ok();

    db_dir
        .join("sparkmark.db")
        .to_str()
        .unwrap_or("sparkmark.db")
        .to_string()
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config/sparkmark/config.toml"))
}

impl Default for PartialSettings {
    fn default() -> Self {
        Self {
            db_url: default_db_path(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            csrf_key: None,
            hmac_key: None,
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
        }
    }
}

impl PartialSettings {
    fn merge_file(&mut self, file: FileSettings) {
        if let Some(db_url) = file.db_url {
            self.db_url = db_url;
        }
        if let Some(listen_addr) = file.listen_addr {
            self.listen_addr = listen_addr;
        }
        if let Some(public_url) = file.public_url {
            self.public_url = public_url;
        }
        if let Some(key) = file.csrf_key {
            self.csrf_key = Some(SecretString::from(key));
        }
        if let Some(key) = file.hmac_key {
            self.hmac_key = Some(SecretString::from(key));
        }
        if let Some(days) = file.session_ttl_days {
            self.session_ttl_days = days;
        }
    }

    fn merge_env(&mut self) {
        if let Ok(db_url) = std::env::var("SPARKMARK_DB_URL") {
            trace!("Using SPARKMARK_DB_URL from environment: {}", db_url);
            self.db_url = db_url;
        }
        if let Ok(listen_addr) = std::env::var("SPARKMARK_LISTEN_ADDR") {
            trace!("Using SPARKMARK_LISTEN_ADDR from environment: {}", listen_addr);
            self.listen_addr = listen_addr;
        }
        if let Ok(public_url) = std::env::var("SPARKMARK_PUBLIC_URL") {
            trace!("Using SPARKMARK_PUBLIC_URL from environment: {}", public_url);
            self.public_url = public_url;
        }
        if let Ok(key) = std::env::var("SPARKMARK_CSRF_KEY") {
            self.csrf_key = Some(SecretString::from(key));
        }
        if let Ok(key) = std::env::var("SPARKMARK_HMAC_KEY") {
            self.hmac_key = Some(SecretString::from(key));
        }
    }

    fn finish(self) -> DomainResult<Settings> {
        let csrf_key = required_secret(self.csrf_key, "csrf_key (SPARKMARK_CSRF_KEY)")?;
        let hmac_key = required_secret(self.hmac_key, "hmac_key (SPARKMARK_HMAC_KEY)")?;
        if self.session_ttl_days < 1 {
            return Err(DomainError::Configuration(format!(
                "session_ttl_days must be positive, got {}",
                self.session_ttl_days
            )));
        }
        url::Url::parse(&self.public_url).map_err(|e| {
            DomainError::Configuration(format!("public_url {:?}: {}", self.public_url, e))
        })?;

        Ok(Settings {
            db_url: self.db_url,
            listen_addr: self.listen_addr,
            public_url: self.public_url.trim_end_matches('/').to_string(),
            csrf_key,
            hmac_key,
            session_ttl_days: self.session_ttl_days,
        })
    }
}

fn required_secret(secret: Option<SecretString>, name: &str) -> DomainResult<SecretString> {
    match secret {
        Some(s) if !s.expose_secret().trim().is_empty() => Ok(s),
        _ => Err(DomainError::Configuration(format!("{} is required", name))),
    }
}

fn read_config_file(path: &Path) -> DomainResult<FileSettings> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| DomainError::Configuration(format!("reading {:?}: {}", path, e)))?;
    toml::from_str::<FileSettings>(&text)
        .map_err(|e| DomainError::Configuration(format!("parsing {:?}: {}", path, e)))
}

/// Loads defaults, then the TOML file, then `SPARKMARK_*` environment overrides.
///
/// An explicit `config_path` must exist; the default location is optional. A malformed
/// file or a missing CSRF/HMAC key is an error.
#[instrument(level = "debug")]
pub fn load_settings(config_path: Option<&Path>) -> DomainResult<Settings> {
    trace!("Loading settings");
    let mut settings = PartialSettings::default();

    match config_path {
        Some(path) => {
            debug!("Loading config from: {:?}", path);
            settings.merge_file(read_config_file(path)?);
        }
        None => {
            if let Some(path) = default_config_path().filter(|p| p.exists()) {
                debug!("Loading config from: {:?}", path);
                settings.merge_file(read_config_file(&path)?);
            }
        }
    }

    settings.merge_env();
    let settings = settings.finish()?;
    trace!("Settings loaded: {:?}", settings);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::EnvGuard;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_config_file(content: &str) -> (TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).unwrap();
        (temp_dir, config_path)
    }

    fn clear_env() -> EnvGuard {
        let guard = EnvGuard::new();
        for name in [
            "SPARKMARK_DB_URL",
            "SPARKMARK_LISTEN_ADDR",
            "SPARKMARK_PUBLIC_URL",
            "SPARKMARK_CSRF_KEY",
            "SPARKMARK_HMAC_KEY",
        ] {
            env::remove_var(name);
        }
        guard
    }

    #[test]
    #[serial]
    fn given_config_file_when_loaded_then_values_applied() {
        let _guard = clear_env();
        let (_dir, path) = create_temp_config_file(
            r#"
            db_url = "/config/file/path.db"
            listen_addr = "0.0.0.0:9000"
            public_url = "https://marks.example.org/"
            csrf_key = "file-csrf"
            hmac_key = "file-hmac"
            session_ttl_days = 7
            "#,
        );

        let settings = load_settings(Some(&path)).unwrap();

        assert_eq!(settings.db_url, "/config/file/path.db");
        assert_eq!(settings.listen_addr, "0.0.0.0:9000");
        assert_eq!(settings.public_url, "https://marks.example.org");
        assert_eq!(settings.csrf_key.expose_secret(), "file-csrf");
        assert_eq!(settings.session_ttl_days, 7);
    }

    #[test]
    #[serial]
    fn given_environment_when_loaded_then_overrides_config_file() {
        let _guard = clear_env();
        let (_dir, path) = create_temp_config_file(
            r#"
            db_url = "/config/non-override.db"
            csrf_key = "file-csrf"
            hmac_key = "file-hmac"
            "#,
        );
        env::set_var("SPARKMARK_DB_URL", "/env/override.db");
        env::set_var("SPARKMARK_CSRF_KEY", "env-csrf");

        let settings = load_settings(Some(&path)).unwrap();

        assert_eq!(settings.db_url, "/env/override.db");
        assert_eq!(settings.csrf_key.expose_secret(), "env-csrf");
        assert_eq!(settings.hmac_key.expose_secret(), "file-hmac");
        assert_eq!(settings.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(settings.session_ttl_days, DEFAULT_SESSION_TTL_DAYS);
    }

    #[test]
    #[serial]
    fn given_missing_csrf_key_when_loaded_then_fatal() {
        let _guard = clear_env();
        let (_dir, path) = create_temp_config_file("hmac_key = \"file-hmac\"\n");

        let err = load_settings(Some(&path)).unwrap_err();

        assert!(matches!(err, DomainError::Configuration(ref m) if m.contains("csrf_key")));
    }

    #[test]
    #[serial]
    fn given_blank_hmac_key_when_loaded_then_fatal() {
        let _guard = clear_env();
        env::set_var("SPARKMARK_CSRF_KEY", "csrf");
        env::set_var("SPARKMARK_HMAC_KEY", "   ");
        let (_dir, path) = create_temp_config_file("");

        let err = load_settings(Some(&path)).unwrap_err();

        assert!(matches!(err, DomainError::Configuration(ref m) if m.contains("hmac_key")));
    }

    #[test]
    #[serial]
    fn given_malformed_or_missing_file_when_loaded_then_configuration_error() {
        let _guard = clear_env();
        let (dir, path) = create_temp_config_file("unknown_key = 1\n");

        assert!(matches!(
            load_settings(Some(&path)),
            Err(DomainError::Configuration(_))
        ));
        assert!(matches!(
            load_settings(Some(&dir.path().join("absent.toml"))),
            Err(DomainError::Configuration(_))
        ));
    }

    #[test]
    fn given_default_db_path_then_points_at_sparkmark_db() {
        assert!(default_db_path().ends_with("sparkmark.db"));
    }
}
