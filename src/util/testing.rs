// src/util/testing.rs

use std::env;
use std::sync::OnceLock;

use chrono::Utc;
use secrecy::SecretString;
use tempfile::TempDir;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};
use uuid::Uuid;

use crate::config::Settings;
use crate::domain::context::RequestContext;
use crate::domain::repositories::user_repository::UserRepository;
use crate::domain::user::User;
use crate::infrastructure::repositories::sqlite::{init_pool, ConnectionPool, SqliteUserRepository};

/// Environment variables read by `Settings`; saved and restored by [`EnvGuard`].
const SETTINGS_VARS: [&str; 5] = [
    "SPARKMARK_DB_URL",
    "SPARKMARK_LISTEN_ADDR",
    "SPARKMARK_PUBLIC_URL",
    "SPARKMARK_CSRF_KEY",
    "SPARKMARK_HMAC_KEY",
];

/// Stand-in PHC string for users created directly in the store.
pub const TEST_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dGVzdHNhbHR0ZXN0c2FsdA$0000000000000000000000000000000000000000000";

static TEST_ENV: OnceLock<()> = OnceLock::new();

/// Sets up test logging exactly once per process.
pub fn init_test_env() {
    TEST_ENV.get_or_init(|| {
        setup_test_logging();
        info!("Test environment initialized");
    });
}

fn setup_test_logging() {
    debug!("Attempting logger init from testing.rs");
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
        return;
    }

    let noisy_modules = ["html5ever", "hyper", "hyper_util", "mio", "tower"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    subscriber.try_init().unwrap_or_else(|e| {
        eprintln!("Error: Failed to set up logging: {}", e);
    });
}

/// Restores the `SPARKMARK_*` environment on drop.
#[derive(Debug, Clone)]
pub struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl Default for EnvGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            saved: SETTINGS_VARS
                .iter()
                .map(|name| (*name, env::var(name).ok()))
                .collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(v) => env::set_var(name, v),
                None => env::remove_var(name),
            }
        }
    }
}

/// Settings with fixed keys; `db_url` is unused by in-memory containers.
pub fn test_settings() -> Settings {
    Settings {
        db_url: String::new(),
        listen_addr: "127.0.0.1:0".to_string(),
        public_url: "https://marks.example.org".to_string(),
        csrf_key: SecretString::from("test-csrf-key"),
        hmac_key: SecretString::from("test-hmac-key"),
        session_ttl_days: crate::domain::session::DEFAULT_SESSION_TTL_DAYS,
    }
}

/// A migrated SQLite database in a temporary directory, removed on drop.
#[derive(Debug)]
pub struct TestDatabase {
    pub pool: ConnectionPool,
    pub url: String,
    _dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        init_test_env();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = dir.path().join("sparkmark.db").to_string_lossy().into_owned();
        let pool = init_pool(&url).expect("Failed to initialize test database");
        Self {
            pool,
            url,
            _dir: dir,
        }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Stores a user named after `nick_name` straight into the SQLite store.
pub fn sqlite_user(pool: &ConnectionPool, nick_name: &str) -> User {
    let now = Utc::now();
    let user = User {
        uuid: Uuid::new_v4().to_string(),
        email: format!("{}@example.org", nick_name),
        nick_name: nick_name.to_string(),
        display_name: nick_name.to_string(),
        password: String::new(),
        password_hash: TEST_PASSWORD_HASH.to_string(),
        is_admin: false,
        created_at: now,
        updated_at: now,
    };
    SqliteUserRepository::new(pool.clone())
        .add(&RequestContext::anonymous(), &user)
        .expect("Failed to store test user");
    user
}
