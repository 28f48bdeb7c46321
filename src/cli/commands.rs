// src/cli/commands.rs
use tokio::runtime::Runtime;
use tracing::{info, instrument};

use crate::cli::error::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::context::RequestContext;
use crate::domain::user::User;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::repositories::sqlite::migration::run_pending_migrations;
use crate::infrastructure::repositories::sqlite::open_pool;
use crate::infrastructure::web::{serve, ServerOptions};
use crate::util::rand::random_base64_url_string;

/// Entropy of generated admin passwords, in bytes.
const ADMIN_PASSWORD_BYTES: usize = 24;

#[instrument(skip(settings), level = "debug")]
pub fn run(settings: &Settings, listen: Option<String>) -> CliResult<()> {
    let container = ServiceContainer::new(settings)?;
    let options = ServerOptions::builder()
        .csrf(container.csrf_service.clone())
        .public_url(settings.public_url.clone())
        .container(container)
        .build()
        .map_err(crate::domain::error::DomainError::from)?;
    let listen_addr = listen.unwrap_or_else(|| settings.listen_addr.clone());

    let rt = Runtime::new().map_err(|e| CliError::CommandFailed(format!("async runtime: {}", e)))?;
    rt.block_on(serve(options, &listen_addr))?;
    Ok(())
}

#[instrument(skip(settings), level = "debug")]
pub fn migrate(settings: &Settings) -> CliResult<()> {
    let pool = open_pool(&settings.db_url)?;
    let applied = run_pending_migrations(&pool)?;
    if applied.is_empty() {
        eprintln!("Database {} is up to date", settings.db_url);
    } else {
        for name in &applied {
            eprintln!("Applied {}", name);
        }
    }
    Ok(())
}

/// Prints the generated password on stdout; it is not recoverable afterwards.
#[instrument(skip(settings), level = "debug")]
pub fn create_admin(
    settings: &Settings,
    email: &str,
    nickname: &str,
    displayname: &str,
) -> CliResult<()> {
    let container = ServiceContainer::new(settings)?;
    let password = random_base64_url_string(ADMIN_PASSWORD_BYTES)?;
    let user = User::new(email, nickname, displayname, password.clone()).with_admin(true);

    let user = container
        .user_service
        .add(&RequestContext::anonymous(), user)
        .map_err(|e| CliError::Application(e).context("creating admin"))?;
    info!(uuid = %user.uuid, "admin user created");

    eprintln!("Created admin {} <{}>", user.nick_name, user.email);
    println!("{}", password);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::ApplicationError;
    use crate::util::testing::{test_settings, TestDatabase};
    use serial_test::serial;

    #[test]
    #[serial]
    fn given_fresh_database_when_creating_admin_then_user_can_log_in_as_admin() {
        let db = TestDatabase::new();
        let mut settings = test_settings();
        settings.db_url = db.url.clone();

        create_admin(&settings, "root@example.org", "root", "Root").unwrap();

        let container = ServiceContainer::new(&settings).unwrap();
        let users = container.user_service.all(&RequestContext::anonymous()).unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_admin);
        assert_eq!(users[0].nick_name, "root");
    }

    #[test]
    #[serial]
    fn given_migrated_database_when_migrating_again_then_noop() {
        let db = TestDatabase::new();
        let mut settings = test_settings();
        settings.db_url = db.url.clone();

        migrate(&settings).unwrap();
        migrate(&settings).unwrap();
    }

    #[test]
    #[serial]
    fn given_duplicate_nickname_when_creating_admin_then_error() {
        let db = TestDatabase::new();
        let mut settings = test_settings();
        settings.db_url = db.url.clone();

        create_admin(&settings, "a@example.org", "root", "Root").unwrap();
        let err = create_admin(&settings, "b@example.org", "root", "Root").unwrap_err();
        assert!(matches!(
            err,
            CliError::Application(ApplicationError::Domain(ref d)) if d.is_conflict()
        ));
    }
}
