// src/cli/error.rs
use crate::application::error::ApplicationError;
use crate::domain::error::DomainError;
use crate::infrastructure::repositories::sqlite::error::SqliteRepositoryError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        match self {
            CliError::CommandFailed(msg) => {
                CliError::CommandFailed(format!("{}: {}", context.into(), msg))
            }
            CliError::Application(err) => CliError::Application(err.context(context)),
            err => CliError::CommandFailed(format!("{}: {}", context.into(), err)),
        }
    }

    /// Configuration problems exit differently from runtime failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CliError::Application(ApplicationError::Domain(DomainError::Configuration(_)))
        )
    }
}

impl From<DomainError> for CliError {
    fn from(err: DomainError) -> Self {
        CliError::Application(ApplicationError::Domain(err))
    }
}

impl From<SqliteRepositoryError> for CliError {
    fn from(err: SqliteRepositoryError) -> Self {
        CliError::Application(ApplicationError::Domain(err.into()))
    }
}

pub type CliResult<T> = Result<T, CliError>;
