// src/domain/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    // Bookmark validation
    #[error("URL required")]
    UrlRequired,

    #[error("invalid URL: {0}")]
    UrlInvalid(String),

    #[error("URL has no scheme")]
    UrlNoScheme,

    #[error("URL has no host")]
    UrlNoHost,

    #[error("URL already registered")]
    UrlAlreadyRegistered,

    #[error("title required")]
    TitleRequired,

    #[error("UID required")]
    UidRequired,

    #[error("invalid UID: {0}")]
    UidInvalid(String),

    #[error("user UUID required")]
    UserUuidRequired,

    #[error("tag name required")]
    TagNameRequired,

    #[error("tag name contains whitespace")]
    TagNameContainsWhitespace,

    #[error("new tag name equals current name")]
    TagNewNameEqualsCurrentName,

    #[error("invalid value for visibility: {0}")]
    VisibilityInvalid(String),

    #[error("invalid value for on-conflict strategy: {0}")]
    OnConflictStrategyInvalid(String),

    #[error("bookmark not found")]
    BookmarkNotFound,

    #[error("owner not found")]
    OwnerNotFound,

    // Pagination
    #[error("paginate: invalid page index (out of bounds)")]
    PageNumberOutOfBounds,

    #[error("paginate: invalid page number: {0}")]
    PageNumberInvalid(String),

    // Users
    #[error("user not found")]
    UserNotFound,

    #[error("display name required")]
    DisplayNameRequired,

    #[error("email required")]
    EmailRequired,

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("nickname required")]
    NickNameRequired,

    #[error("invalid nickname")]
    NickNameInvalid,

    #[error("nickname already registered")]
    NickNameAlreadyRegistered,

    #[error("password required")]
    PasswordRequired,

    #[error("password hash required")]
    PasswordHashRequired,

    #[error("incorrect password")]
    PasswordIncorrect,

    #[error("new password and confirmation do not match")]
    PasswordConfirmationMismatch,

    #[error("invalid credentials")]
    InvalidCredentials,

    // Sessions
    #[error("remember token required")]
    RememberTokenRequired,

    #[error("session not found")]
    SessionNotFound,

    // Feeds
    #[error("category name required")]
    CategoryNameRequired,

    #[error("category slug required")]
    CategorySlugRequired,

    #[error("category UUID required")]
    CategoryUuidRequired,

    #[error("invalid category UUID")]
    CategoryUuidInvalid,

    #[error("category already registered")]
    CategoryAlreadyRegistered,

    #[error("category not found")]
    CategoryNotFound,

    #[error("feed URL required")]
    FeedUrlRequired,

    #[error("invalid feed URL: {0}")]
    FeedUrlInvalid(String),

    #[error("feed URL scheme must be http or https")]
    FeedUrlUnsupportedScheme,

    #[error("feed not found")]
    FeedNotFound,

    #[error("subscription UUID required")]
    SubscriptionUuidRequired,

    #[error("subscription already registered")]
    SubscriptionAlreadyRegistered,

    #[error("subscription not found")]
    SubscriptionNotFound,

    #[error("entry not found")]
    EntryNotFound,

    #[error("invalid value for entry visibility: {0}")]
    EntryVisibilityInvalid(String),

    // Import and export
    #[error("invalid document format: {0}")]
    DocumentFormatInvalid(String),

    #[error("malformed document: {0}")]
    DocumentMalformed(String),

    // Store and runtime
    #[error("store conflict: {0}")]
    StoreConflict(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("random source failure: {0}")]
    Entropy(String),

    #[error("Failed to serialize: {0}")]
    SerializationError(String),

    #[error("Failed to deserialize: {0}")]
    DeserializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Prefixes opaque errors with a context string; typed kinds are returned unchanged
    /// so that callers can keep matching on them.
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        match self {
            DomainError::RepositoryError(msg) => {
                DomainError::RepositoryError(format!("{}: {}", context.into(), msg))
            }
            DomainError::StoreConflict(msg) => {
                DomainError::StoreConflict(format!("{}: {}", context.into(), msg))
            }
            DomainError::SerializationError(msg) => {
                DomainError::SerializationError(format!("{}: {}", context.into(), msg))
            }
            DomainError::DeserializationError(msg) => {
                DomainError::DeserializationError(format!("{}: {}", context.into(), msg))
            }
            DomainError::Io(err) => DomainError::Other(format!("{}: {}", context.into(), err)),
            DomainError::Other(msg) => DomainError::Other(format!("{}: {}", context.into(), msg)),
            err => err,
        }
    }

    /// Whether this error is one of the validation kinds that a form surfaces to the user.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::UrlRequired
                | DomainError::UrlInvalid(_)
                | DomainError::UrlNoScheme
                | DomainError::UrlNoHost
                | DomainError::TitleRequired
                | DomainError::UidRequired
                | DomainError::UidInvalid(_)
                | DomainError::UserUuidRequired
                | DomainError::TagNameRequired
                | DomainError::TagNameContainsWhitespace
                | DomainError::TagNewNameEqualsCurrentName
                | DomainError::VisibilityInvalid(_)
                | DomainError::OnConflictStrategyInvalid(_)
                | DomainError::PageNumberInvalid(_)
                | DomainError::DisplayNameRequired
                | DomainError::EmailRequired
                | DomainError::NickNameRequired
                | DomainError::NickNameInvalid
                | DomainError::PasswordRequired
                | DomainError::PasswordHashRequired
                | DomainError::PasswordIncorrect
                | DomainError::PasswordConfirmationMismatch
                | DomainError::RememberTokenRequired
                | DomainError::CategoryNameRequired
                | DomainError::CategorySlugRequired
                | DomainError::CategoryUuidRequired
                | DomainError::CategoryUuidInvalid
                | DomainError::FeedUrlRequired
                | DomainError::FeedUrlInvalid(_)
                | DomainError::FeedUrlUnsupportedScheme
                | DomainError::SubscriptionUuidRequired
                | DomainError::EntryVisibilityInvalid(_)
                | DomainError::DocumentFormatInvalid(_)
                | DomainError::DocumentMalformed(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::UrlAlreadyRegistered
                | DomainError::EmailAlreadyRegistered
                | DomainError::NickNameAlreadyRegistered
                | DomainError::CategoryAlreadyRegistered
                | DomainError::SubscriptionAlreadyRegistered
                | DomainError::StoreConflict(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::BookmarkNotFound
                | DomainError::OwnerNotFound
                | DomainError::UserNotFound
                | DomainError::SessionNotFound
                | DomainError::CategoryNotFound
                | DomainError::FeedNotFound
                | DomainError::SubscriptionNotFound
                | DomainError::EntryNotFound
                | DomainError::PageNumberOutOfBounds
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::DeserializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_repository_error_when_context_then_message_is_prefixed() {
        let err = DomainError::RepositoryError("disk full".to_string()).context("adding bookmark");
        assert_eq!(err.to_string(), "Repository error: adding bookmark: disk full");
    }

    #[test]
    fn given_typed_error_when_context_then_kind_is_preserved() {
        let err = DomainError::UrlAlreadyRegistered.context("adding bookmark");
        assert!(matches!(err, DomainError::UrlAlreadyRegistered));
    }

    #[test]
    fn given_error_kinds_when_classified_then_buckets_are_disjoint() {
        assert!(DomainError::TitleRequired.is_validation());
        assert!(!DomainError::TitleRequired.is_conflict());
        assert!(DomainError::UrlAlreadyRegistered.is_conflict());
        assert!(DomainError::OwnerNotFound.is_not_found());
        assert!(!DomainError::Cancelled.is_not_found());
    }
}
