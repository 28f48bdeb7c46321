// src/application/services/csrf_service.rs
//! Stateless per-action CSRF tokens.
//!
//! A token is `base64url(HMAC-SHA256(key, "{user}:{action}:{millis}")):{millis}`,
//! so it binds the user, the form action and the issue time without any
//! server-side storage.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_CSRF_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Form actions a token can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrfAction {
    AccountUpdate,
    AccountPreferencesUpdate,
    AdminUserAdd,
    AdminUserDelete,
    BookmarkAdd,
    BookmarkEdit,
    BookmarkDelete,
    FeedSubscriptionAdd,
    FeedSubscriptionEdit,
    FeedSubscriptionDelete,
    FeedCategoryAdd,
    FeedCategoryEdit,
    FeedCategoryDelete,
    FeedEntryMetadataEdit,
    ToolsBookmarkExport,
    ToolsBookmarkImport,
    ToolsFeedExport,
    ToolsFeedImport,
}

impl CsrfAction {
    pub const ALL: [CsrfAction; 18] = [
        CsrfAction::AccountUpdate,
        CsrfAction::AccountPreferencesUpdate,
        CsrfAction::AdminUserAdd,
        CsrfAction::AdminUserDelete,
        CsrfAction::BookmarkAdd,
        CsrfAction::BookmarkEdit,
        CsrfAction::BookmarkDelete,
        CsrfAction::FeedSubscriptionAdd,
        CsrfAction::FeedSubscriptionEdit,
        CsrfAction::FeedSubscriptionDelete,
        CsrfAction::FeedCategoryAdd,
        CsrfAction::FeedCategoryEdit,
        CsrfAction::FeedCategoryDelete,
        CsrfAction::FeedEntryMetadataEdit,
        CsrfAction::ToolsBookmarkExport,
        CsrfAction::ToolsBookmarkImport,
        CsrfAction::ToolsFeedExport,
        CsrfAction::ToolsFeedImport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CsrfAction::AccountUpdate => "account-update",
            CsrfAction::AccountPreferencesUpdate => "account-preferences-update",
            CsrfAction::AdminUserAdd => "admin-user-add",
            CsrfAction::AdminUserDelete => "admin-user-delete",
            CsrfAction::BookmarkAdd => "bookmark-add",
            CsrfAction::BookmarkEdit => "bookmark-edit",
            CsrfAction::BookmarkDelete => "bookmark-delete",
            CsrfAction::FeedSubscriptionAdd => "feed-subscription-add",
            CsrfAction::FeedSubscriptionEdit => "feed-subscription-edit",
            CsrfAction::FeedSubscriptionDelete => "feed-subscription-delete",
            CsrfAction::FeedCategoryAdd => "feed-category-add",
            CsrfAction::FeedCategoryEdit => "feed-category-edit",
            CsrfAction::FeedCategoryDelete => "feed-category-delete",
            CsrfAction::FeedEntryMetadataEdit => "feed-entry-metadata-edit",
            CsrfAction::ToolsBookmarkExport => "tools-bookmark-export",
            CsrfAction::ToolsBookmarkImport => "tools-bookmark-import",
            CsrfAction::ToolsFeedExport => "tools-feed-export",
            CsrfAction::ToolsFeedImport => "tools-feed-import",
        }
    }
}

impl fmt::Display for CsrfAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CsrfAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CsrfAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DomainError::Other(format!("unknown CSRF action: {}", s)))
    }
}

/// Issues and checks CSRF tokens with a process-wide key.
#[derive(Clone)]
pub struct CsrfService {
    key: SecretString,
    timeout: Duration,
}

impl fmt::Debug for CsrfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// `:` separates the signed fields, so it may not appear inside one.
fn clean(field: &str) -> String {
    field.replace(':', "_")
}

impl CsrfService {
    pub fn new(key: SecretString) -> DomainResult<Self> {
        if key.expose_secret().is_empty() {
            return Err(DomainError::Other("CSRF key must not be empty".to_string()));
        }
        Ok(Self {
            key,
            timeout: DEFAULT_CSRF_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn mac(&self, user_uuid: &str, action: CsrfAction, millis: i64) -> DomainResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| DomainError::Other(format!("invalid CSRF key: {}", e)))?;
        mac.update(format!("{}:{}:{}", clean(user_uuid), clean(action.as_str()), millis).as_bytes());
        Ok(mac)
    }

    pub fn generate(&self, user_uuid: &str, action: CsrfAction) -> DomainResult<String> {
        self.generate_at(user_uuid, action, Utc::now())
    }

    pub fn generate_at(
        &self,
        user_uuid: &str,
        action: CsrfAction,
        at: DateTime<Utc>,
    ) -> DomainResult<String> {
        let millis = at.timestamp_millis();
        let tag = self.mac(user_uuid, action, millis)?.finalize().into_bytes();
        Ok(format!("{}:{}", URL_SAFE_NO_PAD.encode(tag), millis))
    }

    pub fn validate(&self, token: &str, user_uuid: &str, action: CsrfAction) -> bool {
        self.validate_at(token, user_uuid, action, Utc::now())
    }

    /// Every failure collapses to `false`; the reason is only logged.
    #[instrument(skip(self, token), level = "debug")]
    pub fn validate_at(
        &self,
        token: &str,
        user_uuid: &str,
        action: CsrfAction,
        now: DateTime<Utc>,
    ) -> bool {
        let Some((encoded, millis)) = token.rsplit_once(':') else {
            debug!("malformed CSRF token");
            return false;
        };
        let Ok(millis) = millis.parse::<i64>() else {
            debug!("malformed CSRF token timestamp");
            return false;
        };
        let Some(issued_at) = DateTime::<Utc>::from_timestamp_millis(millis) else {
            debug!("CSRF token timestamp out of range");
            return false;
        };
        let timeout = chrono::Duration::from_std(self.timeout).unwrap_or(chrono::Duration::MAX);
        if now.signed_duration_since(issued_at) >= timeout {
            debug!("expired CSRF token");
            return false;
        }
        let Ok(tag) = URL_SAFE_NO_PAD.decode(encoded) else {
            debug!("malformed CSRF token encoding");
            return false;
        };
        match self.mac(user_uuid, action, millis) {
            Ok(mac) => mac.verify_slice(&tag).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U1: &str = "6f1d0b8e-3c42-4d2f-a1b2-0c9e8d7f6a51";
    const U2: &str = "7a2e1c9f-4d53-4e3a-b2c3-1d0f9e8a7b62";

    fn service() -> CsrfService {
        CsrfService::new(SecretString::from("test-csrf-key".to_string())).unwrap()
    }

    #[test]
    fn given_token_when_validated_then_bound_to_user_and_action() {
        let csrf = service();
        let token = csrf.generate(U1, CsrfAction::BookmarkAdd).unwrap();

        assert!(csrf.validate(&token, U1, CsrfAction::BookmarkAdd));
        assert!(!csrf.validate(&token, U1, CsrfAction::BookmarkEdit));
        assert!(!csrf.validate(&token, U2, CsrfAction::BookmarkAdd));
    }

    #[test]
    fn given_token_for_each_action_when_cross_validated_then_only_own_action_passes() {
        let csrf = service();
        for action in CsrfAction::ALL {
            let token = csrf.generate(U1, action).unwrap();
            for other in CsrfAction::ALL {
                assert_eq!(csrf.validate(&token, U1, other), action == other);
            }
        }
    }

    #[test]
    fn given_old_token_when_validated_then_expired() {
        let csrf = service();
        let issued = Utc::now();
        let token = csrf.generate_at(U1, CsrfAction::BookmarkDelete, issued).unwrap();

        let just_before = issued + chrono::Duration::minutes(59);
        let just_after = issued + chrono::Duration::minutes(60) + chrono::Duration::milliseconds(1);

        assert!(csrf.validate_at(&token, U1, CsrfAction::BookmarkDelete, just_before));
        assert!(!csrf.validate_at(&token, U1, CsrfAction::BookmarkDelete, just_after));
    }

    #[test]
    fn given_malformed_tokens_when_validated_then_invalid() {
        let csrf = service();
        for token in ["", "abc", "abc:def", "!!!:123", ":"] {
            assert!(!csrf.validate(token, U1, CsrfAction::BookmarkAdd), "{token:?}");
        }
    }

    #[test]
    fn given_other_key_when_validated_then_invalid() {
        let token = service().generate(U1, CsrfAction::ToolsFeedImport).unwrap();
        let other = CsrfService::new(SecretString::from("other-key".to_string())).unwrap();

        assert!(!other.validate(&token, U1, CsrfAction::ToolsFeedImport));
    }

    #[test]
    fn given_colon_in_user_when_generated_then_fields_cannot_be_shifted() {
        let csrf = service();
        let token = csrf.generate("a:b", CsrfAction::BookmarkAdd).unwrap();

        assert!(csrf.validate(&token, "a_b", CsrfAction::BookmarkAdd));
        assert_eq!(token.matches(':').count(), 1);
    }

    #[test]
    fn given_action_names_when_parsed_then_round_trip() {
        for action in CsrfAction::ALL {
            assert_eq!(action.as_str().parse::<CsrfAction>().unwrap(), action);
        }
        assert!("bookmark-import".parse::<CsrfAction>().is_err());
    }

    #[test]
    fn given_empty_key_when_created_then_rejected() {
        assert!(CsrfService::new(SecretString::from(String::new())).is_err());
    }
}
