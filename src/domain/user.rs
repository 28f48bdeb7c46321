// src/domain/user.rs
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::domain::error::{DomainError, DomainResult};

/// A registered user.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub uuid: String,
    /// Login identifier, stored lowercase.
    pub email: String,
    /// Handle used in public URLs.
    pub nick_name: String,
    pub display_name: String,
    /// Clear-text password; only set while adding a user, cleared once hashed.
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("uuid", &self.uuid)
            .field("email", &self.email)
            .field("nick_name", &self.nick_name)
            .field("display_name", &self.display_name)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

impl User {
    pub fn new(
        email: impl Into<String>,
        nick_name: impl Into<String>,
        display_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid: String::new(),
            email: email.into(),
            nick_name: nick_name.into(),
            display_name: display_name.into(),
            password: password.into(),
            password_hash: String::new(),
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
        self.nick_name = self.nick_name.trim().to_string();
        self.display_name = self.display_name.trim().to_string();
    }

    pub fn validate_fields(&self) -> DomainResult<()> {
        if self.email.is_empty() {
            return Err(DomainError::EmailRequired);
        }
        validate_nick_name(&self.nick_name)?;
        if self.display_name.is_empty() {
            return Err(DomainError::DisplayNameRequired);
        }
        Ok(())
    }

    pub fn owner(&self) -> Owner {
        Owner {
            uuid: self.uuid.clone(),
            nick_name: self.nick_name.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn nick_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("nickname pattern is valid"))
}

pub fn validate_nick_name(nick_name: &str) -> DomainResult<()> {
    if nick_name.is_empty() {
        return Err(DomainError::NickNameRequired);
    }
    if !nick_name_regex().is_match(nick_name) {
        return Err(DomainError::NickNameInvalid);
    }
    Ok(())
}

/// Public view of a user: handle and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    pub uuid: String,
    pub nick_name: String,
    pub display_name: String,
}

/// Account information change requested by an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoUpdate {
    pub uuid: String,
    pub email: String,
    pub nick_name: String,
    pub display_name: String,
}

impl InfoUpdate {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
        self.nick_name = self.nick_name.trim().to_string();
        self.display_name = self.display_name.trim().to_string();
    }
}

/// Password change requested by an authenticated user.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordUpdate {
    pub uuid: String,
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

impl std::fmt::Debug for PasswordUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordUpdate")
            .field("uuid", &self.uuid)
            .finish_non_exhaustive()
    }
}
