// src/application/services/user_service.rs
use std::fmt::Debug;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::error::ApplicationResult;
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::repositories::user_repository::UserRepository;
use crate::domain::user::{normalize_email, validate_nick_name, InfoUpdate, PasswordUpdate, User};
use crate::util::password::{hash_password, verify_password};

/// Service interface for user accounts
pub trait UserService: Send + Sync + Debug {
    /// Register a user; the clear password is hashed and never stored
    fn add(&self, ctx: &RequestContext, user: User) -> ApplicationResult<User>;

    /// Check an email/password pair; unknown emails and wrong passwords are indistinguishable
    fn authenticate(&self, ctx: &RequestContext, email: &str, password: &str)
        -> ApplicationResult<User>;

    fn all(&self, ctx: &RequestContext) -> ApplicationResult<Vec<User>>;

    fn by_uuid(&self, ctx: &RequestContext, uuid: &str) -> ApplicationResult<User>;

    fn by_nick_name(&self, ctx: &RequestContext, nick_name: &str) -> ApplicationResult<User>;

    fn update_info(&self, ctx: &RequestContext, info: InfoUpdate) -> ApplicationResult<()>;

    fn update_password(&self, ctx: &RequestContext, update: PasswordUpdate)
        -> ApplicationResult<()>;

    /// Delete a user and everything they own
    fn delete_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> ApplicationResult<()>;
}

#[derive(Debug)]
pub struct UserServiceImpl<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserServiceImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Names the unique field a store conflict came from.
    fn conflict_kind(&self, ctx: &RequestContext, email: &str, uuid: &str) -> DomainError {
        match self
            .repository
            .is_email_registered_to_another_user(ctx, email, uuid)
        {
            Ok(true) => DomainError::EmailAlreadyRegistered,
            Ok(false) => DomainError::NickNameAlreadyRegistered,
            Err(e) => e,
        }
    }
}

impl<R: UserRepository> UserService for UserServiceImpl<R> {
    #[instrument(skip(self, ctx, user), level = "debug", fields(nick_name = %user.nick_name))]
    fn add(&self, ctx: &RequestContext, mut user: User) -> ApplicationResult<User> {
        let now = Utc::now();
        user.uuid = Uuid::new_v4().to_string();
        user.created_at = now;
        user.updated_at = now;

        user.normalize();
        user.validate_fields()?;
        if user.password.is_empty() {
            return Err(DomainError::PasswordRequired.into());
        }

        if self.repository.is_email_registered(ctx, &user.email)? {
            return Err(DomainError::EmailAlreadyRegistered.into());
        }
        if self.repository.is_nick_name_registered(ctx, &user.nick_name)? {
            return Err(DomainError::NickNameAlreadyRegistered.into());
        }

        user.password_hash = hash_password(&user.password)?;
        user.password.clear();

        self.repository.add(ctx, &user).map_err(|e| match e {
            DomainError::StoreConflict(_) => self.conflict_kind(ctx, &user.email, &user.uuid),
            other => other,
        })?;
        debug!("Added user {}", user.uuid);
        Ok(user)
    }

    #[instrument(skip(self, ctx, password), level = "debug")]
    fn authenticate(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> ApplicationResult<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(DomainError::EmailRequired.into());
        }
        if password.is_empty() {
            return Err(DomainError::PasswordRequired.into());
        }

        let Some(user) = self.repository.get_by_email(ctx, &email)? else {
            return Err(DomainError::InvalidCredentials.into());
        };
        if !verify_password(password, &user.password_hash)? {
            return Err(DomainError::InvalidCredentials.into());
        }
        Ok(user)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn all(&self, ctx: &RequestContext) -> ApplicationResult<Vec<User>> {
        Ok(self.repository.get_all(ctx)?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn by_uuid(&self, ctx: &RequestContext, uuid: &str) -> ApplicationResult<User> {
        self.repository
            .get_by_uuid(ctx, uuid)?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn by_nick_name(&self, ctx: &RequestContext, nick_name: &str) -> ApplicationResult<User> {
        self.repository
            .get_by_nick_name(ctx, nick_name)?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn update_info(&self, ctx: &RequestContext, mut info: InfoUpdate) -> ApplicationResult<()> {
        info.normalize();
        if info.email.is_empty() {
            return Err(DomainError::EmailRequired.into());
        }
        validate_nick_name(&info.nick_name)?;
        if info.display_name.is_empty() {
            return Err(DomainError::DisplayNameRequired.into());
        }

        if self
            .repository
            .is_email_registered_to_another_user(ctx, &info.email, &info.uuid)?
        {
            return Err(DomainError::EmailAlreadyRegistered.into());
        }
        if self
            .repository
            .is_nick_name_registered_to_another_user(ctx, &info.nick_name, &info.uuid)?
        {
            return Err(DomainError::NickNameAlreadyRegistered.into());
        }

        self.repository
            .update_info(ctx, &info, Utc::now())
            .map_err(|e| match e {
                DomainError::StoreConflict(_) => self.conflict_kind(ctx, &info.email, &info.uuid),
                other => other,
            })?;
        Ok(())
    }

    #[instrument(skip(self, ctx, update), level = "debug", fields(uuid = %update.uuid))]
    fn update_password(
        &self,
        ctx: &RequestContext,
        update: PasswordUpdate,
    ) -> ApplicationResult<()> {
        if update.current_password.is_empty() || update.new_password.is_empty() {
            return Err(DomainError::PasswordRequired.into());
        }
        if update.new_password != update.new_password_confirmation {
            return Err(DomainError::PasswordConfirmationMismatch.into());
        }

        let user = self.by_uuid(ctx, &update.uuid)?;
        if !verify_password(&update.current_password, &user.password_hash)? {
            return Err(DomainError::PasswordIncorrect.into());
        }

        let password_hash = hash_password(&update.new_password)?;
        self.repository
            .update_password_hash(ctx, &user.uuid, &password_hash, Utc::now())?;
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn delete_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> ApplicationResult<()> {
        if !self.repository.delete_by_uuid(ctx, uuid)? {
            return Err(DomainError::UserNotFound.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::ApplicationError;
    use crate::infrastructure::repositories::memory::{MemoryDatabase, MemoryUserRepository};

    fn create_test_service() -> UserServiceImpl<MemoryUserRepository> {
        let repository = MemoryUserRepository::new(Arc::new(MemoryDatabase::new()));
        UserServiceImpl::new(Arc::new(repository))
    }

    fn kind(err: ApplicationError) -> DomainError {
        match err {
            ApplicationError::Domain(e) => e,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_new_user_when_added_then_normalized_and_password_hashed() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();

        let user = service
            .add(&ctx, User::new(" Ann@Example.org ", "ann", " Ann ", "s3cret"))
            .unwrap();

        assert!(Uuid::parse_str(&user.uuid).is_ok());
        assert_eq!(user.email, "ann@example.org");
        assert_eq!(user.display_name, "Ann");
        assert!(user.password.is_empty());
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn given_taken_email_or_nickname_when_added_then_conflict() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        service
            .add(&ctx, User::new("ann@example.org", "ann", "Ann", "pw"))
            .unwrap();

        let email = service
            .add(&ctx, User::new("ANN@example.org", "other", "Other", "pw"))
            .unwrap_err();
        let nick = service
            .add(&ctx, User::new("other@example.org", "ann", "Other", "pw"))
            .unwrap_err();

        assert!(matches!(kind(email), DomainError::EmailAlreadyRegistered));
        assert!(matches!(kind(nick), DomainError::NickNameAlreadyRegistered));
    }

    #[test]
    fn given_invalid_nickname_when_added_then_rejected() {
        let service = create_test_service();
        let err = service
            .add(
                &RequestContext::anonymous(),
                User::new("ann@example.org", "ann smith", "Ann", "pw"),
            )
            .unwrap_err();

        assert!(matches!(kind(err), DomainError::NickNameInvalid));
    }

    #[test]
    fn given_credentials_when_authenticating_then_only_exact_password_passes() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        service
            .add(&ctx, User::new("ann@example.org", "ann", "Ann", "s3cret"))
            .unwrap();

        assert!(service.authenticate(&ctx, "Ann@Example.org", "s3cret").is_ok());
        assert!(matches!(
            kind(service.authenticate(&ctx, "ann@example.org", "wrong").unwrap_err()),
            DomainError::InvalidCredentials
        ));
        assert!(matches!(
            kind(service.authenticate(&ctx, "bob@example.org", "s3cret").unwrap_err()),
            DomainError::InvalidCredentials
        ));
    }

    #[test]
    fn given_password_update_when_current_wrong_or_mismatch_then_rejected() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        let user = service
            .add(&ctx, User::new("ann@example.org", "ann", "Ann", "old"))
            .unwrap();

        let update = |current: &str, new: &str, confirm: &str| PasswordUpdate {
            uuid: user.uuid.clone(),
            current_password: current.to_string(),
            new_password: new.to_string(),
            new_password_confirmation: confirm.to_string(),
        };

        assert!(matches!(
            kind(service.update_password(&ctx, update("bad", "new", "new")).unwrap_err()),
            DomainError::PasswordIncorrect
        ));
        assert!(matches!(
            kind(service.update_password(&ctx, update("old", "new", "other")).unwrap_err()),
            DomainError::PasswordConfirmationMismatch
        ));

        service.update_password(&ctx, update("old", "new", "new")).unwrap();
        assert!(service.authenticate(&ctx, "ann@example.org", "new").is_ok());
    }

    #[test]
    fn given_other_users_email_when_info_updated_then_conflict() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        service
            .add(&ctx, User::new("ann@example.org", "ann", "Ann", "pw"))
            .unwrap();
        let bob = service
            .add(&ctx, User::new("bob@example.org", "bob", "Bob", "pw"))
            .unwrap();

        let err = service
            .update_info(
                &ctx,
                InfoUpdate {
                    uuid: bob.uuid.clone(),
                    email: "ann@example.org".to_string(),
                    nick_name: "bob".to_string(),
                    display_name: "Bob".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(kind(err), DomainError::EmailAlreadyRegistered));

        service
            .update_info(
                &ctx,
                InfoUpdate {
                    uuid: bob.uuid.clone(),
                    email: "bob@example.org".to_string(),
                    nick_name: "bobby".to_string(),
                    display_name: "Bobby".to_string(),
                },
            )
            .unwrap();
        assert_eq!(service.by_nick_name(&ctx, "bobby").unwrap().uuid, bob.uuid);
    }

    #[test]
    fn given_unknown_user_when_deleted_then_not_found() {
        let service = create_test_service();
        let err = service
            .delete_by_uuid(&RequestContext::anonymous(), "missing")
            .unwrap_err();

        assert!(matches!(kind(err), DomainError::UserNotFound));
    }
}
