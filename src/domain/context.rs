// src/domain/context.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::user::User;

/// Shared cancellation signal.
///
/// Clones observe the same flag, so the HTTP layer can hold one half and
/// cancel it when the client goes away while a store call runs on a
/// blocking thread with the other half.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns a guard that cancels the signal when dropped unless disarmed.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            cancellation: self.clone(),
            armed: true,
        }
    }
}

#[derive(Debug)]
pub struct CancelOnDrop {
    cancellation: Cancellation,
    armed: bool,
}

impl CancelOnDrop {
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.cancellation.cancel();
        }
    }
}

/// Per-request context: the authenticated user, if any, plus the
/// cancellation signal and optional deadline every store call honours.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    user: Option<User>,
    cancellation: Cancellation,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: User) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: Option<User>) -> Self {
        self.user = user;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Fails with `Cancelled` once the request has been cancelled or its deadline passed.
    pub fn ensure_active(&self) -> DomainResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(DomainError::Cancelled);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_fresh_context_when_ensure_active_then_ok() {
        let ctx = RequestContext::anonymous();
        assert!(ctx.ensure_active().is_ok());
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn given_cancelled_signal_when_ensure_active_then_cancelled() {
        let cancellation = Cancellation::new();
        let ctx = RequestContext::anonymous().with_cancellation(cancellation.clone());

        cancellation.cancel();

        assert!(matches!(ctx.ensure_active(), Err(DomainError::Cancelled)));
    }

    #[test]
    fn given_elapsed_deadline_when_ensure_active_then_cancelled() {
        let ctx = RequestContext::anonymous().with_timeout(Duration::from_millis(0));
        assert!(matches!(ctx.ensure_active(), Err(DomainError::Cancelled)));
    }

    #[test]
    fn given_guard_when_dropped_armed_then_signal_fires() {
        let cancellation = Cancellation::new();
        {
            let _guard = cancellation.guard();
        }
        assert!(cancellation.is_cancelled());

        let other = Cancellation::new();
        other.guard().disarm();
        assert!(!other.is_cancelled());
    }
}
