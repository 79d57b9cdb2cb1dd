//! Cooperative interruption of long-running store operations.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

/// Why an operation stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interruption {
    /// The caller went away or asked to stop.
    Cancelled,
    /// The caller's deadline passed.
    DeadlineExceeded,
}

/// A signal polled between units of work.
///
/// Nothing is ever interrupted mid-unit; implementations only report whether
/// the next unit should be skipped.
pub trait Interrupt: Send + Sync {
    /// Returns the reason to stop, or `None` to keep going.
    fn check(&self) -> Option<Interruption>;
}

impl Interrupt for CancellationToken {
    fn check(&self) -> Option<Interruption> {
        self.is_cancelled().then_some(Interruption::Cancelled)
    }
}

/// The lifetime of one remote call: cancelled explicitly or by its deadline.
#[derive(Clone, Debug, Default)]
pub struct CallScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallScope {
    /// Create a scope that expires at `deadline`, if any.
    pub fn new(deadline: Option<Instant>) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline,
        }
    }

    /// The token that cancels this scope. Cancelling a clone cancels the scope.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the scope.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Interrupt for CallScope {
    fn check(&self) -> Option<Interruption> {
        if self.token.is_cancelled() {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(Interruption::DeadlineExceeded),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_scope_without_deadline_runs_until_cancelled() {
        let scope = CallScope::new(None);
        assert_eq!(scope.check(), None);

        scope.token().cancel();
        assert_eq!(scope.check(), Some(Interruption::Cancelled));
    }

    #[test]
    fn test_scope_reports_expired_deadline() {
        let past = Instant::now() - Duration::from_millis(1);
        assert_eq!(
            CallScope::new(Some(past)).check(),
            Some(Interruption::DeadlineExceeded)
        );

        let future = Instant::now() + Duration::from_secs(60);
        assert_eq!(CallScope::new(Some(future)).check(), None);
    }

    #[test]
    fn test_cancellation_wins_over_deadline() {
        let scope = CallScope::new(Some(Instant::now() - Duration::from_millis(1)));
        scope.cancel();
        assert_eq!(scope.check(), Some(Interruption::Cancelled));
    }
}
