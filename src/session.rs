//! Per-session access gate for the data editing menu.
//!
//! A shared secret compared in plaintext flips the session into editing
//! mode. It is a convenience lock for a single admin editor, not an
//! authentication system.

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Granted,
    Denied,
    /// Nothing typed; leave the gate as it was.
    Blank,
    /// No secret configured, so editing stays closed.
    Disabled,
}

#[derive(Debug, Default)]
pub struct EditSession {
    authorized: bool,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn unlock(&mut self, attempt: &str, secret: Option<&str>) -> GateOutcome {
        let Some(secret) = secret.filter(|s| !s.is_empty()) else {
            return GateOutcome::Disabled;
        };
        if attempt.is_empty() {
            return GateOutcome::Blank;
        }
        if attempt == secret {
            self.authorized = true;
            info!("Editing session unlocked");
            GateOutcome::Granted
        } else {
            GateOutcome::Denied
        }
    }

    pub fn logout(&mut self) {
        if self.authorized {
            info!("Editing session closed");
        }
        self.authorized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_secret_unlocks_until_logout() {
        let mut session = EditSession::new();
        assert!(!session.is_authorized());
        assert_eq!(session.unlock("segredo", Some("segredo")), GateOutcome::Granted);
        assert!(session.is_authorized());
        session.logout();
        assert!(!session.is_authorized());
    }

    #[test]
    fn test_wrong_or_blank_attempt() {
        let mut session = EditSession::new();
        assert_eq!(session.unlock("errado", Some("segredo")), GateOutcome::Denied);
        assert_eq!(session.unlock("", Some("segredo")), GateOutcome::Blank);
        assert!(!session.is_authorized());
    }

    #[test]
    fn test_missing_secret_disables_editing() {
        let mut session = EditSession::new();
        assert_eq!(session.unlock("qualquer", None), GateOutcome::Disabled);
        assert_eq!(session.unlock("", Some("")), GateOutcome::Disabled);
        assert!(!session.is_authorized());
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut a = EditSession::new();
        let b = EditSession::new();
        a.unlock("s", Some("s"));
        assert!(a.is_authorized());
        assert!(!b.is_authorized());
    }
}
