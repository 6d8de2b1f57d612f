use tracing::info;

/// Outbound mail collaborator. Delivery is stubbed to structured log
/// lines; a real transport slots in behind the same methods.
pub struct Mailer;

impl Mailer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub fn send_password_reset(&self, email: &str, name: &str, token: &str) {
        info!(
            event = "mail_password_reset",
            to = %email,
            "Password reset requested for {name}: /redefinir-senha?token={token}"
        );
    }

    pub fn send_password_changed(&self, email: &str, name: &str) {
        info!(
            event = "mail_password_changed",
            to = %email,
            "Password changed confirmation for {name}"
        );
    }
}

impl Default for Mailer {
    fn default() -> Self {
        Self::new()
    }
}
