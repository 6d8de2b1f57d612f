//! Domain service for the authentication and session lifecycle.
//!
//! Handles login, refresh-token rotation, logout and the password reset
//! flow. Every credential failure is reported with the same generic
//! message so callers cannot probe which emails exist.

use thiserror::Error;

use crate::db::UserAccount;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Refresh token inválido ou expirado")]
    InvalidRefreshToken,

    #[error("Token de redefinição inválido")]
    ResetTokenInvalid,

    #[error("Token de redefinição já utilizado")]
    ResetTokenUsed,

    #[error("Token de redefinição expirado")]
    ResetTokenExpired,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Request metadata captured at the HTTP boundary for audit rows and
/// refresh-token labels.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub ip: String,
    pub user_agent: String,
}

/// Result of a successful login or refresh: a signed access token, the
/// opaque refresh token, and the sanitized user projection.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserAccount,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Validates credentials and opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on any credential
    /// failure - absent user, inactive user, missing password hash or
    /// wrong password are deliberately indistinguishable.
    async fn login(
        &self,
        email: &str,
        senha: &str,
        client: &ClientContext,
    ) -> Result<LoginResult, AuthError>;

    /// Rotates the presented refresh token: the old token is consumed
    /// and a brand-new pair is issued for the same user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRefreshToken`] when the token is
    /// unknown, already rotated out, or expired.
    async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientContext,
    ) -> Result<LoginResult, AuthError>;

    /// Invalidates a single refresh token.
    async fn logout(
        &self,
        refresh_token: &str,
        user_id: i32,
        email: &str,
        client: &ClientContext,
    ) -> Result<(), AuthError>;

    /// Invalidates every refresh token of the user.
    async fn logout_all(
        &self,
        user_id: i32,
        email: &str,
        client: &ClientContext,
    ) -> Result<(), AuthError>;

    /// Starts the reset flow. Always returns the same generic message,
    /// whether or not the email is registered.
    async fn forgot_password(&self, email: &str) -> Result<String, AuthError>;

    /// Consumes a reset token and stores the new password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ResetTokenInvalid`] / [`AuthError::ResetTokenUsed`] /
    /// [`AuthError::ResetTokenExpired`]; the reasons are user-facing.
    async fn reset_password(
        &self,
        token: &str,
        nova_senha: &str,
        client: &ClientContext,
    ) -> Result<(), AuthError>;

    /// Current-user projection for an authenticated id.
    async fn current_user(&self, user_id: i32) -> Result<UserAccount, AuthError>;
}
