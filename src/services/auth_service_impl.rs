//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::constants::audit;
use crate::db::repositories::user::verify_password;
use crate::db::{LoginEvent, Store, UserAccount};
use crate::services::access_token::AccessTokenSigner;
use crate::services::auth_service::{AuthError, AuthService, ClientContext, LoginResult};
use crate::services::device;
use crate::services::mailer::Mailer;

/// Identical for registered and unregistered emails.
const FORGOT_PASSWORD_MESSAGE: &str =
    "Se o e-mail estiver cadastrado, você receberá as instruções para redefinir a senha.";

pub struct SeaOrmAuthService {
    store: Store,
    signer: AccessTokenSigner,
    mailer: Arc<Mailer>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, mailer: Arc<Mailer>, security: SecurityConfig) -> Self {
        let signer = AccessTokenSigner::new(
            security.jwt_secret.clone(),
            security.access_token_ttl_minutes,
        );
        Self {
            store,
            signer,
            mailer,
            security,
        }
    }

    /// Audit writes must never block or fail the primary operation;
    /// errors are logged and dropped here.
    async fn audit(&self, event: LoginEvent) {
        if let Err(e) = self.store.record_login_event(event).await {
            warn!(error = %e, "Failed to record login history entry");
        }
    }

    fn login_event(
        event: &str,
        user_id: Option<i32>,
        email: &str,
        success: bool,
        failure_reason: Option<&str>,
        client: &ClientContext,
    ) -> LoginEvent {
        let info = device::classify(&client.user_agent);
        LoginEvent {
            user_id,
            email: email.to_string(),
            success,
            failure_reason: failure_reason.map(ToString::to_string),
            event: event.to_string(),
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            device: info.device,
            browser: info.browser,
        }
    }

    /// Credential check shared by `login`. Each distinct failure is
    /// audited with its real reason but surfaced as the same generic
    /// error.
    async fn validate_user(
        &self,
        email: &str,
        senha: &str,
        client: &ClientContext,
    ) -> Result<UserAccount, AuthError> {
        let Some((account, password_hash)) =
            self.store.get_user_by_email_with_password(email).await?
        else {
            self.audit(Self::login_event(
                audit::LOGIN,
                None,
                email,
                false,
                Some("Usuário não encontrado"),
                client,
            ))
            .await;
            return Err(AuthError::InvalidCredentials);
        };

        if !account.active {
            self.audit(Self::login_event(
                audit::LOGIN,
                Some(account.id),
                email,
                false,
                Some("Usuário inativo"),
                client,
            ))
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        let Some(password_hash) = password_hash else {
            self.audit(Self::login_event(
                audit::LOGIN,
                Some(account.id),
                email,
                false,
                Some("Senha não definida"),
                client,
            ))
            .await;
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password_hash, senha.to_string()).await? {
            self.audit(Self::login_event(
                audit::LOGIN,
                Some(account.id),
                email,
                false,
                Some("Senha incorreta"),
                client,
            ))
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account)
    }

    /// Issues the access/refresh pair for an already-validated account.
    async fn open_session(
        &self,
        account: UserAccount,
        client: &ClientContext,
    ) -> Result<LoginResult, AuthError> {
        let access_token = self.signer.sign(&account)?;

        let label = device::classify(&client.user_agent).label();
        let refresh = self
            .store
            .create_refresh_token(
                account.id,
                self.security.refresh_token_ttl_days,
                &client.ip,
                &client.user_agent,
                &label,
            )
            .await?;

        Ok(LoginResult {
            access_token,
            refresh_token: refresh.token,
            user: account,
        })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(
        &self,
        email: &str,
        senha: &str,
        client: &ClientContext,
    ) -> Result<LoginResult, AuthError> {
        let account = self.validate_user(email, senha, client).await?;

        self.audit(Self::login_event(
            audit::LOGIN,
            Some(account.id),
            email,
            true,
            None,
            client,
        ))
        .await;

        info!(user_id = account.id, "User logged in");
        self.open_session(account, client).await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientContext,
    ) -> Result<LoginResult, AuthError> {
        let Some(row) = self.store.validate_refresh_token(refresh_token).await? else {
            return Err(AuthError::InvalidRefreshToken);
        };

        let Some(account) = self.store.get_user_by_id(row.user_id).await? else {
            self.store.invalidate_refresh_token(&row.token).await?;
            return Err(AuthError::InvalidRefreshToken);
        };

        if !account.active {
            self.store.invalidate_refresh_token(&row.token).await?;
            return Err(AuthError::InvalidRefreshToken);
        }

        // Rotation: open_session deactivates every token the user holds,
        // which consumes the one just presented. The access token is
        // re-signed from the user's current profile/company.
        self.open_session(account, client).await
    }

    async fn logout(
        &self,
        refresh_token: &str,
        user_id: i32,
        email: &str,
        client: &ClientContext,
    ) -> Result<(), AuthError> {
        self.store.invalidate_refresh_token(refresh_token).await?;

        self.audit(Self::login_event(
            audit::LOGOUT,
            Some(user_id),
            email,
            true,
            None,
            client,
        ))
        .await;

        Ok(())
    }

    async fn logout_all(
        &self,
        user_id: i32,
        email: &str,
        client: &ClientContext,
    ) -> Result<(), AuthError> {
        self.store.invalidate_all_refresh_tokens(user_id).await?;

        self.audit(Self::login_event(
            audit::LOGOUT_ALL,
            Some(user_id),
            email,
            true,
            None,
            client,
        ))
        .await;

        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        let user = self.store.get_user_by_email_with_password(email).await?;

        if let Some((account, _)) = user
            && account.active
        {
            let reset = self
                .store
                .issue_reset_token(account.id, self.security.reset_token_ttl_minutes)
                .await?;

            self.mailer
                .send_password_reset(&account.email, &account.name, &reset.token);
        }

        Ok(FORGOT_PASSWORD_MESSAGE.to_string())
    }

    async fn reset_password(
        &self,
        token: &str,
        nova_senha: &str,
        client: &ClientContext,
    ) -> Result<(), AuthError> {
        let Some(row) = self.store.find_reset_token(token).await? else {
            return Err(AuthError::ResetTokenInvalid);
        };

        if row.used {
            return Err(AuthError::ResetTokenUsed);
        }

        let expired = DateTime::parse_from_rfc3339(&row.expires_at)
            .map(|exp| exp < Utc::now())
            .unwrap_or(true);
        if expired {
            return Err(AuthError::ResetTokenExpired);
        }

        let account = self
            .store
            .get_user_by_id(row.user_id)
            .await?
            .ok_or(AuthError::ResetTokenInvalid)?;

        self.store
            .update_user_password(account.id, nova_senha, &self.security)
            .await?;

        self.store.mark_reset_token_used(row.id).await?;

        // A credential change ends every open session.
        self.store.invalidate_all_refresh_tokens(account.id).await?;

        self.mailer
            .send_password_changed(&account.email, &account.name);

        self.audit(Self::login_event(
            audit::RESET_SENHA,
            Some(account.id),
            &account.email,
            true,
            None,
            client,
        ))
        .await;

        info!(user_id = account.id, "Password reset completed");
        Ok(())
    }

    async fn current_user(&self, user_id: i32) -> Result<UserAccount, AuthError> {
        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
