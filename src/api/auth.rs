use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::types::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, LogoutRequest, MessageResponse,
    RefreshRequest, ResetPasswordRequest, UsuarioDto,
};
use super::{ApiError, ApiResponse, AppState};
use crate::services::ClientContext;

/// Identity decoded from the bearer access token, injected into request
/// extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub email: String,
    pub profile: String,
    pub level: i32,
    pub company_id: Option<i32>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Bearer-auth middleware: verifies the signed access token and makes
/// the authenticated identity available to handlers.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Token de acesso ausente"))?;

    let claims = state
        .signer()
        .verify(&token)
        .map_err(|_| ApiError::unauthorized("Token de acesso inválido ou expirado"))?;

    let id: i32 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthorized("Token de acesso inválido ou expirado"))?;

    tracing::Span::current().record("user_id", claims.sub.as_str());

    request.extensions_mut().insert(CurrentUser {
        id,
        email: claims.email,
        profile: claims.profile,
        level: claims.level,
        company_id: claims.company_id,
    });

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// Client IP as reported by the reverse proxy, falling back to
/// "unknown" when no forwarded header is present.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        return value.trim().to_string();
    }

    "unknown".to_string()
}

fn client_context(headers: &HeaderMap) -> ClientContext {
    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    ClientContext {
        ip: client_ip(headers),
        user_agent,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with email and password, returns the token pair.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("O campo email é obrigatório"));
    }
    if payload.senha.is_empty() {
        return Err(ApiError::validation("O campo senha é obrigatório"));
    }

    let client = client_context(&headers);
    let result = state
        .auth_service()
        .login(&payload.email, &payload.senha, &client)
        .await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        access_token: result.access_token,
        refresh_token: result.refresh_token,
        usuario: UsuarioDto::from(result.user),
    })))
}

/// POST /auth/refresh
/// Rotate the refresh token: consumes the presented one and issues a
/// fresh pair.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.refresh_token.is_empty() {
        return Err(ApiError::validation("O campo refreshToken é obrigatório"));
    }

    let client = client_context(&headers);
    let result = state
        .auth_service()
        .refresh(&payload.refresh_token, &client)
        .await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        access_token: result.access_token,
        refresh_token: result.refresh_token,
        usuario: UsuarioDto::from(result.user),
    })))
}

/// POST /auth/forgot-password
/// Always answers with the same generic message, whether or not the
/// email exists.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("O campo email é obrigatório"));
    }

    let message = state.auth_service().forgot_password(&payload.email).await?;

    Ok(Json(ApiResponse::success(MessageResponse { message })))
}

/// POST /auth/reset-password
/// Consume a reset token and store the new password.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.token.is_empty() {
        return Err(ApiError::validation("O campo token é obrigatório"));
    }
    if payload.nova_senha.len() < 8 {
        return Err(ApiError::validation(
            "A nova senha deve ter pelo menos 8 caracteres",
        ));
    }

    let client = client_context(&headers);
    state
        .auth_service()
        .reset_password(&payload.token, &payload.nova_senha, &client)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Senha redefinida com sucesso".to_string(),
    })))
}

/// POST /auth/logout (bearer)
/// Invalidate the presented refresh token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let client = client_context(&headers);
    state
        .auth_service()
        .logout(&payload.refresh_token, user.id, &user.email, &client)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logout realizado com sucesso".to_string(),
    })))
}

/// POST /auth/logout-all (bearer)
/// Invalidate every refresh token of the authenticated user.
pub async fn logout_all(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let client = client_context(&headers);
    state
        .auth_service()
        .logout_all(user.id, &user.email, &client)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Sessões encerradas em todos os dispositivos".to_string(),
    })))
}

/// GET /auth/me (bearer)
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<UsuarioDto>>, ApiError> {
    let account = state.auth_service().current_user(user.id).await?;

    Ok(Json(ApiResponse::success(UsuarioDto::from(account))))
}
