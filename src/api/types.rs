use serde::{Deserialize, Serialize};

use crate::db::UserAccount;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub senha: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(rename = "novaSenha")]
    pub nova_senha: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Sanitized user projection returned by login/refresh/me. Never carries
/// the password hash.
#[derive(Debug, Serialize)]
pub struct UsuarioDto {
    pub id: i32,
    pub nome: String,
    pub email: String,
    pub perfil: PerfilDto,
    #[serde(rename = "empresaId")]
    pub empresa_id: Option<i32>,
    #[serde(rename = "empresaNome")]
    pub empresa_nome: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PerfilDto {
    pub codigo: String,
    pub nivel: i32,
}

impl From<UserAccount> for UsuarioDto {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id,
            nome: account.name,
            email: account.email,
            perfil: PerfilDto {
                codigo: account.profile_code,
                nivel: account.profile_level,
            },
            empresa_id: account.company_id,
            empresa_nome: account.company_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub usuario: UsuarioDto,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub total_users: u64,
    pub active_sessions: u64,
    pub audit_events: u64,
}
