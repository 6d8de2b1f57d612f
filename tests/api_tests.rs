use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use reiche_auth::api::AppState;
use reiche_auth::config::Config;
use std::sync::Arc;
use tower::ServiceExt;

/// Admin account seeded by migration (must match m20250901_initial.rs)
const ADMIN_EMAIL: &str = "admin@reiche.local";
const ADMIN_PASSWORD: &str = "trocar-senha";

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single pooled connection keeps the in-memory database shared
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    // Generous limits so functional tests never trip the throttle;
    // the rate-limit tests build their own app with tight profiles
    config.rate_limit.login.max_requests = 100;
    config.rate_limit.password.max_requests = 100;
    config.rate_limit.mutation.max_requests = 1000;
    config.rate_limit.read.max_requests = 1000;
    config
}

async fn spawn_app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = reiche_auth::api::create_app_state(config, None)
        .await
        .expect("Failed to create app state");
    let router = reiche_auth::api::router(state.clone()).await;
    (router, state)
}

async fn spawn_app() -> (Router, Arc<AppState>) {
    spawn_app_with(test_config()).await
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, email: &str, senha: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            &serde_json::json!({ "email": email, "senha": senha }),
        ))
        .await
        .unwrap();

    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_login_success() {
    let (app, state) = spawn_app().await;

    let (status, body) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["accessToken"].is_string());
    assert!(body["data"]["refreshToken"].is_string());
    assert_eq!(body["data"]["usuario"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["usuario"]["perfil"]["codigo"], "ADMIN");

    let active = state
        .store()
        .count_active_refresh_tokens_for_user(1)
        .await
        .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn test_login_wrong_password_is_audited() {
    let (app, state) = spawn_app().await;

    let (status, _) = login(&app, ADMIN_EMAIL, "senha-errada").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let history = state
        .store()
        .recent_login_events_for_email(ADMIN_EMAIL, 1)
        .await
        .unwrap();

    assert_eq!(history.len(), 1);
    assert!(!history[0].success);
    assert_eq!(history[0].failure_reason.as_deref(), Some("Senha incorreta"));
    assert_eq!(history[0].event, "LOGIN");
}

#[tokio::test]
async fn test_unknown_email_gets_same_generic_error() {
    let (app, _state) = spawn_app().await;

    let (wrong_pw_status, wrong_pw_body) = login(&app, ADMIN_EMAIL, "senha-errada").await;
    let (unknown_status, unknown_body) = login(&app, "ninguem@reiche.local", "qualquer").await;

    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw_body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn test_second_login_keeps_single_active_session() {
    let (app, state) = spawn_app().await;

    let (_, first) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (_, second) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    assert_ne!(
        first["data"]["refreshToken"],
        second["data"]["refreshToken"]
    );

    let active = state
        .store()
        .count_active_refresh_tokens_for_user(1)
        .await
        .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn test_refresh_rotation_rejects_reuse() {
    let (app, _state) = spawn_app().await;

    let (_, body) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let original = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            &serde_json::json!({ "refreshToken": original }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rotated = body_json(response).await;
    assert_ne!(rotated["data"]["refreshToken"], original);
    assert!(rotated["data"]["accessToken"].is_string());

    // Replaying the rotated-out token must fail
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            &serde_json::json!({ "refreshToken": original }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_unknown_token_fails() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            &serde_json::json!({ "refreshToken": "0".repeat(64) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let (app, _state) = spawn_app().await;

    let (_, body) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("Authorization", format!("Bearer {access}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "refreshToken": refresh }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            &serde_json::json!({ "refreshToken": refresh }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_ends_every_session() {
    let (app, state) = spawn_app().await;

    let (_, body) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout-all")
                .header("Authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let active = state
        .store()
        .count_active_refresh_tokens_for_user(1)
        .await
        .unwrap();
    assert_eq!(active, 0);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            &serde_json::json!({ "refreshToken": refresh }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_password_message_is_identical_for_unknown_email() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/forgot-password",
            &serde_json::json!({ "email": ADMIN_EMAIL }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let known = body_json(response).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/forgot-password",
            &serde_json::json!({ "email": "ninguem@reiche.local" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let unknown = body_json(response).await;

    assert_eq!(known["data"]["message"], unknown["data"]["message"]);
}

#[tokio::test]
async fn test_reset_password_flow_and_one_time_use() {
    let (app, state) = spawn_app().await;

    let reset = state.store().issue_reset_token(1, 15).await.unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/reset-password",
            &serde_json::json!({ "token": reset.token, "novaSenha": "senha-nova-123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works, new one does
    let (status, _) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, ADMIN_EMAIL, "senha-nova-123").await;
    assert_eq!(status, StatusCode::OK);

    // One-time use: the consumed token is permanently rejected
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/reset-password",
            &serde_json::json!({ "token": reset.token, "novaSenha": "outra-senha-456" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("utilizado"));
}

#[tokio::test]
async fn test_reset_password_rejects_expired_token() {
    let (app, state) = spawn_app().await;

    // Negative TTL backdates the expiry
    let reset = state.store().issue_reset_token(1, -1).await.unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/reset-password",
            &serde_json::json!({ "token": reset.token, "novaSenha": "senha-nova-123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("expirado"));
}

#[tokio::test]
async fn test_reset_password_rejects_unknown_token() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/reset-password",
            &serde_json::json!({ "token": "f".repeat(64), "novaSenha": "senha-nova-123" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_password_ends_open_sessions() {
    let (app, state) = spawn_app().await;

    let (_, body) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let reset = state.store().issue_reset_token(1, 15).await.unwrap();
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/reset-password",
            &serde_json::json!({ "token": reset.token, "novaSenha": "senha-nova-123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            &serde_json::json!({ "refreshToken": refresh }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_middleware() {
    let (app, _state) = spawn_app().await;

    // Missing token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Tampered token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("Authorization", "Bearer not-a-valid-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Valid token
    let (_, body) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("Authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_login_rate_limit_denies_sixth_attempt() {
    let mut config = test_config();
    config.rate_limit.login.max_requests = 5;
    config.rate_limit.login.window_seconds = 900;
    let (app, _state) = spawn_app_with(config).await;

    for _ in 0..5 {
        let (status, _) = login(&app, ADMIN_EMAIL, "senha-errada").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            &serde_json::json!({ "email": ADMIN_EMAIL, "senha": "senha-errada" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get("X-RateLimit-Remaining").unwrap(),
        "0"
    );

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["retryAfter"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_rate_limit_headers_on_every_response() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-RateLimit-Limit"));
    assert!(response.headers().contains_key("X-RateLimit-Remaining"));
    assert!(response.headers().contains_key("X-RateLimit-Reset"));
}

#[tokio::test]
async fn test_system_status() {
    let (app, _state) = spawn_app().await;

    let (_, body) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .header("Authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["data"]["total_users"].as_u64().unwrap() >= 1);
    assert_eq!(body["data"]["active_sessions"].as_u64().unwrap(), 1);
}
