use reiche_auth::db::Store;

async fn test_store() -> Store {
    Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory store")
}

#[tokio::test]
async fn test_cleanup_removes_inactive_tokens_past_retention() {
    let store = test_store().await;

    let token = store
        .create_refresh_token(1, 7, "10.0.0.1", "curl/8.5.0", "Desconhecido - Desconhecido")
        .await
        .unwrap();
    store.invalidate_refresh_token(&token.token).await.unwrap();

    // Retention of 0 days puts the cutoff at "now", so any inactive
    // token already qualifies
    let deleted = store.cleanup_refresh_tokens(0).await.unwrap();
    assert_eq!(deleted, 1);

    // Deleting again is a no-op, not an error
    let deleted = store.cleanup_refresh_tokens(0).await.unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn test_cleanup_keeps_active_unexpired_tokens() {
    let store = test_store().await;

    store
        .create_refresh_token(1, 7, "10.0.0.1", "curl/8.5.0", "Desconhecido - Desconhecido")
        .await
        .unwrap();

    let deleted = store.cleanup_refresh_tokens(90).await.unwrap();
    assert_eq!(deleted, 0);
    assert_eq!(store.count_active_refresh_tokens_for_user(1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_cleanup_removes_expired_tokens_even_when_active() {
    let store = test_store().await;

    // Negative TTL backdates the expiry
    store
        .create_refresh_token(1, -1, "10.0.0.1", "curl/8.5.0", "Desconhecido - Desconhecido")
        .await
        .unwrap();

    let deleted = store.cleanup_refresh_tokens(90).await.unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn test_create_deactivates_previous_tokens() {
    let store = test_store().await;

    let first = store
        .create_refresh_token(1, 7, "10.0.0.1", "curl/8.5.0", "Desconhecido - Desconhecido")
        .await
        .unwrap();
    let second = store
        .create_refresh_token(1, 7, "10.0.0.2", "curl/8.5.0", "Desconhecido - Desconhecido")
        .await
        .unwrap();

    assert_ne!(first.token, second.token);
    assert_eq!(store.count_active_refresh_tokens_for_user(1).await.unwrap(), 1);

    // The survivor is the most recent one
    assert!(store.validate_refresh_token(&first.token).await.unwrap().is_none());
    assert!(store.validate_refresh_token(&second.token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_expired_token_is_defensively_deactivated_on_validate() {
    let store = test_store().await;

    let token = store
        .create_refresh_token(1, -1, "10.0.0.1", "curl/8.5.0", "Desconhecido - Desconhecido")
        .await
        .unwrap();
    assert!(token.active);

    assert!(store.validate_refresh_token(&token.token).await.unwrap().is_none());
    assert_eq!(store.count_active_refresh_tokens_for_user(1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_prune_reset_tokens_drops_used_and_expired() {
    let store = test_store().await;

    let used = store.issue_reset_token(1, 15).await.unwrap();
    store.mark_reset_token_used(used.id).await.unwrap();

    store.issue_reset_token(1, -1).await.unwrap();

    let live = store.issue_reset_token(1, 15).await.unwrap();

    let deleted = store.prune_reset_tokens().await.unwrap();
    assert_eq!(deleted, 2);

    assert!(store.find_reset_token(&live.token).await.unwrap().is_some());
}
