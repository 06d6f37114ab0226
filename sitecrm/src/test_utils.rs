//! Shared fixtures for the handler and repository tests.

use crate::api::models::users::{CurrentUser, Role};
use crate::auth::session::create_session_token;
use crate::chat::ChatClient;
use crate::config::{Config, PasswordConfig, PoolSettings};
use crate::db::handlers::{Repository, Users};
use crate::db::models::users::UserCreateDBRequest;
use crate::sync::MondayClient;
use crate::types::UserId;
use crate::AppState;
use axum_test::TestServer;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

/// Install the rustls provider used by the outbound HTTP clients. Safe to call repeatedly.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

pub fn create_test_config() -> Config {
    let uploads = std::env::temp_dir().join(format!("sitecrm-test-uploads-{}", std::process::id()));

    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 4,
        min_connections: 0,
        ..Default::default()
    };
    config.auth.allow_registration = true;
    // Cheap hashing keeps the auth tests fast
    config.auth.password = PasswordConfig {
        min_length: 6,
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        ..Default::default()
    };
    config.uploads.dir = uploads;
    config
}

/// Reconcile a fresh test database into the current schema.
pub async fn setup_schema(pool: &PgPool) {
    crate::db::reconcile::run_reconciler(pool, "Satoris")
        .await
        .expect("Failed to reconcile test schema");
}

/// Insert a bare user row and return its id.
pub async fn insert_user(conn: &mut PgConnection, email: &str) -> UserId {
    Users::new(conn)
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            full_name: None,
            role: Role::User,
        })
        .await
        .expect("Failed to insert test user")
        .id
}

pub async fn create_test_state(pool: PgPool) -> AppState {
    create_test_state_with_config(pool, create_test_config()).await
}

async fn create_test_state_with_config(pool: PgPool, config: Config) -> AppState {
    install_crypto_provider();
    setup_schema(&pool).await;
    let board_sync = MondayClient::new(&config.monday).expect("Failed to create Monday.com client");
    let chat = ChatClient::new(&config.chat).expect("Failed to create chat client");

    AppState::builder()
        .db(pool)
        .config(config)
        .board_sync(Arc::new(board_sync))
        .chat(Arc::new(chat))
        .build()
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    let state = create_test_state_with_config(pool, config).await;
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub async fn create_test_user(pool: &PgPool, role: Role) -> CurrentUser {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let email = format!("testuser_{}@example.com", Uuid::new_v4().simple());

    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email,
            password_hash: "not-a-real-hash".to_string(),
            full_name: Some("Test User".to_string()),
            role,
        })
        .await
        .expect("Failed to create test user");
    CurrentUser::from(user)
}

/// Header name and value carrying a valid session token for `user`.
pub fn add_auth_headers(user: &CurrentUser) -> (String, String) {
    let token = create_session_token(user, &create_test_config()).expect("Failed to create session token");
    ("authorization".to_string(), format!("Bearer {token}"))
}
