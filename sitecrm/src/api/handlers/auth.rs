use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        auth::{LoginRequest, RegisterRequest, RegisterResponse, TokenResponse},
        users::{CurrentUser, Role, UserResponse},
    },
    auth::{
        password::{self, Argon2Params},
        session,
    },
    db::{
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::Error,
};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "auth",
    responses(
        (status = 201, description = "User registered successfully", body = TokenResponse),
        (status = 400, description = "Invalid input, duplicate email or registration disabled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let email = request.email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }
    password::validate_password(&request.password, &state.config.auth.password)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut user_repo = Users::new(&mut tx);
    if user_repo.get_user_by_email(&email).await?.is_some() {
        return Err(Error::BadRequest {
            message: "An account with this email address already exists".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let params = Argon2Params::from(&state.config.auth.password);
    let plain = request.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain, params))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email,
            password_hash,
            full_name: request.full_name.filter(|n| !n.trim().is_empty()),
            role: Role::User,
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let token = session::create_session_token(&CurrentUser::from(created_user.clone()), &state.config)?;
    tracing::info!("Registered user {}", created_user.id);
    Ok(RegisterResponse(TokenResponse::bearer(token, UserResponse::from(created_user))))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<TokenResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut pool_conn)
        .get_user_by_email(request.email.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    let hash = user.password_hash.clone();
    let plain = request.password;
    let is_valid = tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;
    if !is_valid {
        return Err(invalid_credentials());
    }

    let token = session::create_session_token(&CurrentUser::from(user.clone()), &state.config)?;
    Ok(Json(TokenResponse::bearer(token, UserResponse::from(user))))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut pool_conn).get_by_id(current_user.id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: current_user.id.to_string(),
    })?;
    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::auth::TokenResponse;
    use crate::api::models::users::{Role, UserResponse};
    use crate::test_utils::{add_auth_headers, create_test_app, create_test_app_with_config, create_test_config, create_test_user};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_then_login(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app
            .post("/auth/register")
            .json(&json!({"email": "new@example.com", "password": "hunter22", "full_name": "New Person"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: TokenResponse = response.json();
        assert_eq!(body.token_type, "bearer");
        assert_eq!(body.user.email, "new@example.com");
        assert_eq!(body.user.role, Role::User);

        let response = app
            .post("/auth/login")
            .json(&json!({"email": "NEW@example.com", "password": "hunter22"}))
            .await;
        response.assert_status_ok();
        let login: TokenResponse = response.json();

        let response = app
            .get("/auth/me")
            .add_header("authorization", format!("Bearer {}", login.access_token))
            .await;
        response.assert_status_ok();
        let me: UserResponse = response.json();
        assert_eq!(me.full_name.as_deref(), Some("New Person"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_rejects_duplicates_and_short_passwords(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        app.post("/auth/register")
            .json(&json!({"email": "dup@example.com", "password": "hunter22"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = app
            .post("/auth/register")
            .json(&json!({"email": "Dup@Example.com", "password": "hunter22"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("already exists"));

        let response = app
            .post("/auth/register")
            .json(&json!({"email": "short@example.com", "password": "abc"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("at least 6 characters"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_disabled(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.allow_registration = false;
        let app = create_test_app_with_config(pool.clone(), config).await;

        app.post("/auth/register")
            .json(&json!({"email": "new@example.com", "password": "hunter22"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_with_wrong_password(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        app.post("/auth/register")
            .json(&json!({"email": "user@example.com", "password": "correct-horse"}))
            .await
            .assert_status(StatusCode::CREATED);

        app.post("/auth/login")
            .json(&json!({"email": "user@example.com", "password": "wrong-horse"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        app.post("/auth/login")
            .json(&json!({"email": "nobody@example.com", "password": "correct-horse"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_me_requires_token(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        app.get("/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);

        let user = create_test_user(&pool, Role::Admin).await;
        let response = app.get("/auth/me").add_header(add_auth_headers(&user).0, add_auth_headers(&user).1).await;
        response.assert_status_ok();
        let me: UserResponse = response.json();
        assert_eq!(me.id, user.id);
        assert_eq!(me.role, Role::Admin);
    }
}
