use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    db::handlers::{Repository, Users},
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, instrument, trace};

/// Pull the token out of an `Authorization: Bearer <token>` header.
/// Returns:
/// - Ok(None): no Authorization header, or a non-Bearer scheme
/// - Ok(Some(token)): a bearer token to verify
/// - Err(error): the header is not valid ASCII
fn bearer_token(parts: &Parts) -> Result<Option<&str>> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|e| Error::BadRequest {
        message: format!("Invalid authorization header: {e}"),
    })?;

    Ok(value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty()))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(token) = bearer_token(parts)? else {
            trace!("No bearer token in request");
            return Err(Error::Unauthenticated { message: None });
        };

        let claims = session::verify_session_token(token, &state.config)?;

        // The token only proves who the caller was when it was issued; re-read the row so a
        // deleted user is locked out and a role change applies immediately
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let user = Users::new(&mut conn).get_by_id(claims.id).await?.ok_or_else(|| Error::Unauthenticated {
            message: Some("User no longer exists".to_string()),
        })?;

        debug!("Authenticated user {}", user.id);
        Ok(CurrentUser::from(user))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::users::{CurrentUser, Role},
        auth::session::create_session_token,
        test_utils::{create_test_state, create_test_user},
    };
    use axum::{
        extract::FromRequestParts as _,
        http::{StatusCode, request::Parts},
    };
    use sqlx::PgPool;

    fn parts_with_authorization(value: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("http://localhost/deals");
        if let Some(value) = value {
            builder = builder.header("authorization", value);
        }
        let (parts, _body) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_valid_bearer_token(pool: PgPool) {
        let state = create_test_state(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let token = create_session_token(&user, &state.config).unwrap();

        let mut parts = parts_with_authorization(Some(&format!("Bearer {token}")));
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(extracted.id, user.id);
        assert_eq!(extracted.email, user.email);
        assert_eq!(extracted.role, Role::User);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_role_is_read_from_database(pool: PgPool) {
        let state = create_test_state(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let token = create_session_token(&user, &state.config).unwrap();

        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        let mut parts = parts_with_authorization(Some(&format!("Bearer {token}")));
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(extracted.is_admin());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_or_invalid_token_is_unauthorized(pool: PgPool) {
        let state = create_test_state(pool.clone()).await;

        for header in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer not-a-jwt"), Some("Bearer ")] {
            let mut parts = parts_with_authorization(header);
            let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "header {header:?}");
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deleted_user_is_rejected(pool: PgPool) {
        let state = create_test_state(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let token = create_session_token(&user, &state.config).unwrap();

        sqlx::query("DELETE FROM users WHERE id = $1").bind(user.id).execute(&pool).await.unwrap();

        let mut parts = parts_with_authorization(Some(&format!("Bearer {token}")));
        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
