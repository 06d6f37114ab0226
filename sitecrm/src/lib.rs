//! # sitecrm: CRM backend for site survey teams
//!
//! `sitecrm` is the HTTP backend behind a small sales CRM. It stores deals, leads, accounts,
//! contacts, tasks and opportunities, plus the site survey checklists field staff fill in on
//! location, and keeps those surveys mirrored onto Monday.com boards.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! PostgreSQL (through sqlx) for persistence.
//!
//! ### Request Flow
//!
//! Every route except `/healthz`, `/auth/login`, `/auth/register` and the documentation requires
//! `Authorization: Bearer <jwt>`. The [`CurrentUser`](api::models::users::CurrentUser) extractor
//! verifies the token and re-reads the user, then the handler applies role checks from
//! [`auth::permissions`]: admins see everything, everyone else sees records they own plus unowned
//! records. Handlers talk to the database through the repositories in [`db::handlers`].
//!
//! ### Core Components
//!
//! - [`api`]: handlers and request/response models, documented with utoipa and served by Scalar
//!   at `/docs`
//! - [`auth`]: JWT sessions, Argon2 password hashing, permissions
//! - [`db`]: repositories and the schema reconciler, which brings any existing database up to the
//!   expected shape on startup instead of running numbered migrations
//! - [`sync`]: pushes site surveys to the primary and mirror Monday.com boards
//! - [`chat`]: the pipeline assistant behind `POST /chat`
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use sitecrm::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = sitecrm::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     sitecrm::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod sync;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::{
        handlers::{accounts, admin, auth as auth_handlers, chat as chat_handlers, checklists, contacts, deals, leads, opportunities, tasks, workspaces},
        models::users::Role,
    },
    auth::password::{self, Argon2Params},
    chat::ChatClient,
    config::CorsOrigin,
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    openapi::ApiDoc,
    sync::{BoardSync, MondayClient},
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header, request::Parts},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{AccountId, ChecklistId, ContactId, DealId, LeadId, OpportunityId, TaskId, UserId, WorkspaceId};

/// Multipart framing allowance on top of the photo itself, so an oversized photo reaches the
/// handler and gets its 400 instead of a bare 413.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .board_sync(Arc::new(MondayClient::new(&config.monday)?))
///     .chat(Arc::new(ChatClient::new(&config.chat)?))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub board_sync: Arc<dyn BoardSync>,
    pub chat: Arc<ChatClient>,
}

/// Create the initial admin user, or reset its password if it already exists.
///
/// Without a password there is nothing to log in with, so a missing admin is not created and
/// `None` is returned.
#[instrument(skip_all, fields(email = %email))]
pub async fn create_initial_admin_user(
    email: &str,
    password: Option<&str>,
    params: Argon2Params,
    db: &PgPool,
) -> errors::Result<Option<UserId>> {
    let password_hash = password.map(|pwd| password::hash_password(pwd, params)).transpose()?;

    let mut tx = db.begin().await.map_err(|e| errors::Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        if password_hash.is_some() {
            let update = UserUpdateDBRequest {
                role: Some(Role::Admin),
                password_hash,
                ..Default::default()
            };
            user_repo.update(existing_user.id, &update).await?;
        }
        tx.commit().await.map_err(|e| errors::Error::Database(e.into()))?;
        return Ok(Some(existing_user.id));
    }

    let Some(password_hash) = password_hash else {
        warn!("No admin password configured, skipping creation of {}", email);
        return Ok(None);
    };

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            password_hash,
            full_name: Some("Administrator".to_string()),
            role: Role::Admin,
        })
        .await?;

    tx.commit().await.map_err(|e| errors::Error::Database(e.into()))?;
    info!("Created initial admin user {}", created_user.id);
    Ok(Some(created_user.id))
}

/// Reconcile the schema and make sure the initial admin exists.
async fn prepare_database(pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    db::reconcile::run_reconciler(pool, &config.default_workspace).await?;

    create_initial_admin_user(
        &config.admin_email,
        config.admin_password.as_deref(),
        Argon2Params::from(&config.auth.password),
        pool,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;
    Ok(())
}

/// Connect to the configured database.
async fn connect_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(&config.database.url)
        .await?;
    info!("Connected to database");
    Ok(pool)
}

/// Whether `origin` is an `https://` origin whose host ends with one of `suffixes`.
fn matches_origin_suffix(origin: &str, suffixes: &[String]) -> bool {
    let Some(rest) = origin.strip_prefix("https://") else {
        return false;
    };
    let host = rest.split(':').next().unwrap_or(rest);
    suffixes
        .iter()
        .any(|suffix| !suffix.is_empty() && host.len() > suffix.len() && host.ends_with(suffix.as_str()))
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let allow_origin = if cors_config.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut exact = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send the origin without a trailing slash
                exact.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        let suffixes = cors_config.allowed_origin_suffixes.clone();
        AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
            exact.contains(origin) || origin.to_str().is_ok_and(|origin| matches_origin_suffix(origin, &suffixes))
        })
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(cors_config.allow_credentials)
        .expose_headers(vec![header::LOCATION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with every endpoint and middleware.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;
    let uploads_dir = state.config.uploads.dir.clone();
    let photo_body_limit = state.config.uploads.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    let router = Router::new()
        .route("/healthz", get(api::handlers::healthz))
        // Authentication
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/me", get(auth_handlers::me))
        // Workspaces
        .route("/workspaces", get(workspaces::list_workspaces).post(workspaces::create_workspace))
        .route(
            "/workspaces/{id}",
            get(workspaces::get_workspace)
                .put(workspaces::update_workspace)
                .delete(workspaces::delete_workspace),
        )
        // CRM records
        .route("/deals", get(deals::list_deals).post(deals::create_deal))
        .route("/deals/{id}", get(deals::get_deal).put(deals::update_deal).delete(deals::delete_deal))
        .route("/leads", get(leads::list_leads).post(leads::create_lead))
        .route("/leads/{id}", get(leads::get_lead).put(leads::update_lead).delete(leads::delete_lead))
        .route("/accounts", get(accounts::list_accounts).post(accounts::create_account))
        .route(
            "/accounts/{id}",
            get(accounts::get_account).put(accounts::update_account).delete(accounts::delete_account),
        )
        .route("/contacts", get(contacts::list_contacts).post(contacts::create_contact))
        .route(
            "/contacts/{id}",
            get(contacts::get_contact).put(contacts::update_contact).delete(contacts::delete_contact),
        )
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/{id}", get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task))
        .route(
            "/opportunities",
            get(opportunities::list_opportunities).post(opportunities::create_opportunity),
        )
        .route(
            "/opportunities/{id}",
            get(opportunities::get_opportunity)
                .put(opportunities::update_opportunity)
                .delete(opportunities::delete_opportunity),
        )
        // Site surveys
        .route("/checklists", get(checklists::list_checklists).post(checklists::create_checklist))
        .route(
            "/checklists/{id}",
            get(checklists::get_checklist)
                .put(checklists::update_checklist)
                .delete(checklists::delete_checklist),
        )
        .route(
            "/checklists/{id}/photos",
            post(checklists::upload_photo).layer(DefaultBodyLimit::max(photo_body_limit)),
        )
        .route("/checklists/{id}/sync", post(checklists::sync_checklist))
        // Admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/checklists", get(admin::list_all_checklists))
        .route("/chat", post(chat_handlers::chat))
        .with_state(state)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Main application struct that owns the router and the database pool.
///
/// 1. **Create**: [`Application::new`] connects, reconciles the schema and creates the admin
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests finish, then the pool
///    is closed and spans are flushed
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Like [`Application::new`], reusing `pool` when given instead of connecting.
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting sitecrm with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => pool,
            None => connect_database(&config).await?,
        };
        prepare_database(&pool, &config).await?;

        let board_sync = MondayClient::new(&config.monday)?;
        if !board_sync.is_configured() {
            info!("No Monday.com token configured, site surveys will not be synced");
        }
        let chat = ChatClient::new(&config.chat)?;

        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .board_sync(Arc::new(board_sync))
            .chat(Arc::new(chat))
            .build();
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("sitecrm listening on http://{}", bind_addr);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Application, create_initial_admin_user, matches_origin_suffix};
    use crate::api::models::deals::DealResponse;
    use crate::api::models::pipeline::DealStage;
    use crate::api::models::users::{CurrentUser, Role};
    use crate::auth::password::{Argon2Params, verify_password};
    use crate::config::{CorsOrigin, PasswordConfig};
    use crate::db::handlers::Users;
    use crate::test_utils::{
        add_auth_headers, create_test_app, create_test_config, create_test_user, install_crypto_provider, setup_schema,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    fn fast_params() -> Argon2Params {
        Argon2Params::from(&PasswordConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            ..Default::default()
        })
    }

    #[test]
    fn test_origin_suffix_matching() {
        let suffixes = vec![".vercel.app".to_string()];
        assert!(matches_origin_suffix("https://crm-git-main.vercel.app", &suffixes));
        assert!(matches_origin_suffix("https://preview.vercel.app:443", &suffixes));
        assert!(!matches_origin_suffix("http://crm.vercel.app", &suffixes));
        assert!(!matches_origin_suffix("https://vercel.app.evil.com", &suffixes));
        assert!(!matches_origin_suffix("https://.vercel.app", &suffixes));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cors_allows_configured_and_suffixed_origins(pool: PgPool) {
        let app = create_test_app(pool).await;

        let response = app
            .get("/healthz")
            .add_header("origin", "http://localhost:3001")
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("access-control-allow-origin"), "http://localhost:3001");

        let response = app
            .get("/healthz")
            .add_header("origin", "https://crm-preview.vercel.app")
            .await;
        assert_eq!(response.header("access-control-allow-origin"), "https://crm-preview.vercel.app");

        let response = app.get("/healthz").add_header("origin", "https://evil.example.com").await;
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_initial_admin_user(pool: PgPool) {
        setup_schema(&pool).await;

        let skipped = create_initial_admin_user("admin@example.com", None, fast_params(), &pool).await.unwrap();
        assert!(skipped.is_none());

        let id = create_initial_admin_user("admin@example.com", Some("first-pass"), fast_params(), &pool)
            .await
            .unwrap()
            .unwrap();
        let again = create_initial_admin_user("admin@example.com", Some("second-pass"), fast_params(), &pool)
            .await
            .unwrap();
        assert_eq!(again, Some(id));

        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn).get_user_by_email("admin@example.com").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password("second-pass", &admin.password_hash).unwrap());
        assert!(!verify_password("first-pass", &admin.password_hash).unwrap());
    }

    /// Whole stack against an empty database: reconcile, then a deal's full life.
    #[sqlx::test]
    #[test_log::test]
    async fn test_deal_lifecycle_from_empty_database(pool: PgPool) {
        install_crypto_provider();
        let mut config = create_test_config();
        config.admin_password = Some("admin-pass".to_string());
        config.auth.security.cors.allowed_origins = vec![CorsOrigin::Url("http://localhost:3001".parse().unwrap())];
        let app = Application::new_with_pool(config, Some(pool.clone()))
            .await
            .unwrap()
            .into_test_server();

        let login = app
            .post("/auth/login")
            .json(&json!({"email": "admin@test.com", "password": "admin-pass"}))
            .await;
        login.assert_status_ok();

        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn).get_user_by_email("admin@test.com").await.unwrap().unwrap();
        let admin = CurrentUser::from(admin);
        let (name, value) = add_auth_headers(&admin);

        let response = app
            .post("/deals")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Acme", "stage": "Prospects", "monday_item_id": "X123"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: DealResponse = response.json();
        assert_eq!(created.owner_id, Some(admin.id));

        app.post("/deals")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Acme again", "monday_item_id": "X123"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let updated: DealResponse = app
            .put(&format!("/deals/{}", created.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"stage": "Proposal sent"}))
            .await
            .json();
        assert_eq!(updated.name, "Acme");
        assert_eq!(updated.fields, created.fields);
        assert_eq!(updated.monday_item_id.as_deref(), Some("X123"));
        assert_eq!(updated.workspace_id, created.workspace_id);
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.stage, DealStage::ProposalSent);

        app.delete(&format!("/deals/{}", created.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);
        app.get(&format!("/deals/{}", created.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    /// Every synced entity rejects a second row carrying the same monday_item_id, however
    /// it arrives: created first, created second, or moved onto it by an update.
    #[sqlx::test]
    #[test_log::test]
    async fn test_monday_item_id_unique_across_entities(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let (name, value) = add_auth_headers(&admin);

        let cases = [
            ("/accounts", "Account"),
            ("/contacts", "Contact"),
            ("/deals", "Deal"),
            ("/leads", "Lead"),
            ("/opportunities", "Opportunity"),
            ("/tasks", "Task"),
        ];

        for (path, entity) in cases {
            let create = |record: &'static str, item: Option<&str>| {
                let body = match item {
                    Some(item) => json!({"name": record, "monday_item_id": item}),
                    None => json!({"name": record}),
                };
                app.post(path).add_header(name.clone(), value.clone()).json(&body)
            };
            let first_id = format!("{}-1", &path[1..]);
            let second_id = format!("{}-2", &path[1..]);

            create("First", Some(first_id.as_str())).await.assert_status(StatusCode::CREATED);
            let duplicate = create("Second", Some(first_id.as_str())).await;
            duplicate.assert_status(StatusCode::BAD_REQUEST);
            let body: serde_json::Value = duplicate.json();
            let message = body["message"].as_str().unwrap_or_default();
            assert!(message.starts_with(&format!("{entity} with monday_item_id")), "{path}: {message}");

            create("Second", Some(second_id.as_str())).await.assert_status(StatusCode::CREATED);
            create("First", Some(second_id.as_str())).await.assert_status(StatusCode::BAD_REQUEST);

            let unlinked: serde_json::Value = create("Third", None).await.json();
            let target = format!("{path}/{}", unlinked["id"]);
            app.put(&target)
                .add_header(name.clone(), value.clone())
                .json(&json!({"monday_item_id": first_id}))
                .await
                .assert_status(StatusCode::BAD_REQUEST);
            let kept: serde_json::Value = app.get(&target).add_header(name.clone(), value.clone()).await.json();
            assert!(kept["monday_item_id"].is_null(), "{path}");

            let total: serde_json::Value = app.get(path).add_header(name.clone(), value.clone()).await.json();
            assert_eq!(total["total"], 3, "{path}");
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_docs_are_served(pool: PgPool) {
        let app = create_test_app(pool).await;
        app.get("/docs").await.assert_status_ok();
        let doc: serde_json::Value = app.get("/openapi.json").await.json();
        assert!(doc["paths"]["/checklists/{id}/sync"].is_object());
    }
}
