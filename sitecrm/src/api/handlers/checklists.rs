//! Site-survey checklists.
//!
//! Surveys are owned by the user who created them. Creating or editing a survey pushes it to the
//! board tool on a spawned task; `POST /checklists/{id}/sync` does the same push inline so the
//! caller can see what failed.

use std::path::Path as FsPath;

use crate::api::handlers::{ensure_name, not_found};
use crate::api::models::checklists::{ChecklistCreate, ChecklistResponse, ChecklistSyncResponse, ChecklistUpdate, ListChecklistsQuery};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{ensure_visible, visibility_scope};
use crate::db::handlers::{Checklists, Repository, checklists::ChecklistFilter};
use crate::db::models::checklists::{ChecklistCreateDBRequest, ChecklistDBResponse, ChecklistUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::sync::push_checklist;
use crate::types::ChecklistId;
use crate::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::Field},
    http::StatusCode,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Extension used when an upload has no usable file name.
const DEFAULT_PHOTO_EXTENSION: &str = ".jpg";

/// Push a survey to the boards without holding up the response.
fn spawn_board_push(state: &AppState, checklist: ChecklistDBResponse, creator: Option<String>) {
    let db = state.db.clone();
    let boards = state.board_sync.clone();
    let public_url = state.config.public_url.clone();
    let checklist_id = checklist.id;

    tokio::spawn(async move {
        match push_checklist(&db, boards.as_ref(), &public_url, checklist, creator.as_deref()).await {
            Ok((_, errors)) if errors.is_empty() => debug!(checklist_id, "Background board sync finished"),
            Ok((_, errors)) => warn!(checklist_id, ?errors, "Background board sync partially failed"),
            Err(e) => error!(checklist_id, error = %e, "Background board sync failed"),
        }
    });
}

/// `.png` for `site.png`, the default for names without a short alphanumeric extension.
fn photo_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_PHOTO_EXTENSION.to_string())
}

async fn load_visible(state: &AppState, current_user: &CurrentUser, id: ChecklistId) -> Result<ChecklistDBResponse> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let checklist = Checklists::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found("Checklist", id))?;
    ensure_visible(current_user, checklist.user_id, "Checklist", id)?;
    Ok(checklist)
}

#[utoipa::path(
    get,
    path = "/checklists",
    tag = "checklists",
    summary = "List checklists",
    description = "Newest first. Non-admins only see their own surveys and the `user_id` filter is ignored for them.",
    params(ListChecklistsQuery),
    responses(
        (status = 200, description = "Page of checklists", body = PaginatedResponse<ChecklistResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_checklists(
    State(state): State<AppState>,
    Query(query): Query<ListChecklistsQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<ChecklistResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = ChecklistFilter {
        skip,
        limit,
        workspace_id: query.workspace_id,
        deal_id: query.deal_id,
        user_id: query.user_id.filter(|_| current_user.is_admin()),
        search: query.search,
        visible_to: visibility_scope(&current_user),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Checklists::new(&mut conn);
    let total = repo.count(&filter).await?;
    let checklists = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        checklists.into_iter().map(ChecklistResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/checklists/{id}",
    tag = "checklists",
    summary = "Get checklist",
    params(("id" = i64, Path, description = "Checklist ID")),
    responses(
        (status = 200, description = "Checklist", body = ChecklistResponse),
        (status = 404, description = "Checklist not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(checklist_id = id))]
pub async fn get_checklist(
    State(state): State<AppState>,
    Path(id): Path<ChecklistId>,
    current_user: CurrentUser,
) -> Result<Json<ChecklistResponse>> {
    let checklist = load_visible(&state, &current_user, id).await?;
    Ok(Json(ChecklistResponse::from(checklist)))
}

#[utoipa::path(
    post,
    path = "/checklists",
    tag = "checklists",
    summary = "Create checklist",
    description = "The survey is owned by the caller and is pushed to the board tool in the background.",
    request_body = ChecklistCreate,
    responses(
        (status = 201, description = "Checklist created", body = ChecklistResponse),
        (status = 400, description = "Invalid field value"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_checklist(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<ChecklistCreate>,
) -> Result<(StatusCode, Json<ChecklistResponse>)> {
    ensure_name(&create.site_name)?;
    create.fields.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let checklist = Checklists::new(&mut conn)
        .create(&ChecklistCreateDBRequest::new(create, current_user.id))
        .await?;
    info!("Created checklist {} for user {}", checklist.id, current_user.id);

    if state.board_sync.is_configured() {
        spawn_board_push(&state, checklist.clone(), current_user.full_name.clone());
    }
    Ok((StatusCode::CREATED, Json(ChecklistResponse::from(checklist))))
}

#[utoipa::path(
    put,
    path = "/checklists/{id}",
    tag = "checklists",
    summary = "Update checklist",
    description = "Only the supplied fields change. Surveys already on the primary board are refreshed there in the background.",
    request_body = ChecklistUpdate,
    params(("id" = i64, Path, description = "Checklist ID")),
    responses(
        (status = 200, description = "Checklist updated", body = ChecklistResponse),
        (status = 400, description = "Invalid field value"),
        (status = 404, description = "Checklist not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(checklist_id = id))]
pub async fn update_checklist(
    State(state): State<AppState>,
    Path(id): Path<ChecklistId>,
    current_user: CurrentUser,
    Json(update): Json<ChecklistUpdate>,
) -> Result<Json<ChecklistResponse>> {
    if let Some(site_name) = &update.site_name {
        ensure_name(site_name)?;
    }
    update.fields.validate()?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Checklists::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Checklist", id))?;
    ensure_visible(&current_user, existing.user_id, "Checklist", id)?;
    let checklist = repo.update(id, &ChecklistUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    if checklist.monday_item_id.is_some() && state.board_sync.is_configured() {
        spawn_board_push(&state, checklist.clone(), current_user.full_name.clone());
    }
    Ok(Json(ChecklistResponse::from(checklist)))
}

#[utoipa::path(
    delete,
    path = "/checklists/{id}",
    tag = "checklists",
    summary = "Delete checklist",
    description = "Board items are left in place.",
    params(("id" = i64, Path, description = "Checklist ID")),
    responses(
        (status = 204, description = "Checklist deleted"),
        (status = 404, description = "Checklist not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(checklist_id = id))]
pub async fn delete_checklist(State(state): State<AppState>, Path(id): Path<ChecklistId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Checklists::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found("Checklist", id))?;
    ensure_visible(&current_user, existing.user_id, "Checklist", id)?;
    repo.delete(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/checklists/{id}/photos",
    tag = "checklists",
    summary = "Upload site photo",
    description = "Stores the `file` part under the uploads directory and appends its `/uploads/...` URL to `site_photos`.",
    request_body(content_type = "multipart/form-data", description = "A single `file` part"),
    params(("id" = i64, Path, description = "Checklist ID")),
    responses(
        (status = 200, description = "Photo stored", body = ChecklistResponse),
        (status = 400, description = "Missing file part or file too large"),
        (status = 404, description = "Checklist not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(checklist_id = id))]
pub async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<ChecklistId>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<ChecklistResponse>> {
    load_visible(&state, &current_user, id).await?;

    let uploads = &state.config.uploads;
    let mut stored = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {e}"),
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = format!("{}{}", Uuid::new_v4(), photo_extension(field.file_name()));
        let path = uploads.dir.join(&file_name);
        tokio::fs::create_dir_all(&uploads.dir).await.map_err(|e| Error::Internal {
            operation: format!("create uploads directory: {e}"),
        })?;
        let file = tokio::fs::File::create(&path).await.map_err(|e| Error::Internal {
            operation: format!("create upload file: {e}"),
        })?;

        match write_upload(&mut field, file, uploads.max_file_size).await {
            Ok(total_size) => debug!(bytes = total_size, "Stored photo {}", path.display()),
            Err(e) => {
                discard_upload(&path).await;
                return Err(e);
            }
        }
        stored = Some((file_name, path));
        break;
    }

    let (file_name, path) = stored.ok_or_else(|| Error::BadRequest {
        message: "Multipart field 'file' is required".to_string(),
    })?;

    let appended = match state.db.acquire().await {
        Ok(mut conn) => Checklists::new(&mut conn)
            .append_photo(id, &format!("/uploads/{file_name}"))
            .await
            .map_err(Error::from),
        Err(e) => Err(Error::Database(e.into())),
    };
    if appended.is_err() {
        discard_upload(&path).await;
    }
    Ok(Json(ChecklistResponse::from(appended?)))
}

/// Stream one multipart field into `file`, returning the number of bytes written.
async fn write_upload(field: &mut Field<'_>, mut file: tokio::fs::File, max_file_size: usize) -> Result<usize> {
    let mut total_size = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to read file chunk: {e}"),
    })? {
        total_size += chunk.len();
        if total_size > max_file_size {
            return Err(Error::BadRequest {
                message: format!("File size exceeds maximum allowed size of {max_file_size} bytes"),
            });
        }
        file.write_all(&chunk).await.map_err(|e| Error::Internal {
            operation: format!("write upload file: {e}"),
        })?;
    }
    file.flush().await.map_err(|e| Error::Internal {
        operation: format!("write upload file: {e}"),
    })?;
    Ok(total_size)
}

/// Remove an upload that never made it onto a checklist.
async fn discard_upload(path: &FsPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove abandoned upload {}: {e}", path.display());
    }
}

#[utoipa::path(
    post,
    path = "/checklists/{id}/sync",
    tag = "checklists",
    summary = "Push checklist to the boards",
    description = "Creates the board items, or refreshes the primary item if the survey already has one, and waits for the result.",
    params(("id" = i64, Path, description = "Checklist ID")),
    responses(
        (status = 200, description = "Checklist pushed; `errors` lists boards that rejected it", body = ChecklistSyncResponse),
        (status = 404, description = "Checklist not found"),
        (status = 500, description = "Every board rejected the push"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(checklist_id = id))]
pub async fn sync_checklist(
    State(state): State<AppState>,
    Path(id): Path<ChecklistId>,
    current_user: CurrentUser,
) -> Result<Json<ChecklistSyncResponse>> {
    let checklist = load_visible(&state, &current_user, id).await?;
    let (checklist, errors) = push_checklist(
        &state.db,
        state.board_sync.as_ref(),
        &state.config.public_url,
        checklist,
        current_user.full_name.as_deref(),
    )
    .await?;

    Ok(Json(ChecklistSyncResponse {
        checklist: ChecklistResponse::from(checklist),
        errors,
    }))
}

#[cfg(test)]
mod tests {
    use super::photo_extension;
    use crate::api::models::checklists::{ChecklistResponse, ChecklistSyncResponse};
    use crate::api::models::pagination::PaginatedResponse;
    use crate::api::models::users::Role;
    use crate::test_utils::{add_auth_headers, create_test_app, create_test_app_with_config, create_test_config, create_test_user};
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::json;
    use sqlx::PgPool;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method},
    };

    #[test]
    fn test_photo_extension() {
        assert_eq!(photo_extension(Some("Site.PNG")), ".png");
        assert_eq!(photo_extension(Some("IMG_0001.jpeg")), ".jpeg");
        assert_eq!(photo_extension(Some("no-extension")), ".jpg");
        assert_eq!(photo_extension(Some("weird.ex/t")), ".jpg");
        assert_eq!(photo_extension(None), ".jpg");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_checklists_are_owned_by_creator(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let response = app
            .post("/checklists")
            .add_header(add_auth_headers(&alice).0, add_auth_headers(&alice).1)
            .json(&json!({"site_name": "Dock 4", "client_name": "Harbour Ltd", "service_penetrations_scale": 3}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let checklist: ChecklistResponse = response.json();
        assert_eq!(checklist.user_id, Some(alice.id));

        app.post("/checklists")
            .add_header(add_auth_headers(&bob).0, add_auth_headers(&bob).1)
            .json(&json!({"site_name": "Bob's site"}))
            .await
            .assert_status(StatusCode::CREATED);

        // Bob cannot widen his view with user_id
        let page: PaginatedResponse<ChecklistResponse> = app
            .get(&format!("/checklists?user_id={}", alice.id))
            .add_header(add_auth_headers(&bob).0, add_auth_headers(&bob).1)
            .await
            .json();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].site_name, "Bob's site");

        app.get(&format!("/checklists/{}", checklist.id))
            .add_header(add_auth_headers(&bob).0, add_auth_headers(&bob).1)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let page: PaginatedResponse<ChecklistResponse> = app
            .get(&format!("/checklists?user_id={}", alice.id))
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .json();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, checklist.id);

        let page: PaginatedResponse<ChecklistResponse> = app
            .get("/checklists?search=harbour")
            .add_header(add_auth_headers(&admin).0, add_auth_headers(&admin).1)
            .await
            .json();
        assert_eq!(page.total, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_validates_and_patches(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let checklist: ChecklistResponse = app
            .post("/checklists")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"site_name": "Level 2", "floor_type": "Raised access"}))
            .await
            .json();

        app.put(&format!("/checklists/{}", checklist.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"ceiling_height": "1000.00"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let updated: ChecklistResponse = app
            .put(&format!("/checklists/{}", checklist.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"goods_lift_available": true}))
            .await
            .json();
        assert_eq!(updated.fields.goods_lift_available, Some(true));
        assert_eq!(updated.fields.floor_type.as_deref(), Some("Raised access"));
        assert!(updated.updated_at.is_some());

        app.post("/checklists")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"site_name": " "}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_photo_upload(pool: PgPool) {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.uploads.dir = uploads.path().to_path_buf();
        let app = create_test_app_with_config(pool.clone(), config).await;
        let user = create_test_user(&pool, Role::User).await;

        let checklist: ChecklistResponse = app
            .post("/checklists")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"site_name": "Dock 4"}))
            .await
            .json();

        let form = MultipartForm::new().add_part("file", Part::bytes(b"not really a png".as_slice()).file_name("front.PNG"));
        let response = app
            .post(&format!("/checklists/{}/photos", checklist.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .multipart(form)
            .await;
        response.assert_status_ok();
        let checklist: ChecklistResponse = response.json();

        let photos = checklist.fields.site_photos.unwrap();
        assert_eq!(photos.len(), 1);
        assert!(photos[0].starts_with("/uploads/"));
        assert!(photos[0].ends_with(".png"));

        let stored = uploads.path().join(photos[0].trim_start_matches("/uploads/"));
        assert_eq!(std::fs::read(stored).unwrap(), b"not really a png");

        let served = app.get(&photos[0]).await;
        served.assert_status_ok();
        assert_eq!(served.as_bytes().as_ref(), b"not really a png");

        let form = MultipartForm::new().add_text("caption", "no file here");
        app.post(&format!("/checklists/{}/photos", checklist.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failed_upload_leaves_no_file(pool: PgPool) {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.uploads.dir = uploads.path().to_path_buf();
        config.uploads.max_file_size = 16;
        let app = create_test_app_with_config(pool.clone(), config).await;
        let user = create_test_user(&pool, Role::User).await;
        let other = create_test_user(&pool, Role::User).await;

        let checklist: ChecklistResponse = app
            .post("/checklists")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"site_name": "Dock 4"}))
            .await
            .json();
        let target = format!("/checklists/{}/photos", checklist.id);
        let stored_files = || std::fs::read_dir(uploads.path()).map(|dir| dir.count()).unwrap_or(0);

        // Body ends before the closing boundary
        let truncated = "--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.jpg\"\r\n\
                         Content-Type: image/jpeg\r\n\r\npartial";
        app.post(&target)
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .text(truncated)
            .content_type("multipart/form-data; boundary=XYZ")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(stored_files(), 0);

        let oversized = MultipartForm::new().add_part("file", Part::bytes(vec![0u8; 64]).file_name("big.jpg"));
        app.post(&target)
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .multipart(oversized)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(stored_files(), 0);

        let form = MultipartForm::new().add_part("file", Part::bytes(b"tiny".as_slice()).file_name("a.jpg"));
        app.post(&target)
            .add_header(add_auth_headers(&other).0, add_auth_headers(&other).1)
            .multipart(form)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        let form = MultipartForm::new().add_part("file", Part::bytes(b"tiny".as_slice()).file_name("a.jpg"));
        app.post(&format!("/checklists/{}/photos", checklist.id + 1000))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .multipart(form)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        assert_eq!(stored_files(), 0);

        let form = MultipartForm::new().add_part("file", Part::bytes(b"tiny".as_slice()).file_name("a.jpg"));
        app.post(&target)
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .multipart(form)
            .await
            .assert_status_ok();
        assert_eq!(stored_files(), 1);

        // A photo the database refuses to record is removed again
        sqlx::raw_sql(
            "CREATE FUNCTION reject_update() RETURNS trigger AS $$ BEGIN RAISE EXCEPTION 'read only'; END $$ LANGUAGE plpgsql;
             CREATE TRIGGER checklists_read_only BEFORE UPDATE ON checklists FOR EACH ROW EXECUTE FUNCTION reject_update();",
        )
        .execute(&pool)
        .await
        .unwrap();
        let form = MultipartForm::new().add_part("file", Part::bytes(b"tiny".as_slice()).file_name("b.jpg"));
        app.post(&target)
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .multipart(form)
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(stored_files(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_manual_sync_reports_partial_failure(pool: PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("5090310184"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"create_item": {"id": "9001"}}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("5091667006"))
            .respond_with(ResponseTemplate::new(500).set_body_string("board offline"))
            .mount(&server)
            .await;

        let mut config = create_test_config();
        config.monday.api_url = server.uri().parse().unwrap();
        config.monday.primary.token = Some("primary-token".to_string());
        config.monday.mirror.token = Some("mirror-token".to_string());
        let app = create_test_app_with_config(pool.clone(), config).await;
        let user = create_test_user(&pool, Role::User).await;

        // Inserted directly so no background push races the manual one
        let id: i64 = sqlx::query_scalar("INSERT INTO checklists (site_name, user_id) VALUES ('Dock 4', $1) RETURNING id")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();

        let response = app
            .post(&format!("/checklists/{id}/sync"))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .await;
        response.assert_status_ok();
        let body: ChecklistSyncResponse = response.json();
        assert_eq!(body.checklist.monday_item_id.as_deref(), Some("9001"));
        assert_eq!(body.checklist.westpark_item_id, None);
        assert_eq!(body.errors.len(), 1);
        assert!(body.errors[0].contains("board offline"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_manual_sync_without_tokens_is_upstream_error(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let checklist: ChecklistResponse = app
            .post("/checklists")
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .json(&json!({"site_name": "Dock 4"}))
            .await
            .json();

        let response = app
            .post(&format!("/checklists/{}/sync", checklist.id))
            .add_header(add_auth_headers(&user).0, add_auth_headers(&user).1)
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.text().contains("Monday.com"));
    }
}
