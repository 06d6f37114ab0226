use crate::api::handlers::not_found;
use crate::api::models::chat::{ChatRequest, ChatResponse};
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::visibility_scope;
use crate::chat::{build_messages, render_context};
use crate::db::handlers::{Insights, Repository, Workspaces};
use crate::errors::{Error, Result};
use crate::AppState;
use axum::{Json, extract::State};

#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    summary = "Ask the pipeline assistant",
    description = "Answers from a snapshot of the caller's visible deals and tasks, optionally limited to one workspace.",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Empty message"),
        (status = 404, description = "Workspace not found"),
        (status = 500, description = "The chat provider failed or is not configured"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(workspace_id = ?request.workspace_id))]
pub async fn chat(State(state): State<AppState>, current_user: CurrentUser, Json(request): Json<ChatRequest>) -> Result<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "message must not be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let workspace_name = match request.workspace_id {
        Some(id) => Some(
            Workspaces::new(&mut conn)
                .get_by_id(id)
                .await?
                .ok_or_else(|| not_found("Workspace", id))?
                .name,
        ),
        None => None,
    };
    let summary = Insights::new(&mut conn)
        .workspace_summary(request.workspace_id, visibility_scope(&current_user))
        .await?;
    // Release the connection before waiting on the provider
    drop(conn);

    let context = render_context(workspace_name.as_deref(), &summary);
    let messages = build_messages(&context, &request.conversation_history, &request.message);
    let response = state.chat.complete(&messages).await?;

    Ok(Json(ChatResponse { response }))
}
