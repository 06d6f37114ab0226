//! Outbound sync of site surveys to Monday.com boards.
//!
//! A new survey becomes an item on every configured board (see
//! [`MondayConfig`](crate::config::MondayConfig)); later edits are mirrored to the primary
//! board only. The item ids the boards hand back are stored on the checklist so the next push
//! updates instead of creating a duplicate.
//!
//! Handlers run [`push_checklist`] on a spawned task after create and update, so a board outage
//! never fails the request. `POST /checklists/{id}/sync` runs it inline and reports the outcome.

pub mod monday;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::{
    db::{errors::DbError, handlers::Checklists, models::checklists::ChecklistDBResponse},
    errors::Error,
};

pub use monday::{MondayClient, SyncError};

/// Status every new survey item starts in.
pub const INITIAL_STATUS: &str = "Working on it";

/// Index of a status label in the board's status column. Unknown labels fall back to the first.
pub fn status_index(label: &str) -> u8 {
    match label {
        "Done" => 1,
        "Stuck" => 2,
        _ => 0,
    }
}

/// The board-facing view of one checklist.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyItem {
    pub name: String,
    /// Link back to the survey in the web app
    pub survey_url: String,
    pub survey_date: Option<NaiveDate>,
    pub status: String,
    pub created_by: Option<String>,
}

impl SurveyItem {
    /// `creator` is the name of the user who created the survey, used when no surveyor name was
    /// recorded.
    pub fn from_checklist(checklist: &ChecklistDBResponse, public_url: &str, creator: Option<&str>) -> Self {
        Self {
            name: checklist.site_name.clone(),
            survey_url: format!("{}/checklists/{}", public_url.trim_end_matches('/'), checklist.id),
            survey_date: checklist.fields.survey_date,
            status: INITIAL_STATUS.to_string(),
            created_by: checklist
                .fields
                .surveyor_name
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| creator.map(str::to_string)),
        }
    }
}

/// Outcome of creating one survey on every board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatedItems {
    pub primary_item_id: Option<String>,
    pub mirror_item_id: Option<String>,
    /// One `"<board>: <reason>"` entry per board that failed
    pub errors: Vec<String>,
}

impl CreatedItems {
    /// Creation counts as a success when at least one board accepted the item.
    pub fn succeeded(&self) -> bool {
        self.primary_item_id.is_some() || self.mirror_item_id.is_some()
    }
}

/// A destination for survey items.
#[async_trait]
pub trait BoardSync: Send + Sync {
    /// Whether any board has credentials. Background pushes are skipped when none does.
    fn is_configured(&self) -> bool;

    /// Create the item on every board, collecting per-board failures.
    async fn create_item(&self, item: &SurveyItem) -> CreatedItems;

    /// Rename an existing primary-board item and refresh its date and link.
    async fn update_item(&self, item_id: &str, item: &SurveyItem) -> Result<(), SyncError>;
}

/// Push one checklist: update its primary-board item if it has one, otherwise create items and
/// store the returned ids. Returns the (possibly updated) checklist and any per-board errors
/// from a partially successful create.
#[instrument(skip(db, boards, checklist), fields(checklist_id = checklist.id), err)]
pub async fn push_checklist(
    db: &PgPool,
    boards: &dyn BoardSync,
    public_url: &str,
    checklist: ChecklistDBResponse,
    creator: Option<&str>,
) -> Result<(ChecklistDBResponse, Vec<String>), Error> {
    let item = SurveyItem::from_checklist(&checklist, public_url, creator);

    if let Some(item_id) = checklist.monday_item_id.as_deref() {
        boards.update_item(item_id, &item).await.map_err(|e| Error::Upstream {
            service: "Monday.com".to_string(),
            message: e.to_string(),
        })?;
        info!("Updated board item {item_id}");
        return Ok((checklist, Vec::new()));
    }

    let created = boards.create_item(&item).await;
    if !created.succeeded() {
        return Err(Error::Upstream {
            service: "Monday.com".to_string(),
            message: created.errors.join("; "),
        });
    }
    for error in &created.errors {
        warn!("Partial board sync failure: {error}");
    }

    let mut conn = db.acquire().await.map_err(|e| Error::Database(DbError::from(e)))?;
    let checklist = Checklists::new(&mut conn)
        .set_sync_ids(checklist.id, created.primary_item_id.as_deref(), created.mirror_item_id.as_deref())
        .await?;
    info!(
        primary = ?checklist.monday_item_id,
        mirror = ?checklist.westpark_item_id,
        "Created board items"
    );
    Ok((checklist, created.errors))
}
