//! API request/response models for deals.

use super::pagination::Pagination;
use super::pipeline::DealStage;
use crate::db::models::deals::DealDBResponse;
use crate::errors::Error;
use crate::types::{DealId, UserId, WorkspaceId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, rust::double_option, serde_as};
use utoipa::{IntoParams, ToSchema};

/// The free-form deal columns shared by create, update and response bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct DealFields {
    pub status: Option<String>,
    pub grade: Option<String>,
    #[schema(value_type = Option<String>, example = "25000.00")]
    pub value: Option<Decimal>,
    pub deal_type: Option<String>,
    /// Contract length in months
    pub deal_length: Option<i32>,
    pub products: Option<Vec<String>>,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub next_interaction: Option<NaiveDate>,
    pub proposal_sent_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    /// Percentage, 0 to 100
    pub close_probability: Option<i32>,
    pub location_address: Option<String>,
    pub link_url: Option<String>,
    pub files: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl DealFields {
    pub fn validate(&self) -> Result<(), Error> {
        validate_probability(self.close_probability)
    }
}

/// Close probabilities are whole percentages.
pub fn validate_probability(probability: Option<i32>) -> Result<(), Error> {
    match probability {
        Some(p) if !(0..=100).contains(&p) => Err(Error::BadRequest {
            message: format!("close_probability must be between 0 and 100, got {p}"),
        }),
        _ => Ok(()),
    }
}

/// Partial update of [`DealFields`]. A missing key leaves the column unchanged and an explicit
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DealFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub status: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub grade: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub value: Option<Option<Decimal>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub deal_type: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub deal_length: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub products: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub company_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub next_interaction: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub proposal_sent_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub close_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub close_probability: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub location_address: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub link_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub files: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl DealFieldsPatch {
    pub fn validate(&self) -> Result<(), Error> {
        validate_probability(self.close_probability.flatten())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DealCreate {
    pub name: String,
    /// Defaults to `Prospects`
    pub stage: Option<DealStage>,
    #[serde(flatten)]
    pub fields: DealFields,
    pub workspace_id: Option<WorkspaceId>,
    /// Defaults to the creating user
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DealUpdate {
    pub name: Option<String>,
    pub stage: Option<DealStage>,
    #[serde(flatten)]
    pub fields: DealFieldsPatch,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub owner_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub monday_item_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DealResponse {
    pub id: DealId,
    pub name: String,
    pub stage: DealStage,
    #[serde(flatten)]
    pub fields: DealFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DealDBResponse> for DealResponse {
    fn from(db: DealDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            stage: db.stage,
            fields: db.fields,
            workspace_id: db.workspace_id,
            owner_id: db.owner_id,
            owner_name: db.owner_name,
            monday_item_id: db.monday_item_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing deals
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListDealsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub workspace_id: Option<WorkspaceId>,

    pub stage: Option<DealStage>,
    pub grade: Option<String>,
    pub deal_type: Option<String>,
    pub owner_name: Option<String>,

    /// Case-insensitive substring match on name, company, contact or email
    pub search: Option<String>,
}
