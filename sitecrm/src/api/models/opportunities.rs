//! API request/response models for opportunities.

use super::deals::validate_probability;
use super::pagination::Pagination;
use super::pipeline::OpportunityStage;
use crate::db::models::opportunities::OpportunityDBResponse;
use crate::errors::Error;
use crate::types::{OpportunityId, UserId, WorkspaceId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, rust::double_option, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct OpportunityFields {
    pub grade: Option<String>,
    pub contact_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(value_type = Option<String>, example = "48000.00")]
    pub sale_price: Option<Decimal>,
    pub close_probability: Option<i32>,
    pub survey_required: Option<bool>,
    pub quote_template: Option<String>,
    pub next_interaction: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub quote_sent_date: Option<NaiveDate>,
    pub decision_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub location_address: Option<String>,
    pub link: Option<String>,
}

impl OpportunityFields {
    pub fn validate(&self) -> Result<(), Error> {
        validate_probability(self.close_probability)
    }
}

/// Partial update of [`OpportunityFields`]. A missing key leaves the column unchanged and an explicit
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OpportunityFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub grade: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub company_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub sale_price: Option<Option<Decimal>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub close_probability: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub survey_required: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub quote_template: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub next_interaction: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub return_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub quote_sent_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub decision_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub close_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub location_address: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub link: Option<Option<String>>,
}

impl OpportunityFieldsPatch {
    pub fn validate(&self) -> Result<(), Error> {
        validate_probability(self.close_probability.flatten())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpportunityCreate {
    pub name: String,
    /// Defaults to `Leads`
    pub stage: Option<OpportunityStage>,
    #[serde(flatten)]
    pub fields: OpportunityFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OpportunityUpdate {
    pub name: Option<String>,
    pub stage: Option<OpportunityStage>,
    #[serde(flatten)]
    pub fields: OpportunityFieldsPatch,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub workspace_id: Option<Option<WorkspaceId>>,
    pub owner_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub owner_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub monday_item_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpportunityResponse {
    pub id: OpportunityId,
    pub name: String,
    pub stage: OpportunityStage,
    #[serde(flatten)]
    pub fields: OpportunityFields,
    pub workspace_id: Option<WorkspaceId>,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub monday_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<OpportunityDBResponse> for OpportunityResponse {
    fn from(db: OpportunityDBResponse) -> Self {
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

/// Query parameters for listing opportunities
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListOpportunitiesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub workspace_id: Option<WorkspaceId>,

    pub stage: Option<OpportunityStage>,
    pub grade: Option<String>,
    pub owner_name: Option<String>,

    /// Case-insensitive substring match on name, company or contact
    pub search: Option<String>,
}
