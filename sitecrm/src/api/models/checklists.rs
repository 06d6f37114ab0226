//! API request/response models for site-survey checklists.

use super::pagination::Pagination;
use crate::db::models::checklists::ChecklistDBResponse;
use crate::errors::Error;
use crate::types::{ChecklistId, DealId, UserId, WorkspaceId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, rust::double_option, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Everything a surveyor records on site, apart from the site name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ChecklistFields {
    // Header
    pub surveyor_name: Option<String>,
    pub survey_date: Option<NaiveDate>,
    pub site_address: Option<String>,
    pub client_name: Option<String>,
    pub client_contact: Option<String>,
    pub project_name: Option<String>,

    // Building
    pub building_level: Option<i32>,
    /// Metres, 0 to 999.99
    #[schema(value_type = Option<String>, example = "2.70")]
    pub ceiling_height: Option<Decimal>,
    pub skirting_size: Option<String>,
    pub floor_type: Option<String>,
    pub soffit_type: Option<String>,
    pub existing_ceiling_trims: Option<String>,
    pub ceiling_void_depth: Option<i32>,
    pub floor_void_depth: Option<i32>,

    // Access
    /// 1 (few) to 10 (many)
    pub service_penetrations_scale: Option<i32>,
    pub goods_lift_available: Option<bool>,
    pub good_staircase_access: Option<bool>,
    pub loading_bay_restrictions: Option<String>,
    pub street_restrictions: Option<String>,
    pub noise_restrictions: Option<String>,

    // Finishes
    pub mullion_perimeter_details: Option<String>,
    pub wall_deflection_needed: Option<bool>,
    pub door_finish: Option<String>,
    pub frame_type: Option<String>,
    pub glazing_details: Option<String>,
    pub head_track_detail: Option<String>,

    // Project status
    pub start_date: Option<NaiveDate>,
    pub project_secured: Option<bool>,
    pub programme_available: Option<bool>,

    // Technical
    pub acoustic_baffles_required: Option<bool>,
    pub fire_stopping_required: Option<bool>,
    pub mullion_details: Option<String>,

    // Commercial
    pub pricing_details: Option<String>,
    pub supplier_notes: Option<String>,

    // Documentation
    /// URLs under `/uploads/`
    pub site_photos: Option<Vec<String>>,
    pub additional_notes: Option<String>,

    pub deal_id: Option<DealId>,
}

impl ChecklistFields {
    pub fn validate(&self) -> Result<(), Error> {
        validate_measurements(self.ceiling_height, self.service_penetrations_scale)
    }
}

fn validate_measurements(ceiling_height: Option<Decimal>, penetrations_scale: Option<i32>) -> Result<(), Error> {
    if let Some(height) = ceiling_height
        && (height < Decimal::ZERO || height > Decimal::new(99999, 2))
    {
        return Err(Error::BadRequest {
            message: format!("ceiling_height must be between 0 and 999.99, got {height}"),
        });
    }
    if let Some(scale) = penetrations_scale
        && !(1..=10).contains(&scale)
    {
        return Err(Error::BadRequest {
            message: format!("service_penetrations_scale must be between 1 and 10, got {scale}"),
        });
    }
    Ok(())
}

/// Partial update of [`ChecklistFields`]. A missing key leaves the column unchanged and an explicit
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChecklistFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub surveyor_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub survey_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub site_address: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub client_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub client_contact: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub project_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub building_level: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub ceiling_height: Option<Option<Decimal>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub skirting_size: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub floor_type: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub soffit_type: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub existing_ceiling_trims: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub ceiling_void_depth: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub floor_void_depth: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub service_penetrations_scale: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub goods_lift_available: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub good_staircase_access: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub loading_bay_restrictions: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub street_restrictions: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub noise_restrictions: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub mullion_perimeter_details: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub wall_deflection_needed: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub door_finish: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub frame_type: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub glazing_details: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub head_track_detail: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub project_secured: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub programme_available: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub acoustic_baffles_required: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub fire_stopping_required: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub mullion_details: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub pricing_details: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub supplier_notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub site_photos: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub additional_notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub deal_id: Option<Option<DealId>>,
}

impl ChecklistFieldsPatch {
    pub fn validate(&self) -> Result<(), Error> {
        validate_measurements(self.ceiling_height.flatten(), self.service_penetrations_scale.flatten())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChecklistCreate {
    pub site_name: String,
    #[serde(flatten)]
    pub fields: ChecklistFields,
    pub workspace_id: Option<WorkspaceId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChecklistUpdate {
    pub site_name: Option<String>,
    #[serde(flatten)]
    pub fields: ChecklistFieldsPatch,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub workspace_id: Option<Option<WorkspaceId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChecklistResponse {
    pub id: ChecklistId,
    pub site_name: String,
    #[serde(flatten)]
    pub fields: ChecklistFields,
    pub workspace_id: Option<WorkspaceId>,
    /// The user who created the survey
    pub user_id: Option<UserId>,
    /// Item id on the primary board
    pub monday_item_id: Option<String>,
    /// Item id on the mirror board
    pub westpark_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ChecklistDBResponse> for ChecklistResponse {
    fn from(db: ChecklistDBResponse) -> Self {
        Self {
            id: db.id,
            site_name: db.site_name,
            fields: db.fields,
            workspace_id: db.workspace_id,
            user_id: db.user_id,
            monday_item_id: db.monday_item_id,
            westpark_item_id: db.westpark_item_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing checklists
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListChecklistsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub workspace_id: Option<WorkspaceId>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub deal_id: Option<DealId>,

    /// Only honoured for admins; regular users always see their own surveys
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub user_id: Option<UserId>,

    /// Case-insensitive substring match on site, client, project or address
    pub search: Option<String>,
}

/// Outcome of a manual push to the board tool.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChecklistSyncResponse {
    pub checklist: ChecklistResponse,
    /// Per-board failures when only some boards accepted the item
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_height_bounds() {
        let mut fields = ChecklistFields {
            ceiling_height: Some(Decimal::new(270, 2)),
            ..Default::default()
        };
        assert!(fields.validate().is_ok());

        fields.ceiling_height = Some(Decimal::new(99999, 2));
        assert!(fields.validate().is_ok());

        fields.ceiling_height = Some(Decimal::new(100000, 2));
        assert!(fields.validate().is_err());

        fields.ceiling_height = Some(Decimal::new(-1, 2));
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_service_penetrations_scale_bounds() {
        for (scale, ok) in [(0, false), (1, true), (10, true), (11, false)] {
            let fields = ChecklistFields {
                service_penetrations_scale: Some(scale),
                ..Default::default()
            };
            assert_eq!(fields.validate().is_ok(), ok, "scale {scale}");
        }
    }

    #[test]
    fn test_create_body_parses_survey_form() {
        let body: ChecklistCreate = serde_json::from_value(serde_json::json!({
            "site_name": "Level 4, 1 Canada Square",
            "surveyor_name": "Sam",
            "survey_date": "2025-02-14",
            "ceiling_height": 2.7,
            "goods_lift_available": true,
            "service_penetrations_scale": 4
        }))
        .unwrap();

        assert_eq!(body.fields.surveyor_name.as_deref(), Some("Sam"));
        assert_eq!(body.fields.goods_lift_available, Some(true));
        assert_eq!(body.fields.fire_stopping_required, None);
        assert!(body.fields.validate().is_ok());
    }
}
