//! Database repository for site-survey checklists.
//!
//! Checklists differ from the CRM entities in two ways: ownership is the `user_id` of the
//! creating surveyor rather than an assignable `owner_id`, and rows carry two external item ids,
//! one per board they were pushed to.

use crate::api::models::checklists::{ChecklistFields, ChecklistFieldsPatch};
use crate::db::{
    errors::{DbError, Result},
    handlers::{
        filters::{push_eq, push_page, push_search, push_set, push_update_target, push_visibility},
        repository::Repository,
    },
    models::checklists::{ChecklistCreateDBRequest, ChecklistDBResponse, ChecklistUpdateDBRequest},
};
use crate::types::{ChecklistId, DealId, UserId, WorkspaceId};
use sqlx::{PgConnection, Postgres, QueryBuilder, postgres::PgArguments, query::QueryAs};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["site_name", "client_name", "project_name", "site_address"];

/// Filter for listing checklists
#[derive(Debug, Clone, Default)]
pub struct ChecklistFilter {
    pub skip: i64,
    pub limit: i64,
    pub workspace_id: Option<WorkspaceId>,
    pub deal_id: Option<DealId>,
    pub user_id: Option<UserId>,
    pub search: Option<String>,
    /// Restrict to unowned surveys and surveys created by this user
    pub visible_to: Option<UserId>,
}

impl ChecklistFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a ChecklistFilter) {
    push_eq(query, "workspace_id", filter.workspace_id);
    push_eq(query, "deal_id", filter.deal_id);
    push_eq(query, "user_id", filter.user_id);
    push_search(query, SEARCH_COLUMNS, filter.search.as_deref());
    push_visibility(query, "user_id", filter.visible_to);
}

/// Bind the survey fields in declaration order, right after the site name.
fn bind_fields<'q, O>(query: QueryAs<'q, Postgres, O, PgArguments>, f: &'q ChecklistFields) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(&f.surveyor_name)
        .bind(f.survey_date)
        .bind(&f.site_address)
        .bind(&f.client_name)
        .bind(&f.client_contact)
        .bind(&f.project_name)
        .bind(f.building_level)
        .bind(f.ceiling_height)
        .bind(&f.skirting_size)
        .bind(&f.floor_type)
        .bind(&f.soffit_type)
        .bind(&f.existing_ceiling_trims)
        .bind(f.ceiling_void_depth)
        .bind(f.floor_void_depth)
        .bind(f.service_penetrations_scale)
        .bind(f.goods_lift_available)
        .bind(f.good_staircase_access)
        .bind(&f.loading_bay_restrictions)
        .bind(&f.street_restrictions)
        .bind(&f.noise_restrictions)
        .bind(&f.mullion_perimeter_details)
        .bind(f.wall_deflection_needed)
        .bind(&f.door_finish)
        .bind(&f.frame_type)
        .bind(&f.glazing_details)
        .bind(&f.head_track_detail)
        .bind(f.start_date)
        .bind(f.project_secured)
        .bind(f.programme_available)
        .bind(f.acoustic_baffles_required)
        .bind(f.fire_stopping_required)
        .bind(&f.mullion_details)
        .bind(&f.pricing_details)
        .bind(&f.supplier_notes)
        .bind(&f.site_photos)
        .bind(&f.additional_notes)
        .bind(f.deal_id)
}

fn push_field_updates<'a>(query: &mut QueryBuilder<'a, Postgres>, f: &'a ChecklistFieldsPatch) {
    push_set(query, "surveyor_name", f.surveyor_name.as_ref().map(Option::as_deref));
    push_set(query, "survey_date", f.survey_date);
    push_set(query, "site_address", f.site_address.as_ref().map(Option::as_deref));
    push_set(query, "client_name", f.client_name.as_ref().map(Option::as_deref));
    push_set(query, "client_contact", f.client_contact.as_ref().map(Option::as_deref));
    push_set(query, "project_name", f.project_name.as_ref().map(Option::as_deref));
    push_set(query, "building_level", f.building_level);
    push_set(query, "ceiling_height", f.ceiling_height);
    push_set(query, "skirting_size", f.skirting_size.as_ref().map(Option::as_deref));
    push_set(query, "floor_type", f.floor_type.as_ref().map(Option::as_deref));
    push_set(query, "soffit_type", f.soffit_type.as_ref().map(Option::as_deref));
    push_set(query, "existing_ceiling_trims", f.existing_ceiling_trims.as_ref().map(Option::as_deref));
    push_set(query, "ceiling_void_depth", f.ceiling_void_depth);
    push_set(query, "floor_void_depth", f.floor_void_depth);
    push_set(query, "service_penetrations_scale", f.service_penetrations_scale);
    push_set(query, "goods_lift_available", f.goods_lift_available);
    push_set(query, "good_staircase_access", f.good_staircase_access);
    push_set(query, "loading_bay_restrictions", f.loading_bay_restrictions.as_ref().map(Option::as_deref));
    push_set(query, "street_restrictions", f.street_restrictions.as_ref().map(Option::as_deref));
    push_set(query, "noise_restrictions", f.noise_restrictions.as_ref().map(Option::as_deref));
    push_set(query, "mullion_perimeter_details", f.mullion_perimeter_details.as_ref().map(Option::as_deref));
    push_set(query, "wall_deflection_needed", f.wall_deflection_needed);
    push_set(query, "door_finish", f.door_finish.as_ref().map(Option::as_deref));
    push_set(query, "frame_type", f.frame_type.as_ref().map(Option::as_deref));
    push_set(query, "glazing_details", f.glazing_details.as_ref().map(Option::as_deref));
    push_set(query, "head_track_detail", f.head_track_detail.as_ref().map(Option::as_deref));
    push_set(query, "start_date", f.start_date);
    push_set(query, "project_secured", f.project_secured);
    push_set(query, "programme_available", f.programme_available);
    push_set(query, "acoustic_baffles_required", f.acoustic_baffles_required);
    push_set(query, "fire_stopping_required", f.fire_stopping_required);
    push_set(query, "mullion_details", f.mullion_details.as_ref().map(Option::as_deref));
    push_set(query, "pricing_details", f.pricing_details.as_ref().map(Option::as_deref));
    push_set(query, "supplier_notes", f.supplier_notes.as_ref().map(Option::as_deref));
    push_set(query, "site_photos", f.site_photos.as_ref().map(Option::as_deref));
    push_set(query, "additional_notes", f.additional_notes.as_ref().map(Option::as_deref));
    push_set(query, "deal_id", f.deal_id);
}

pub struct Checklists<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Checklists<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ChecklistFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM checklists WHERE 1=1");
        push_filters(&mut query, filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Append a photo URL to the survey's photo list.
    #[instrument(skip(self), err)]
    pub async fn append_photo(&mut self, id: ChecklistId, url: &str) -> Result<ChecklistDBResponse> {
        let checklist = sqlx::query_as::<_, ChecklistDBResponse>(
            r#"
            UPDATE checklists SET
                site_photos = array_append(COALESCE(site_photos, '{}'), $2),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(url)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(checklist)
    }

    /// Record the item ids returned by the board tool. Ids that are `None` are left unchanged,
    /// and `updated_at` is not touched since this is bookkeeping rather than a user edit.
    #[instrument(skip(self), err)]
    pub async fn set_sync_ids(
        &mut self,
        id: ChecklistId,
        monday_item_id: Option<&str>,
        westpark_item_id: Option<&str>,
    ) -> Result<ChecklistDBResponse> {
        let checklist = sqlx::query_as::<_, ChecklistDBResponse>(
            r#"
            UPDATE checklists SET
                monday_item_id = COALESCE($2, monday_item_id),
                westpark_item_id = COALESCE($3, westpark_item_id)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(monday_item_id)
        .bind(westpark_item_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(checklist)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Checklists<'c> {
    type CreateRequest = ChecklistCreateDBRequest;
    type UpdateRequest = ChecklistUpdateDBRequest;
    type Response = ChecklistDBResponse;
    type Id = ChecklistId;
    type Filter = ChecklistFilter;

    #[instrument(skip(self, request), fields(site_name = %request.site_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let query = sqlx::query_as::<_, ChecklistDBResponse>(
            r#"
            INSERT INTO checklists (
                site_name,
                surveyor_name, survey_date, site_address, client_name, client_contact, project_name,
                building_level, ceiling_height, skirting_size, floor_type, soffit_type,
                existing_ceiling_trims, ceiling_void_depth, floor_void_depth,
                service_penetrations_scale, goods_lift_available, good_staircase_access,
                loading_bay_restrictions, street_restrictions, noise_restrictions,
                mullion_perimeter_details, wall_deflection_needed, door_finish, frame_type,
                glazing_details, head_track_detail,
                start_date, project_secured, programme_available,
                acoustic_baffles_required, fire_stopping_required, mullion_details,
                pricing_details, supplier_notes,
                site_photos, additional_notes,
                deal_id,
                workspace_id, user_id, monday_item_id, westpark_item_id
            )
            VALUES (
                $1,
                $2, $3, $4, $5, $6, $7,
                $8, $9, $10, $11, $12,
                $13, $14, $15,
                $16, COALESCE($17, FALSE), COALESCE($18, FALSE),
                $19, $20, $21,
                $22, COALESCE($23, FALSE), $24, $25,
                $26, $27,
                $28, COALESCE($29, FALSE), COALESCE($30, FALSE),
                COALESCE($31, FALSE), COALESCE($32, FALSE), $33,
                $34, $35,
                COALESCE($36, '{}'), $37,
                $38,
                $39, $40, $41, $42
            )
            RETURNING *
            "#,
        )
        .bind(&request.site_name);

        let checklist = bind_fields(query, &request.fields)
            .bind(request.workspace_id)
            .bind(request.user_id)
            .bind(&request.monday_item_id)
            .bind(&request.westpark_item_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(checklist)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let checklist = sqlx::query_as::<_, ChecklistDBResponse>("SELECT * FROM checklists WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(checklist)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM checklists WHERE 1=1");
        push_filters(&mut query, filter);
        push_page(&mut query, filter.skip, filter.limit);

        let checklists = query.build_query_as::<ChecklistDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(checklists)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM checklists WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::new("UPDATE checklists SET updated_at = NOW()");
        push_set(&mut query, "site_name", request.site_name.as_deref());
        push_field_updates(&mut query, &request.fields);
        push_set(&mut query, "workspace_id", request.workspace_id);
        push_update_target(&mut query, id);

        let checklist = query
            .build_query_as::<ChecklistDBResponse>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(checklist)
    }
}
