//! Database repository for workspaces.

use crate::db::{
    errors::{DbError, Result},
    handlers::{
        filters::{push_eq, push_search, push_set, push_update_target},
        repository::Repository,
    },
    models::workspaces::{WorkspaceCreateDBRequest, WorkspaceDBResponse, WorkspaceUpdateDBRequest},
};
use crate::types::WorkspaceId;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "description"];

/// Filter for listing workspaces
#[derive(Debug, Clone, Default)]
pub struct WorkspaceFilter {
    pub skip: i64,
    pub limit: i64,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl WorkspaceFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_is_active(mut self, is_active: Option<bool>) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search;
        self
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a WorkspaceFilter) {
    push_eq(query, "is_active", filter.is_active);
    push_search(query, SEARCH_COLUMNS, filter.search.as_deref());
}

pub struct Workspaces<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Workspaces<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &WorkspaceFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM workspaces WHERE 1=1");
        push_filters(&mut query, filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_name(&mut self, name: &str) -> Result<Option<WorkspaceDBResponse>> {
        let workspace = sqlx::query_as::<_, WorkspaceDBResponse>("SELECT * FROM workspaces WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(workspace)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Workspaces<'c> {
    type CreateRequest = WorkspaceCreateDBRequest;
    type UpdateRequest = WorkspaceUpdateDBRequest;
    type Response = WorkspaceDBResponse;
    type Id = WorkspaceId;
    type Filter = WorkspaceFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let workspace = sqlx::query_as::<_, WorkspaceDBResponse>(
            r#"
            INSERT INTO workspaces (name, description, color, monday_board_id, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.color)
        .bind(&request.monday_board_id)
        .bind(request.is_active)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(workspace)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let workspace = sqlx::query_as::<_, WorkspaceDBResponse>("SELECT * FROM workspaces WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(workspace)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM workspaces WHERE 1=1");
        push_filters(&mut query, filter);
        // Seeded workspaces keep their seed order
        query.push(" ORDER BY id LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let workspaces = query.build_query_as::<WorkspaceDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(workspaces)
    }

    /// Fails with a foreign key violation while any row still references the workspace.
    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::new("UPDATE workspaces SET updated_at = NOW()");
        push_set(&mut query, "name", request.name.as_deref());
        push_set(&mut query, "description", request.description.as_ref().map(Option::as_deref));
        push_set(&mut query, "color", request.color.as_ref().map(Option::as_deref));
        push_set(&mut query, "monday_board_id", request.monday_board_id.as_ref().map(Option::as_deref));
        push_set(&mut query, "is_active", request.is_active);
        push_update_target(&mut query, id);

        let workspace = query
            .build_query_as::<WorkspaceDBResponse>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_schema;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_seeded_workspaces_listed_in_seed_order(pool: PgPool) {
        setup_schema(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Workspaces::new(&mut conn);

        let all = repo.list(&WorkspaceFilter::new(0, 100)).await.unwrap();
        let names: Vec<_> = all.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Satoris", "Westpark", "Business Technology Group"]);
        assert_eq!(repo.count(&WorkspaceFilter::new(0, 100)).await.unwrap(), 3);

        let park = repo
            .list(&WorkspaceFilter::new(0, 100).with_search(Some("PARK".to_string())))
            .await
            .unwrap();
        assert_eq!(park.len(), 1);
        assert_eq!(park[0].name, "Westpark");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_is_active_filter_and_update(pool: PgPool) {
        setup_schema(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Workspaces::new(&mut conn);

        let westpark = repo.get_by_name("Westpark").await.unwrap().unwrap();
        let updated = repo
            .update(
                westpark.id,
                &WorkspaceUpdateDBRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.name, "Westpark");
        assert!(updated.updated_at.is_some());

        let inactive = repo
            .list(&WorkspaceFilter::new(0, 100).with_is_active(Some(false)))
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_can_clear_nullable_columns(pool: PgPool) {
        setup_schema(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Workspaces::new(&mut conn);

        let westpark = repo.get_by_name("Westpark").await.unwrap().unwrap();
        let described = repo
            .update(
                westpark.id,
                &WorkspaceUpdateDBRequest {
                    description: Some(Some("Mirror board".to_string())),
                    color: Some(Some("#10b981".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(described.description.as_deref(), Some("Mirror board"));

        let cleared = repo
            .update(
                westpark.id,
                &WorkspaceUpdateDBRequest {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.color.as_deref(), Some("#10b981"));
        assert!(cleared.is_active);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_referenced_workspace_is_restricted(pool: PgPool) {
        setup_schema(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let workspace_id: i64 = sqlx::query_scalar("SELECT id FROM workspaces WHERE name = 'Satoris'")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO deals (name, workspace_id) VALUES ('Fit-out', $1)")
            .bind(workspace_id)
            .execute(&mut *conn)
            .await
            .unwrap();

        let mut repo = Workspaces::new(&mut conn);
        let err = repo.delete(workspace_id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let created = repo
            .create(&WorkspaceCreateDBRequest {
                name: "Scratch".to_string(),
                description: None,
                color: None,
                monday_board_id: None,
                is_active: true,
            })
            .await
            .unwrap();
        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
    }
}
