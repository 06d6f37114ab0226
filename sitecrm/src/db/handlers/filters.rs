//! Query-building helpers shared by the CRM repositories.
//!
//! All list queries start from `... WHERE 1=1` and append `AND` clauses, so each helper only
//! ever pushes a leading ` AND ...` fragment with bound parameters. Partial updates start from
//! `UPDATE ... SET updated_at = NOW()` and append `, column = $n` assignments the same way.

use sqlx::{Encode, Postgres, QueryBuilder, Type};

use crate::types::{UserId, WorkspaceId};

/// Filters every workspace-scoped, owned entity supports.
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    pub workspace_id: Option<WorkspaceId>,
    /// Exact match on the denormalised owner name
    pub owner_name: Option<String>,
    /// Case-insensitive substring match over the entity's search columns
    pub search: Option<String>,
    /// Restrict to rows that are unowned or owned by this user. `None` means no restriction.
    pub visible_to: Option<UserId>,
}

/// Append `AND column = $n` when a value is given.
pub fn push_eq<'args, T>(query: &mut QueryBuilder<'args, Postgres>, column: &str, value: Option<T>)
where
    T: 'args + Encode<'args, Postgres> + Type<Postgres>,
{
    if let Some(value) = value {
        query.push(format!(" AND {column} = "));
        query.push_bind(value);
    }
}

/// Escape the `LIKE` wildcards in user input so it matches literally under `ESCAPE '\\'`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append a case-insensitive substring match over any of `columns`.
pub fn push_search<'args>(query: &mut QueryBuilder<'args, Postgres>, columns: &[&str], search: Option<&str>) {
    let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return;
    };
    let pattern = format!("%{}%", escape_like(&search.to_lowercase()));

    query.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        query.push(format!("LOWER(COALESCE({column}, '')) LIKE "));
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\'");
    }
    query.push(")");
}

/// Append the ownership visibility rule: unowned rows, or rows owned by `user`.
pub fn push_visibility<'args>(query: &mut QueryBuilder<'args, Postgres>, owner_column: &str, user: Option<UserId>) {
    if let Some(user) = user {
        query.push(format!(" AND ({owner_column} IS NULL OR {owner_column} = "));
        query.push_bind(user);
        query.push(")");
    }
}

/// Append the common scope filters, with `owner_id` as the ownership column.
pub fn push_scope<'args>(query: &mut QueryBuilder<'args, Postgres>, scope: &'args ScopeFilter, search_columns: &[&str]) {
    push_eq(query, "workspace_id", scope.workspace_id);
    push_eq(query, "owner_name", scope.owner_name.as_deref());
    push_search(query, search_columns, scope.search.as_deref());
    push_visibility(query, "owner_id", scope.visible_to);
}

/// Append `, column = $n` to an UPDATE's SET list when a value is supplied. Nullable columns
/// take an `Option<Option<T>>`, where `Some(None)` writes NULL.
pub fn push_set<'args, T>(query: &mut QueryBuilder<'args, Postgres>, column: &str, value: Option<T>)
where
    T: 'args + Encode<'args, Postgres> + Type<Postgres>,
{
    if let Some(value) = value {
        query.push(format!(", {column} = "));
        query.push_bind(value);
    }
}

/// Finish a partial update of the row with the given id, returning the updated row.
pub fn push_update_target<'args>(query: &mut QueryBuilder<'args, Postgres>, id: i64) {
    query.push(" WHERE id = ");
    query.push_bind(id);
    query.push(" RETURNING *");
}

/// Append newest-first ordering and pagination.
pub fn push_page<'args>(query: &mut QueryBuilder<'args, Postgres>, skip: i64, limit: i64) {
    query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(skip);
}
