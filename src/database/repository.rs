use serde_json::{json, Value};
use sqlx::{self, PgPool, Row};
use uuid::Uuid;

use crate::database::collection::Collection;
use crate::database::manager::DatabaseError;
use crate::database::query_builder::{bind_param_query, QueryBuilder};
use crate::filter::FilterData;

/// Column and value written by inserts and updates; never null
pub type Assignment = (&'static str, Value);

/// Collection-level reads, updates and deletes shared by every resource
#[derive(Clone)]
pub struct Repository {
    collection: &'static Collection,
    pool: PgPool,
}

impl Repository {
    pub fn new(collection: &'static Collection, pool: PgPool) -> Self {
        Self { collection, pool }
    }

    pub fn collection(&self) -> &'static Collection {
        self.collection
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<Value>, DatabaseError> {
        QueryBuilder::new(self.collection)
            .filter(filter_data)?
            .select_all(&self.pool)
            .await
    }

    pub async fn select_one(&self, filter_data: FilterData) -> Result<Option<Value>, DatabaseError> {
        QueryBuilder::new(self.collection)
            .filter(filter_data)?
            .select_optional(&self.pool)
            .await
    }

    pub async fn count(&self, filter_data: FilterData) -> Result<i64, DatabaseError> {
        QueryBuilder::new(self.collection)
            .filter(filter_data)?
            .count(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let filter = FilterData {
            where_clause: Some(json!({ "id": id.to_string() })),
            ..Default::default()
        };
        self.select_one(filter).await
    }

    /// Inserts one row and returns it in the public shape
    pub async fn insert(&self, assignments: &[Assignment]) -> Result<Value, DatabaseError> {
        let sql = insert_sql(self.collection, assignments);
        let mut q = sqlx::query(&sql);
        for (_, value) in assignments {
            q = bind_param_query(q, value);
        }
        let row = q.fetch_one(&self.pool).await?;
        Ok(row.try_get::<Value, _>("row")?)
    }

    /// Applies the assignments and bumps `updated_at`; None when no row matched
    pub async fn update_by_id(&self, id: Uuid, assignments: &[Assignment]) -> Result<Option<Value>, DatabaseError> {
        let sql = update_sql(self.collection, assignments);
        let mut q = sqlx::query(&sql).bind(id);
        for (_, value) in assignments {
            q = bind_param_query(q, value);
        }
        match q.fetch_optional(&self.pool).await? {
            Some(row) => Ok(Some(row.try_get::<Value, _>("row")?)),
            None => Ok(None),
        }
    }

    /// False when no row matched
    pub async fn delete_by_id(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", self.collection.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn insert_sql(collection: &Collection, assignments: &[Assignment]) -> String {
    let columns: Vec<String> = assignments.iter().map(|(column, _)| format!("\"{}\"", column)).collect();
    let params: Vec<String> = (1..=assignments.len()).map(|i| format!("${}", i)).collect();
    format!(
        "WITH t AS (INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING {}) SELECT row_to_json(t) AS row FROM t",
        collection.table,
        columns.join(", "),
        params.join(", "),
        collection.projection()
    )
}

fn update_sql(collection: &Collection, assignments: &[Assignment]) -> String {
    let mut sets: Vec<String> = assignments
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("\"{}\" = ${}", column, i + 2))
        .collect();
    sets.push("\"updated_at\" = now()".to_string());
    format!(
        "WITH t AS (UPDATE \"{}\" SET {} WHERE \"id\" = $1 RETURNING {}) SELECT row_to_json(t) AS row FROM t",
        collection.table,
        sets.join(", "),
        collection.projection()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::collection::{BOOTCAMPS, USERS};

    #[test]
    fn insert_returns_public_projection() {
        let sql = insert_sql(&USERS, &[("name", json!("Jane")), ("password", json!("$2b$10$hash"))]);
        assert!(sql.starts_with(
            "WITH t AS (INSERT INTO \"users\" (\"name\", \"password\") VALUES ($1, $2) RETURNING \"id\" AS \"id\""
        ));
        assert!(sql.ends_with(") SELECT row_to_json(t) AS row FROM t"));
        assert!(!sql.contains("AS \"password\""));
    }

    #[test]
    fn update_numbers_parameters_after_id() {
        let sql = update_sql(
            &BOOTCAMPS,
            &[("name", json!("Devworks")), ("careers", json!(["Business"]))],
        );
        assert!(sql.starts_with(
            "WITH t AS (UPDATE \"bootcamps\" SET \"name\" = $2, \"careers\" = $3, \"updated_at\" = now() WHERE \"id\" = $1 RETURNING "
        ));
    }

    #[test]
    fn empty_update_still_touches_timestamp() {
        let sql = update_sql(&BOOTCAMPS, &[]);
        assert!(sql.contains("SET \"updated_at\" = now() WHERE"));
    }
}
