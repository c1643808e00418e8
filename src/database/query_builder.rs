use serde_json::Value;
use sqlx::{self, postgres::PgArguments, PgPool, Row};

use crate::database::collection::Collection;
use crate::database::manager::DatabaseError;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData};

/// Executes filter documents against a collection, returning rows as JSON
/// objects keyed by API field names.
pub struct QueryBuilder {
    filter: Filter,
}

impl QueryBuilder {
    pub fn new(collection: &'static Collection) -> Self {
        Self { filter: Filter::new(collection) }
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter.assign(filter_data)?;
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<Value>, DatabaseError> {
        let sql_result = self.json_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("row").map_err(DatabaseError::from))
            .collect()
    }

    pub async fn select_optional(self, pool: &PgPool) -> Result<Option<Value>, DatabaseError> {
        let sql_result = self.json_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        match q.fetch_optional(pool).await? {
            Some(row) => Ok(Some(row.try_get::<Value, _>("row")?)),
            None => Ok(None),
        }
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result = self.filter.to_count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    /// Wraps the filter query so each row comes back as one JSON object
    fn json_sql(&self) -> Result<SqlResult, DatabaseError> {
        let inner = self.filter.to_sql()?;
        Ok(SqlResult {
            query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner.query),
            params: inner.params,
        })
    }
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Only text arrays are bound whole; filter lists are expanded into parameters
        Value::Array(arr) => {
            let items: Vec<String> = arr
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            q.bind(items)
        }
        Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::collection::BOOTCAMPS;

    #[test]
    fn wraps_rows_in_row_to_json() {
        let builder = QueryBuilder::new(&BOOTCAMPS)
            .filter(FilterData { select: Some(vec!["name".into()]), ..Default::default() })
            .unwrap();
        let sql = builder.json_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM (SELECT \"id\" AS \"id\", \"name\" AS \"name\" FROM \"bootcamps\") t"
        );
    }

    #[test]
    fn invalid_filter_surfaces_as_database_error() {
        let result = QueryBuilder::new(&BOOTCAMPS)
            .filter(FilterData { order: Some(serde_json::json!("bogus")), ..Default::default() });
        assert!(matches!(result, Err(DatabaseError::Filter(_))));
    }
}
