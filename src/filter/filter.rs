use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlResult};
use crate::database::collection::{projection, Collection, Field};

pub struct Filter {
    collection: &'static Collection,
    select_fields: Vec<&'static Field>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(collection: &'static Collection) -> Self {
        Self {
            collection,
            select_fields: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        Ok(self)
    }

    /// Restrict the projection; the id field is always included
    pub fn select(&mut self, fields: Vec<String>) -> Result<&mut Self, FilterError> {
        let mut resolved = vec![self.collection.id_field()];
        for name in fields {
            let name = name.trim();
            if name.is_empty() || name == "*" { continue; }
            let field = self
                .collection
                .field(name)
                .ok_or_else(|| FilterError::InvalidColumn(name.to_string()))?;
            if !resolved.iter().any(|f| f.name == field.name) {
                resolved.push(field);
            }
        }
        self.select_fields = resolved;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(self.collection, &order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.collection.table),
            if where_result.query.is_empty() { String::new() } else { format!("WHERE {}", where_result.query) },
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(self.collection, where_data, 0)?,
            None => (String::new(), vec![]),
        };
        Ok(SqlResult { query: where_clause, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = if where_result.query.is_empty() {
            format!("SELECT COUNT(*) as count FROM \"{}\"", self.collection.table)
        } else {
            format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.collection.table, where_result.query)
        };
        Ok(SqlResult { query, params: where_result.params })
    }

    fn build_select_clause(&self) -> String {
        if self.select_fields.is_empty() {
            self.collection.projection()
        } else {
            projection(self.select_fields.iter().copied())
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::collection::{BOOTCAMPS, USERS};
    use serde_json::json;

    #[test]
    fn builds_projected_sorted_window() {
        let mut filter = Filter::new(&BOOTCAMPS);
        filter
            .assign(FilterData {
                select: Some(vec!["name".into(), "careers".into()]),
                where_clause: Some(json!({ "careers": { "$in": ["Web Development"] } })),
                order: Some(json!("name asc")),
                limit: Some(2),
                offset: Some(0),
            })
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"id\" AS \"id\", \"name\" AS \"name\", \"careers\" AS \"careers\" FROM \"bootcamps\" \
             WHERE \"careers\" && ARRAY[$1]::text[] ORDER BY \"name\" ASC LIMIT 2 OFFSET 0"
        );
        assert_eq!(sql.params, vec![json!("Web Development")]);
    }

    #[test]
    fn default_projection_excludes_hidden_fields() {
        let sql = Filter::new(&USERS).to_sql().unwrap();
        assert!(sql.query.contains("\"role\" AS \"role\""));
        assert!(!sql.query.contains("password"));
        assert!(!sql.query.contains("reset_password"));
    }

    #[test]
    fn selecting_hidden_field_is_rejected() {
        let mut filter = Filter::new(&USERS);
        assert!(matches!(
            filter.select(vec!["password".into()]),
            Err(FilterError::InvalidColumn(_))
        ));
    }

    #[test]
    fn count_ignores_window_and_order() {
        let mut filter = Filter::new(&BOOTCAMPS);
        filter
            .assign(FilterData {
                where_clause: Some(json!({ "housing": true })),
                order: Some(json!("name")),
                limit: Some(5),
                offset: Some(10),
                ..Default::default()
            })
            .unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) as count FROM \"bootcamps\" WHERE \"housing\" = $1");
    }

    #[test]
    fn negative_limit_is_rejected() {
        let mut filter = Filter::new(&BOOTCAMPS);
        assert!(filter.limit(-1, None).is_err());
        assert!(filter.limit(1, Some(-1)).is_err());
    }
}
