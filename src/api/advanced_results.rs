use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::FilterConfig;
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::{FilterData, FilterError};
use crate::middleware::ApiResponse;

const DEFAULT_SORT: &str = "createdAt desc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            // An overflowing window lies past any possible total
            next: page
                .checked_mul(limit)
                .filter(|end| *end < total)
                .map(|_| PageRef { page: page + 1, limit }),
            prev: (page > 1).then_some(PageRef { page: page - 1, limit }),
        }
    }
}

/// A list request translated into a filter document plus its page window
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filter: FilterData,
    pub page: i64,
    pub limit: i64,
}

impl ListQuery {
    /// `field=value`, `field[op]=value`, `select`, `sort`, `page`, `limit`
    pub fn parse(params: &[(String, String)], config: &FilterConfig) -> Result<Self, FilterError> {
        let mut conditions: Map<String, Value> = Map::new();
        let mut select = None;
        let mut sort = None;
        let mut page = None;
        let mut limit = None;

        for (key, value) in params {
            match key.as_str() {
                "select" => select = Some(value.as_str()),
                "sort" => sort = Some(value.as_str()),
                "page" => page = Some(value.as_str()),
                "limit" => limit = Some(value.as_str()),
                _ => add_condition(&mut conditions, key, value)?,
            }
        }

        let page = parse_positive(page).unwrap_or(1);
        let mut limit = parse_positive(limit).unwrap_or(config.default_limit);
        if let Some(max) = config.max_limit {
            limit = limit.min(max);
        }

        let filter = FilterData {
            select: select.map(|s| s.split(',').map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect()),
            where_clause: (!conditions.is_empty()).then(|| Value::Object(conditions)),
            order: Some(Value::String(sort.map(sort_spec).unwrap_or_else(|| DEFAULT_SORT.to_string()))),
            limit: Some(limit),
            offset: Some((page - 1).saturating_mul(limit)),
        };

        Ok(Self { filter, page, limit })
    }

    /// The same conditions without projection, ordering or window
    pub fn count_filter(&self) -> FilterData {
        FilterData { where_clause: self.filter.where_clause.clone(), ..Default::default() }
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination::new(self.page, self.limit, total)
    }
}

/// Runs a list request against a repository and builds the list envelope
pub async fn advanced_results(
    repository: &Repository,
    params: &[(String, String)],
    config: &FilterConfig,
) -> Result<ApiResponse<Vec<Value>>, ApiError> {
    let query = ListQuery::parse(params, config)?;
    if config.debug_logging {
        tracing::debug!(table = repository.collection().table, filter = ?query.filter, "List query");
    }

    let total = repository.count(query.count_filter()).await?;
    let pagination = query.pagination(total);
    let data = repository.select_any(query.filter).await?;

    Ok(ApiResponse::success(data).with_count(total).with_pagination(pagination))
}

/// `field` means equality; `field[op]` maps to `$op`; repeated `[in]` keys accumulate
fn add_condition(conditions: &mut Map<String, Value>, key: &str, value: &str) -> Result<(), FilterError> {
    let (field, operator) = match key.split_once('[') {
        None => (key, "$eq"),
        Some((field, rest)) => {
            let op = rest
                .strip_suffix(']')
                .ok_or_else(|| FilterError::UnsupportedOperator(key.to_string()))?;
            let operator = match op {
                "gt" => "$gt",
                "gte" => "$gte",
                "lt" => "$lt",
                "lte" => "$lte",
                "in" => "$in",
                other => return Err(FilterError::UnsupportedOperator(other.to_string())),
            };
            (field, operator)
        }
    };

    let entry = conditions
        .entry(field.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let ops = match entry {
        Value::Object(ops) => ops,
        _ => return Err(FilterError::InvalidWhereClause(key.to_string())),
    };

    let value = Value::String(value.to_string());
    if operator == "$in" {
        // Comma-free lists arrive as repeated keys
        match ops.get_mut("$in") {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                ops.insert("$in".to_string(), Value::Array(vec![value]));
            }
        }
    } else {
        ops.insert(operator.to_string(), value);
    }
    Ok(())
}

/// "name,-createdAt" -> "name asc,createdAt desc"
fn sort_spec(raw: &str) -> String {
    let keys: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| match k.strip_prefix('-') {
            Some(field) => format!("{} desc", field),
            None => format!("{} asc", k),
        })
        .collect();
    if keys.is_empty() {
        DEFAULT_SORT.to_string()
    } else {
        keys.join(",")
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::collection::BOOTCAMPS;
    use crate::filter::Filter;
    use serde_json::json;

    fn config() -> FilterConfig {
        FilterConfig { default_limit: 25, max_limit: Some(100), debug_logging: false }
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn rewrites_bracket_operators() {
        let query = ListQuery::parse(
            &params(&[("averageCost[lte]", "10000"), ("housing", "true"), ("careers[in]", "Business")]),
            &config(),
        )
        .unwrap();
        assert_eq!(
            query.filter.where_clause,
            Some(json!({
                "averageCost": { "$lte": "10000" },
                "careers": { "$in": ["Business"] },
                "housing": { "$eq": "true" }
            }))
        );
    }

    #[test]
    fn repeated_in_keys_accumulate() {
        let query = ListQuery::parse(
            &params(&[("careers[in]", "Web Development"), ("careers[in]", "UI/UX")]),
            &config(),
        )
        .unwrap();
        assert_eq!(
            query.filter.where_clause,
            Some(json!({ "careers": { "$in": ["Web Development", "UI/UX"] } }))
        );
    }

    #[test]
    fn unknown_operators_are_rejected() {
        let err = ListQuery::parse(&params(&[("averageCost[ne]", "1")]), &config()).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator(op) if op == "ne"));
        assert!(ListQuery::parse(&params(&[("averageCost[lte", "1")]), &config()).is_err());
    }

    #[test]
    fn reserved_keys_shape_the_window() {
        let query = ListQuery::parse(
            &params(&[("select", "name,careers"), ("sort", "name,-averageCost"), ("page", "3"), ("limit", "2")]),
            &config(),
        )
        .unwrap();
        assert_eq!(query.filter.select, Some(vec!["name".to_string(), "careers".to_string()]));
        assert_eq!(query.filter.order, Some(json!("name asc,averageCost desc")));
        assert_eq!(query.filter.limit, Some(2));
        assert_eq!(query.filter.offset, Some(4));
        assert!(query.filter.where_clause.is_none());
    }

    #[test]
    fn defaults_and_fallbacks() {
        let query = ListQuery::parse(&params(&[("page", "zero"), ("limit", "-5")]), &config()).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 25);
        assert_eq!(query.filter.order, Some(json!("createdAt desc")));

        let capped = ListQuery::parse(&params(&[("limit", "5000")]), &config()).unwrap();
        assert_eq!(capped.limit, 100);
    }

    #[test]
    fn huge_page_numbers_saturate_instead_of_overflowing() {
        let query = ListQuery::parse(&params(&[("page", "9223372036854775807"), ("limit", "25")]), &config()).unwrap();
        assert_eq!(query.page, i64::MAX);
        assert_eq!(query.filter.offset, Some(i64::MAX));

        let pagination = query.pagination(40);
        assert_eq!(pagination.next, None);
        assert_eq!(pagination.prev, Some(PageRef { page: i64::MAX - 1, limit: 25 }));

        let mut filter = Filter::new(&BOOTCAMPS);
        filter.assign(query.filter).unwrap();
        assert!(filter.to_sql().unwrap().query.ends_with(&format!("LIMIT 25 OFFSET {}", i64::MAX)));
    }

    #[test]
    fn pagination_descriptors() {
        assert_eq!(
            Pagination::new(1, 2, 5),
            Pagination { next: Some(PageRef { page: 2, limit: 2 }), prev: None }
        );
        assert_eq!(
            Pagination::new(3, 2, 5),
            Pagination { next: None, prev: Some(PageRef { page: 2, limit: 2 }) }
        );
        assert_eq!(Pagination::new(1, 25, 25), Pagination::default());
        assert_eq!(json!(Pagination::new(2, 1, 3)), json!({ "next": { "page": 3, "limit": 1 }, "prev": { "page": 1, "limit": 1 } }));
    }

    #[test]
    fn parsed_query_compiles_to_sql() {
        let query = ListQuery::parse(
            &params(&[("careers[in]", "Web Development"), ("select", "name,careers"), ("sort", "name"), ("page", "1"), ("limit", "2")]),
            &config(),
        )
        .unwrap();
        let mut filter = Filter::new(&BOOTCAMPS);
        filter.assign(query.filter).unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"id\" AS \"id\", \"name\" AS \"name\", \"careers\" AS \"careers\" FROM \"bootcamps\" \
             WHERE \"careers\" && ARRAY[$1]::text[] ORDER BY \"name\" ASC LIMIT 2 OFFSET 0"
        );
        assert_eq!(sql.params, vec![json!("Web Development")]);
    }
}
