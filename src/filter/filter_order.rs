use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};
use crate::database::collection::Collection;

pub struct FilterOrder;

impl FilterOrder {
    /// Parses an order spec in API field names and resolves it to storage columns
    pub fn validate_and_parse(collection: &Collection, order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let named = match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["createdAt desc", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v { out.extend(Self::parse_order_string(s)); }
                }
                out
            }
            Value::Object(obj) => {
                // { "createdAt": "desc", "name": "asc" }
                obj.iter()
                    .map(|(k, v)| {
                        let sort = match v.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                            "desc" => SortDirection::Desc,
                            _ => SortDirection::Asc,
                        };
                        (k.clone(), sort)
                    })
                    .collect()
            }
            _ => vec![],
        };

        named
            .into_iter()
            .map(|(name, sort)| {
                let field = collection
                    .field(&name)
                    .ok_or_else(|| FilterError::InvalidColumn(name.clone()))?;
                Ok(FilterOrderInfo { column: field.column.to_string(), sort })
            })
            .collect()
    }

    fn parse_order_string(s: &str) -> Vec<(String, SortDirection)> {
        // split on commas, then each token into field and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
                out.push((col.to_string(), sort));
            }
        }
        out
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() { return String::new(); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
