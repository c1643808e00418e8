use serde_json::{json, Value};
use uuid::Uuid;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};
use crate::database::collection::{Collection, Field, FieldKind};

pub struct FilterWhere {
    collection: &'static Collection,
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(collection: &'static Collection, starting_param_index: usize) -> Self {
        Self {
            collection,
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    /// Returns the condition SQL (empty when nothing constrains the query) and its bound values
    pub fn generate(
        collection: &'static Collection,
        where_data: &Value,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(collection, starting_param_index);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("filter must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions_snapshot = self.conditions.clone();
        for condition in &conditions_snapshot {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        Ok((sql_conditions.join(" AND "), self.param_values.clone()))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    let field = self
                        .collection
                        .field(key)
                        .ok_or_else(|| FilterError::InvalidColumn(key.clone()))?;
                    self.parse_field_condition(field, value)?;
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported filter format".to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &'static Field, value: &Value) -> Result<(), FilterError> {
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) => {
                for (op_key, op_val) in obj {
                    let operator = FilterOp::from_key(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    self.conditions.push(FilterWhereInfo { field, operator, data: op_val.clone() });
                }
            }
            // Implicit equality: { field: value }
            _ => self.conditions.push(FilterWhereInfo { field, operator: FilterOp::Eq, data: value.clone() }),
        }
        Ok(())
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let field = condition.field;
        let quoted_column = format!("\"{}\"", field.column);
        let cast = field.kind.param_cast();

        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    return Ok(format!("{} IS NULL", quoted_column));
                }
                let value = coerce(field, &condition.data)?;
                if field.kind == FieldKind::TextArray {
                    Ok(format!("{} = ANY({})", self.param(value), quoted_column))
                } else {
                    Ok(format!("{} = {}{}", quoted_column, self.param(value), cast))
                }
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                if matches!(field.kind, FieldKind::TextArray | FieldKind::GeoPoint | FieldKind::Boolean) {
                    return Err(FilterError::UnsupportedOperator(format!(
                        "ordering comparison on {}",
                        field.name
                    )));
                }
                let op = condition.operator.comparison().unwrap_or("=");
                let value = coerce(field, &condition.data)?;
                Ok(format!("{} {} {}{}", quoted_column, op, self.param(value), cast))
            }
            FilterOp::In => {
                let values = match &condition.data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let mut params = Vec::with_capacity(values.len());
                for v in &values {
                    let coerced = coerce(field, v)?;
                    params.push(format!("{}{}", self.param(coerced), cast));
                }
                if field.kind == FieldKind::TextArray {
                    // Array fields match when they share any element with the list
                    Ok(format!("{} && ARRAY[{}]::text[]", quoted_column, params.join(", ")))
                } else {
                    Ok(format!("{} IN ({})", quoted_column, params.join(", ")))
                }
            }
            FilterOp::GeoWithin => self.build_geo_within(field, &condition.data),
        }
    }

    /// `{ "$centerSphere": [[lng, lat], radius_radians] }` against a GeoJSON point column
    fn build_geo_within(&mut self, field: &'static Field, data: &Value) -> Result<String, FilterError> {
        if field.kind != FieldKind::GeoPoint {
            return Err(FilterError::UnsupportedOperator(format!("$geoWithin on {}", field.name)));
        }
        let sphere = data
            .get("$centerSphere")
            .and_then(Value::as_array)
            .ok_or_else(|| FilterError::InvalidOperatorData("$geoWithin requires $centerSphere".to_string()))?;
        let (center, radius) = match sphere.as_slice() {
            [Value::Array(center), radius] => (center, radius),
            _ => {
                return Err(FilterError::InvalidOperatorData(
                    "$centerSphere requires [[lng, lat], radius]".to_string(),
                ))
            }
        };
        let coords: Vec<f64> = center.iter().filter_map(Value::as_f64).collect();
        let (lng, lat) = match coords.as_slice() {
            [lng, lat] => (*lng, *lat),
            _ => return Err(FilterError::InvalidOperatorData("center must be [lng, lat]".to_string())),
        };
        let radius = radius
            .as_f64()
            .ok_or_else(|| FilterError::InvalidOperatorData("radius must be a number".to_string()))?;

        let column = format!("\"{}\"", field.column);
        let point_lng = format!("({}->'coordinates'->>0)::float8", column);
        let point_lat = format!("({}->'coordinates'->>1)::float8", column);
        let lat_param = self.param(json!(lat));
        let lng_param = self.param(json!(lng));
        let radius_param = self.param(json!(radius));

        // Haversine central angle between the stored point and the centre;
        // exact for identical points so a zero radius still matches them
        Ok(format!(
            "({column} IS NOT NULL AND 2 * asin(sqrt(LEAST(1.0, \
             power(sin(radians({plat} - {lat}::float8) / 2), 2) + \
             cos(radians({lat}::float8)) * cos(radians({plat})) * \
             power(sin(radians({plng} - {lng}::float8) / 2), 2)\
             ))) <= {radius}::float8)",
            column = column,
            lat = lat_param,
            lng = lng_param,
            plat = point_lat,
            plng = point_lng,
            radius = radius_param,
        ))
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Coerce a filter value (often a raw query-string token) into the field's kind
fn coerce(field: &Field, value: &Value) -> Result<Value, FilterError> {
    let invalid = || FilterError::InvalidValue { field: field.name.to_string(), value: display(value) };
    match field.kind {
        FieldKind::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| json!(n)).ok_or_else(invalid),
            _ => Err(invalid()),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        FieldKind::Id => match value {
            Value::String(s) if Uuid::parse_str(s).is_ok() => Ok(value.clone()),
            _ => Err(invalid()),
        },
        FieldKind::Text | FieldKind::TextArray | FieldKind::Timestamp => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(invalid()),
        },
        FieldKind::GeoPoint => Err(FilterError::UnsupportedOperator(format!("equality on {}", field.name))),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::collection::BOOTCAMPS;

    #[test]
    fn rewrites_comparison_operators_with_casts() {
        let (sql, params) =
            FilterWhere::generate(&BOOTCAMPS, &json!({ "averageCost": { "$lte": "10000" } }), 0).unwrap();
        assert_eq!(sql, "\"average_cost\" <= $1::float8");
        assert_eq!(params, vec![json!(10000.0)]);
    }

    #[test]
    fn array_fields_use_containment_and_overlap() {
        let (sql, params) = FilterWhere::generate(&BOOTCAMPS, &json!({ "careers": "Business" }), 0).unwrap();
        assert_eq!(sql, "$1 = ANY(\"careers\")");
        assert_eq!(params, vec![json!("Business")]);

        let (sql, params) = FilterWhere::generate(
            &BOOTCAMPS,
            &json!({ "careers": { "$in": ["Web Development", "UI/UX"] } }),
            0,
        )
        .unwrap();
        assert_eq!(sql, "\"careers\" && ARRAY[$1, $2]::text[]");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn scalar_in_becomes_single_element_list() {
        let (sql, params) =
            FilterWhere::generate(&BOOTCAMPS, &json!({ "name": { "$in": "Devworks" } }), 0).unwrap();
        assert_eq!(sql, "\"name\" IN ($1)");
        assert_eq!(params, vec![json!("Devworks")]);
    }

    #[test]
    fn combines_conditions_with_and() {
        let (sql, params) = FilterWhere::generate(
            &BOOTCAMPS,
            &json!({ "housing": "true", "averageRating": { "$gte": 5, "$lt": 9 } }),
            0,
        )
        .unwrap();
        // Object keys iterate in sorted order
        assert_eq!(
            sql,
            "\"average_rating\" >= $1::float8 AND \"average_rating\" < $2::float8 AND \"housing\" = $3"
        );
        assert_eq!(params, vec![json!(5), json!(9), json!(true)]);
    }

    #[test]
    fn rejects_unknown_fields_and_operators() {
        assert!(matches!(
            FilterWhere::generate(&BOOTCAMPS, &json!({ "nope": 1 }), 0),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&BOOTCAMPS, &json!({ "name": { "$regex": "x" } }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn rejects_uncoercible_values() {
        assert!(matches!(
            FilterWhere::generate(&BOOTCAMPS, &json!({ "averageCost": { "$gt": "cheap" } }), 0),
            Err(FilterError::InvalidValue { .. })
        ));
        assert!(matches!(
            FilterWhere::generate(&BOOTCAMPS, &json!({ "id": "not-a-uuid" }), 0),
            Err(FilterError::InvalidValue { .. })
        ));
    }

    #[test]
    fn builds_spherical_cap_condition() {
        let (sql, params) = FilterWhere::generate(
            &BOOTCAMPS,
            &json!({ "location": { "$geoWithin": { "$centerSphere": [[-71.1, 42.3], 0.01] } } }),
            0,
        )
        .unwrap();
        assert!(sql.starts_with("(\"location\" IS NOT NULL AND 2 * asin(sqrt("));
        assert!(sql.contains("sin(radians((\"location\"->'coordinates'->>1)::float8 - $1::float8) / 2)"));
        assert!(sql.contains("sin(radians((\"location\"->'coordinates'->>0)::float8 - $2::float8) / 2)"));
        assert!(sql.ends_with("<= $3::float8)"));
        assert_eq!(params, vec![json!(42.3), json!(-71.1), json!(0.01)]);
    }

    #[test]
    fn empty_filter_yields_no_conditions() {
        let (sql, params) = FilterWhere::generate(&BOOTCAMPS, &json!({}), 0).unwrap();
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }
}
