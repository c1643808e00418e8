use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown field: {0}")]
    InvalidColumn(String),

    #[error("Invalid filter: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid value '{value}' for field {field}")]
    InvalidValue { field: String, value: String },

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),
}
