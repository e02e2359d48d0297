use serde::Serialize;
use serde_json::{Number, Value};
use uuid::Uuid;

/// Field every keyword search runs against.
pub const SEARCH_FIELD: &str = "name";

/// A literal value a condition compares against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
    Uuid(Uuid),
}

impl Scalar {
    /// Numeric view of the scalar. Text counts when it parses as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Scalar::Bool(_) | Scalar::Uuid(_) => None,
        }
    }

    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<Uuid> for Scalar {
    fn from(value: Uuid) -> Self {
        Scalar::Uuid(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RangeOperator {
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterOrEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessOrEqual,
    #[serde(rename = "eq")]
    Equals,
}

impl RangeOperator {
    /// Map a client-facing comparison key. Only `gt`, `gte`, `lt` and `lte` are accepted.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "gt" => Some(RangeOperator::GreaterThan),
            "gte" => Some(RangeOperator::GreaterOrEqual),
            "lt" => Some(RangeOperator::LessThan),
            "lte" => Some(RangeOperator::LessOrEqual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOperator::GreaterThan => "gt",
            RangeOperator::GreaterOrEqual => "gte",
            RangeOperator::LessThan => "lt",
            RangeOperator::LessOrEqual => "lte",
            RangeOperator::Equals => "eq",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCondition {
    pub field: String,
    pub operator: RangeOperator,
    pub operand: Scalar,
}

/// Conjunction of field conditions.
///
/// `dropped` records the parameters that were discarded while building the
/// clause (unknown comparison keys, unsafe field names) so callers can log them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterClause {
    pub conditions: Vec<FieldCondition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<String>,
}

impl FilterClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(self, field: impl Into<String>, operand: impl Into<Scalar>) -> Self {
        self.condition(field, RangeOperator::Equals, operand)
    }

    pub fn condition(
        mut self,
        field: impl Into<String>,
        operator: RangeOperator,
        operand: impl Into<Scalar>,
    ) -> Self {
        self.conditions.push(FieldCondition {
            field: field.into(),
            operator,
            operand: operand.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Conditions of both clauses, in order.
    pub fn and(mut self, other: FilterClause) -> Self {
        self.conditions.extend(other.conditions);
        self.dropped.extend(other.dropped);
        self
    }
}

/// Case-insensitive substring match on [`SEARCH_FIELD`]. `None` matches everything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchClause {
    pub field: String,
    pub keyword: Option<String>,
}

impl SearchClause {
    pub fn any() -> Self {
        Self {
            field: SEARCH_FIELD.to_string(),
            keyword: None,
        }
    }

    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            field: SEARCH_FIELD.to_string(),
            keyword: Some(keyword.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.is_none()
    }
}

impl Default for SearchClause {
    fn default() -> Self {
        Self::any()
    }
}

/// Window of results: `limit = page_size`, `skip = page_size * (page_number - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSpec {
    pub page_size: u64,
    pub page_number: u64,
}

impl PageSpec {
    pub fn skip(&self) -> u64 {
        self.page_size
            .saturating_mul(self.page_number.saturating_sub(1))
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}
