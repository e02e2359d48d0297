//! Typed parse step for raw request parameters.
//!
//! Clients send an open-ended bag of parameters. Three of them are reserved
//! (`keyword`, `page`, `limit`) and everything else is a candidate filter
//! field. [`QueryParameters`] splits the two once, so no later stage has to
//! ask whether a key is reserved.

use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};

pub const KEYWORD: &str = "keyword";
pub const LIMIT: &str = "limit";
pub const PAGE: &str = "page";

/// Parameter names that are never treated as filter fields.
pub const RESERVED_KEYS: [&str; 3] = [KEYWORD, LIMIT, PAGE];

/// Parsed request parameters.
///
/// Reserved keys are only recognised at the top level. A nested
/// `price[limit]=5` stays inside the `price` filter mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParameters {
    keyword: Option<String>,
    page: Option<Value>,
    limit: Option<Value>,
    filters: Map<String, Value>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse flat `key=value` pairs as found in a URL query string.
    ///
    /// Bracketed keys nest: `price[gte]=10` becomes `{"price": {"gte": "10"}}`.
    /// When the same key appears twice the later pair wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut root = Map::new();
        for (key, value) in pairs {
            let segments = split_key(key.as_ref());
            insert_path(&mut root, &segments, Value::String(value.into()));
        }
        Self::from_map(root)
    }

    /// Parse an already structured parameter object (for example a JSON body).
    pub fn from_value(value: Value) -> QueryResult<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            Value::Null => Ok(Self::default()),
            other => Err(QueryError::invalid(format!(
                "query parameters must be a mapping, got {}",
                type_name(&other)
            ))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> QueryResult<Self> {
        let mut params = Self::default();
        for (key, value) in map {
            params.insert(key, value)?;
        }
        Ok(params)
    }

    fn insert(&mut self, key: String, value: Value) -> QueryResult<()> {
        match key.as_str() {
            KEYWORD => self.keyword = keyword_text(value)?,
            PAGE => self.page = Some(value),
            LIMIT => self.limit = Some(value),
            _ => {
                self.filters.insert(key, value);
            }
        }
        Ok(())
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_page(mut self, page: impl Into<Value>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn with_limit(mut self, limit: impl Into<Value>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Add a filter field. Reserved names are routed to their own slot.
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> QueryResult<Self> {
        self.insert(field.into(), value.into())?;
        Ok(self)
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn page(&self) -> Option<&Value> {
        self.page.as_ref()
    }

    pub fn limit(&self) -> Option<&Value> {
        self.limit.as_ref()
    }

    /// Residual parameters, never containing a reserved key.
    pub fn filters(&self) -> &Map<String, Value> {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.page.is_none() && self.limit.is_none() && self.filters.is_empty()
    }
}

fn keyword_text(value: Value) -> QueryResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(QueryError::invalid(format!(
            "keyword must be a single value, got {}",
            type_name(&other)
        ))),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

/// Split `a[b][c]` into `["a", "b", "c"]`. Anything malformed is kept verbatim.
fn split_key(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };
    if open == 0 || !key.ends_with(']') {
        return vec![key];
    }

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return vec![key];
        };
        let Some(close) = inner.find(']') else {
            return vec![key];
        };
        let segment = &inner[..close];
        if segment.is_empty() || segment.contains('[') {
            return vec![key];
        }
        segments.push(segment);
        rest = &inner[close + 1..];
    }
    segments
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}
