use serde::Serialize;
use serde_json::Value;

use crate::clause::{FieldCondition, FilterClause, PageSpec, RangeOperator, Scalar, SearchClause};
use crate::error::{QueryError, QueryResult};
use crate::params::{type_name, QueryParameters};

/// A fully composed catalog query: caller scope, keyword search, client
/// filters and an optional result window. Built fresh for every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComposedQuery {
    pub scope: FilterClause,
    pub search: SearchClause,
    pub filter: FilterClause,
    pub page: Option<PageSpec>,
}

impl ComposedQuery {
    /// Query over the caller scope only, without search, filters or window.
    pub fn count_query(&self) -> ComposedQuery {
        ComposedQuery {
            scope: self.scope.clone(),
            ..ComposedQuery::default()
        }
    }

    /// Client parameters that were discarded while building the filter.
    pub fn dropped(&self) -> &[String] {
        &self.filter.dropped
    }
}

/// Keyword search on `name`. An absent or empty keyword matches everything.
pub fn build_search(params: &QueryParameters) -> SearchClause {
    match params.keyword() {
        Some(keyword) if !keyword.is_empty() => SearchClause::keyword(keyword),
        _ => SearchClause::any(),
    }
}

/// Structured filter from the non-reserved parameters.
pub fn build_filter(params: &QueryParameters) -> QueryResult<FilterClause> {
    let mut clause = FilterClause::new();

    for (field, value) in params.filters() {
        if !is_safe_field(field) {
            clause.dropped.push(field.clone());
            continue;
        }

        match value {
            Value::Object(operators) => {
                for (key, operand) in operators {
                    let Some(operator) = RangeOperator::from_key(key) else {
                        clause.dropped.push(format!("{field}.{key}"));
                        continue;
                    };
                    let operand = Scalar::from_json(operand).ok_or_else(|| {
                        QueryError::invalid(format!(
                            "operand of '{field}[{key}]' must be a single value, got {}",
                            type_name(operand)
                        ))
                    })?;
                    clause.conditions.push(FieldCondition {
                        field: field.clone(),
                        operator,
                        operand,
                    });
                }
            }
            other => {
                let operand = Scalar::from_json(other).ok_or_else(|| {
                    QueryError::invalid(format!(
                        "filter '{field}' must be a single value or a range mapping, got {}",
                        type_name(other)
                    ))
                })?;
                clause.conditions.push(FieldCondition {
                    field: field.clone(),
                    operator: RangeOperator::Equals,
                    operand,
                });
            }
        }
    }

    Ok(clause)
}

/// Result window for `page_size` items per page, page number taken from `params`.
pub fn build_page(page_size: i64, params: &QueryParameters) -> QueryResult<PageSpec> {
    if page_size <= 0 {
        return Err(QueryError::invalid(format!(
            "page size must be positive, got {page_size}"
        )));
    }

    let page_number = params.page().and_then(parse_integer).unwrap_or(1).max(1);

    Ok(PageSpec {
        page_size: page_size.unsigned_abs(),
        page_number: page_number.unsigned_abs(),
    })
}

/// Resolve a client supplied page size, falling back to `default` when absent.
pub fn parse_page_size(raw: Option<&Value>, default: i64) -> QueryResult<i64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match parse_integer(raw) {
        Some(size) if size > 0 => Ok(size),
        Some(size) => Err(QueryError::invalid(format!(
            "limit must be positive, got {size}"
        ))),
        None => Err(QueryError::invalid(format!("limit is not a number: {raw}"))),
    }
}

/// Scope, search, filter and page in one call.
pub fn compose(
    scope: FilterClause,
    params: &QueryParameters,
    page_size: i64,
) -> QueryResult<ComposedQuery> {
    QueryComposer::new(params)
        .scoped(scope)
        .paginate(page_size)?
        .search()
        .filter()
        .map(QueryComposer::build)
}

/// Step-by-step construction of a [`ComposedQuery`].
///
/// ```
/// use query_composer::{FilterClause, QueryComposer, QueryParameters};
///
/// let params = QueryParameters::from_pairs([("keyword", "lamp"), ("price[lt]", "40")]).unwrap();
/// let query = QueryComposer::new(&params)
///     .scoped(FilterClause::new().equals("category", "home"))
///     .search()
///     .filter()
///     .unwrap()
///     .paginate(10)
///     .unwrap()
///     .build();
///
/// assert_eq!(query.filter.conditions.len(), 1);
/// assert_eq!(query.page.map(|p| p.skip()), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct QueryComposer<'a> {
    params: &'a QueryParameters,
    query: ComposedQuery,
}

impl<'a> QueryComposer<'a> {
    pub fn new(params: &'a QueryParameters) -> Self {
        Self {
            params,
            query: ComposedQuery::default(),
        }
    }

    /// Restrict every result (and the count) to `scope`.
    pub fn scoped(mut self, scope: FilterClause) -> Self {
        self.query.scope = scope;
        self
    }

    pub fn search(mut self) -> Self {
        self.query.search = build_search(self.params);
        self
    }

    pub fn filter(mut self) -> QueryResult<Self> {
        self.query.filter = build_filter(self.params)?;
        Ok(self)
    }

    pub fn paginate(mut self, page_size: i64) -> QueryResult<Self> {
        self.query.page = Some(build_page(page_size, self.params)?);
        Ok(self)
    }

    pub fn build(self) -> ComposedQuery {
        self.query
    }
}

fn is_safe_field(field: &str) -> bool {
    !field.is_empty() && !field.starts_with('$') && !field.contains('\0')
}

/// Integer view of a parameter, truncating decimals.
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> QueryParameters {
        QueryParameters::from_value(value).unwrap()
    }

    #[test]
    fn test_search_without_keyword_is_empty() {
        assert!(build_search(&QueryParameters::new()).is_empty());
        assert!(build_search(&params(json!({"keyword": ""}))).is_empty());
        assert!(build_search(&params(json!({"color": "red"}))).is_empty());
    }

    #[test]
    fn test_search_keeps_keyword_literally() {
        let clause = build_search(&params(json!({"keyword": " Lamp .*"})));
        assert_eq!(clause.keyword.as_deref(), Some(" Lamp .*"));
        assert_eq!(clause.field, "name");
    }

    #[test]
    fn test_page_window() {
        let page = build_page(10, &params(json!({"page": "3"}))).unwrap();
        assert_eq!(page.skip(), 20);
        assert_eq!(page.limit(), 10);
    }

    #[test]
    fn test_page_number_parsing() {
        let cases = [
            (json!({}), 1),
            (json!({"page": "2"}), 2),
            (json!({"page": "2.9"}), 2),
            (json!({"page": 4}), 4),
            (json!({"page": "abc"}), 1),
            (json!({"page": "-3"}), 1),
            (json!({"page": "0"}), 1),
            (json!({"page": true}), 1),
        ];
        for (input, expected) in cases {
            let page = build_page(5, &params(input.clone())).unwrap();
            assert_eq!(page.page_number, expected, "input {input}");
            assert_eq!(page.skip(), 5 * (expected - 1));
        }
    }

    #[test]
    fn test_page_size_must_be_positive() {
        for size in [0, -5] {
            let err = build_page(size, &QueryParameters::new()).unwrap_err();
            assert!(matches!(err, QueryError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_parse_page_size() {
        assert_eq!(parse_page_size(None, 10).unwrap(), 10);
        assert_eq!(parse_page_size(Some(&json!("25")), 10).unwrap(), 25);
        assert_eq!(parse_page_size(Some(&json!(3)), 10).unwrap(), 3);
        assert!(parse_page_size(Some(&json!("lots")), 10).is_err());
        assert!(parse_page_size(Some(&json!("0")), 10).is_err());
        assert!(parse_page_size(Some(&json!(-1)), 10).is_err());
    }

    #[test]
    fn test_filter_range_operator() {
        let clause = build_filter(&params(json!({"price": {"gt": 100}}))).unwrap();
        assert_eq!(
            clause.conditions,
            vec![FieldCondition {
                field: "price".into(),
                operator: RangeOperator::GreaterThan,
                operand: Scalar::from(100i64),
            }]
        );
    }

    #[test]
    fn test_filter_scalar_is_equality() {
        let clause = build_filter(&params(json!({"category": "shoes"}))).unwrap();
        assert_eq!(clause.conditions.len(), 1);
        assert_eq!(clause.conditions[0].operator, RangeOperator::Equals);
        assert_eq!(clause.conditions[0].operand, Scalar::from("shoes"));
    }

    #[test]
    fn test_filter_ignores_reserved_keys() {
        let clause = build_filter(&params(json!({
            "keyword": "x",
            "limit": 5,
            "page": 2,
            "color": "red"
        })))
        .unwrap();

        let fields: Vec<_> = clause.conditions.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["color"]);
    }

    #[test]
    fn test_filter_drops_unknown_operator_keys() {
        let clause =
            build_filter(&params(json!({"price": {"$where": "sleep(1)", "gt": 5}}))).unwrap();

        assert_eq!(clause.conditions.len(), 1);
        assert_eq!(clause.conditions[0].operator, RangeOperator::GreaterThan);
        assert_eq!(clause.dropped, vec!["price.$where".to_string()]);
    }

    #[test]
    fn test_filter_drops_operator_field_names() {
        let clause = build_filter(&params(json!({"$where": "1 == 1", "$or": "x"}))).unwrap();
        assert!(clause.is_empty());
        assert_eq!(clause.dropped.len(), 2);
    }

    #[test]
    fn test_filter_mapping_without_known_keys_removes_field() {
        let clause = build_filter(&params(json!({"price": {"ne": 3}}))).unwrap();
        assert!(clause.is_empty());
        assert_eq!(clause.dropped, vec!["price.ne".to_string()]);
    }

    #[test]
    fn test_filter_rejects_structured_operands() {
        for input in [
            json!({"price": {"gt": {"$ne": 1}}}),
            json!({"price": {"lt": [1, 2]}}),
            json!({"price": {"gte": null}}),
            json!({"color": ["red", "blue"]}),
            json!({"color": null}),
        ] {
            let err = build_filter(&params(input.clone())).unwrap_err();
            assert!(matches!(err, QueryError::InvalidArgument(_)), "input {input}");
        }
    }

    #[test]
    fn test_search_and_filter_commute() {
        let p = params(json!({"keyword": "lamp", "price": {"lte": "30"}, "color": "red"}));
        let a = QueryComposer::new(&p).search().filter().unwrap().build();
        let b = QueryComposer::new(&p).filter().unwrap().search().build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compose_and_count_query() {
        let owner = uuid::Uuid::new_v4();
        let p = params(json!({"keyword": "lamp", "color": "red", "page": 2}));
        let query = compose(FilterClause::new().equals("user", owner), &p, 4).unwrap();

        assert_eq!(query.scope.conditions.len(), 1);
        assert_eq!(query.filter.conditions.len(), 1);
        assert_eq!(query.page.map(|p| p.skip()), Some(4));

        let count = query.count_query();
        assert_eq!(count.scope, query.scope);
        assert!(count.search.is_empty());
        assert!(count.filter.is_empty());
        assert!(count.page.is_none());
    }

    #[test]
    fn test_empty_parameters_compose_to_match_all() {
        let query = compose(FilterClause::new(), &QueryParameters::new(), 10).unwrap();
        assert!(query.search.is_empty());
        assert!(query.filter.is_empty());
        assert_eq!(
            query.page,
            Some(PageSpec {
                page_size: 10,
                page_number: 1
            })
        );
    }
}
