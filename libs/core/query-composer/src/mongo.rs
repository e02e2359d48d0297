//! MongoDB translation of a [`ComposedQuery`].

use mongodb::bson::{doc, spec::BinarySubtype, Binary, Bson, Document};
use mongodb::options::FindOptions;
use serde_json::Number;
use uuid::Uuid;

use crate::clause::{FieldCondition, FilterClause, RangeOperator, Scalar, SearchClause};
use crate::composer::ComposedQuery;

/// BSON form of a UUID as the driver's document serializer writes it.
pub fn uuid_to_bson(id: Uuid) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes: id.as_bytes().to_vec(),
    })
}

fn number_to_bson(n: &Number) -> Bson {
    match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => Bson::Int64(i),
        (None, Some(f)) => Bson::Double(f),
        (None, None) => Bson::Null,
    }
}

fn numeric_text(text: &str) -> Option<Bson> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Bson::Int64(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Bson::Double)
}

impl Scalar {
    pub fn to_bson(&self) -> Bson {
        match self {
            Scalar::Text(s) => Bson::String(s.clone()),
            Scalar::Number(n) => number_to_bson(n),
            Scalar::Bool(b) => Bson::Boolean(*b),
            Scalar::Uuid(id) => uuid_to_bson(*id),
        }
    }
}

impl FieldCondition {
    fn operator_entry(&self) -> (&'static str, Bson) {
        match (self.operator, &self.operand) {
            (RangeOperator::Equals, Scalar::Text(text)) => match numeric_text(text) {
                Some(number) => ("$in", Bson::Array(vec![Bson::String(text.clone()), number])),
                None => ("$eq", Bson::String(text.clone())),
            },
            (RangeOperator::Equals, operand) => ("$eq", operand.to_bson()),
            (operator, Scalar::Text(text)) => (
                mongo_operator(operator),
                numeric_text(text).unwrap_or_else(|| Bson::String(text.clone())),
            ),
            (operator, operand) => (mongo_operator(operator), operand.to_bson()),
        }
    }
}

fn mongo_operator(operator: RangeOperator) -> &'static str {
    match operator {
        RangeOperator::GreaterThan => "$gt",
        RangeOperator::GreaterOrEqual => "$gte",
        RangeOperator::LessThan => "$lt",
        RangeOperator::LessOrEqual => "$lte",
        RangeOperator::Equals => "$eq",
    }
}

impl FilterClause {
    /// `{field: {$op: operand, ...}, ...}`. Conditions on one field share a sub-document.
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        for condition in &self.conditions {
            let (operator, operand) = condition.operator_entry();
            match filter.get_mut(&condition.field) {
                Some(Bson::Document(operators)) => {
                    operators.insert(operator, operand);
                }
                _ => {
                    let mut operators = Document::new();
                    operators.insert(operator, operand);
                    filter.insert(condition.field.clone(), operators);
                }
            }
        }
        filter
    }
}

impl SearchClause {
    pub fn to_document(&self) -> Document {
        let mut search = Document::new();
        if let Some(keyword) = &self.keyword {
            search.insert(
                self.field.clone(),
                doc! { "$regex": regex::escape(keyword), "$options": "i" },
            );
        }
        search
    }
}

impl ComposedQuery {
    /// Filter document for `find`. Non-empty parts are joined with `$and`.
    pub fn to_document(&self) -> Document {
        let mut parts: Vec<Document> = [
            self.scope.to_document(),
            self.search.to_document(),
            self.filter.to_document(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();

        match parts.len() {
            0 => Document::new(),
            1 => parts.remove(0),
            _ => doc! { "$and": parts },
        }
    }

    /// Filter document for `count_documents`, the caller scope only.
    pub fn count_document(&self) -> Document {
        self.count_query().to_document()
    }

    /// Skip and limit for the page window, unset when the query is not paginated.
    pub fn find_options(&self) -> FindOptions {
        let mut options = FindOptions::default();
        if let Some(page) = self.page {
            options.skip = Some(page.skip());
            options.limit = Some(i64::try_from(page.limit()).unwrap_or(i64::MAX));
        }
        options
    }
}
