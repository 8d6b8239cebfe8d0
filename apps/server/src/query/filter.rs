use std::cmp::Ordering;

use bson::{doc, Bson, Document};

/// Comparison suffixes accepted in `field[suffix]=value` query keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            _ => None,
        }
    }

    pub fn as_mongo(&self) -> &'static str {
        match self {
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Gte => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A single predicate on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Bson),
    AnyOf(Vec<Bson>),
    Compare(Operator, Bson),
    /// Case-insensitive substring match. The needle is kept unescaped and
    /// escaped only when rendered for the server.
    Contains(String),
}

impl Condition {
    fn to_operator_document(&self) -> Document {
        match self {
            Condition::Eq(value) => doc! { "$eq": value.clone() },
            Condition::AnyOf(values) => doc! { "$in": values.clone() },
            Condition::Compare(op, value) => {
                let mut rendered = Document::new();
                rendered.insert(op.as_mongo(), value.clone());
                rendered
            }
            Condition::Contains(needle) => doc! {
                "$regex": regex::escape(needle),
                "$options": "i",
            },
        }
    }

    fn to_bson(&self) -> Bson {
        match self {
            Condition::Eq(value) => value.clone(),
            other => Bson::Document(other.to_operator_document()),
        }
    }

    fn matches_scalar(&self, value: &Bson) -> bool {
        match self {
            Condition::Eq(expected) => bson_eq(value, expected),
            Condition::AnyOf(candidates) => candidates.iter().any(|c| bson_eq(value, c)),
            Condition::Compare(op, bound) => {
                compare_bson(value, bound).is_some_and(|ordering| op.accepts(ordering))
            }
            Condition::Contains(needle) => match value {
                Bson::String(haystack) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            },
        }
    }

    /// Evaluates the condition the way the document store does: a condition
    /// against an array field holds when any element satisfies it.
    pub fn matches(&self, value: Option<&Bson>) -> bool {
        match value {
            None => false,
            Some(Bson::Array(items)) => {
                if let Condition::Eq(expected) = self {
                    if bson_eq(&Bson::Array(items.clone()), expected) {
                        return true;
                    }
                }
                items.iter().any(|item| self.matches_scalar(item))
            }
            Some(value) => self.matches_scalar(value),
        }
    }
}

/// Conjunction of field conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push((field.into(), condition));
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    pub fn compare(self, field: impl Into<String>, op: Operator, value: impl Into<Bson>) -> Self {
        self.with(field, Condition::Compare(op, value.into()))
    }

    pub fn contains(self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.with(field, Condition::Contains(needle.into()))
    }

    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn constrains(&self, field: &str) -> bool {
        self.clauses.iter().any(|(name, _)| name == field)
    }

    /// Merges `base` into `self`. Clauses of `self` on any field the base
    /// constrains are dropped, so the base always wins.
    pub fn scoped_by(self, base: &Filter) -> Filter {
        let mut clauses: Vec<_> = self
            .clauses
            .into_iter()
            .filter(|(field, _)| !base.constrains(field))
            .collect();
        clauses.extend(base.clauses.iter().cloned());
        Filter { clauses }
    }

    pub fn and(mut self, other: Filter) -> Filter {
        self.clauses.extend(other.clauses);
        self
    }

    /// Renders the filter as a MongoDB query document.
    pub fn to_document(&self) -> Document {
        let mut seen: Vec<&str> = Vec::with_capacity(self.clauses.len());
        let repeated = self.clauses.iter().any(|(field, _)| {
            let dup = seen.contains(&field.as_str());
            seen.push(field);
            dup
        });

        if repeated {
            let parts: Vec<Bson> = self
                .clauses
                .iter()
                .map(|(field, condition)| {
                    let mut part = Document::new();
                    part.insert(field.clone(), condition.to_bson());
                    Bson::Document(part)
                })
                .collect();
            return doc! { "$and": parts };
        }

        let mut rendered = Document::new();
        for (field, condition) in &self.clauses {
            rendered.insert(field.clone(), condition.to_bson());
        }
        rendered
    }

    /// In-process evaluation against a stored document.
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, condition)| condition.matches(lookup(document, field)))
    }
}

/// Resolves a dotted path inside a document.
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Orders two values of compatible types; numbers compare across widths.
pub fn compare_bson(left: &Bson, right: &Bson) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return l.partial_cmp(&r);
    }
    match (left, right) {
        (Bson::String(l), Bson::String(r)) => Some(l.cmp(r)),
        (Bson::DateTime(l), Bson::DateTime(r)) => Some(l.cmp(r)),
        (Bson::Boolean(l), Bson::Boolean(r)) => Some(l.cmp(r)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

pub fn bson_eq(left: &Bson, right: &Bson) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_flat_document_for_distinct_fields() {
        let filter = Filter::new()
            .eq("category", "c1")
            .compare("price", Operator::Gte, 10_i64);

        assert_eq!(
            filter.to_document(),
            doc! { "category": "c1", "price": { "$gte": 10_i64 } }
        );
    }

    #[test]
    fn renders_and_clause_when_a_field_repeats() {
        let filter = Filter::new()
            .compare("price", Operator::Gte, 10_i64)
            .compare("price", Operator::Lt, 50_i64);

        assert_eq!(
            filter.to_document(),
            doc! { "$and": [
                { "price": { "$gte": 10_i64 } },
                { "price": { "$lt": 50_i64 } },
            ] }
        );
    }

    #[test]
    fn contains_escapes_regex_metacharacters() {
        let filter = Filter::new().contains("title", "c++");
        assert_eq!(
            filter.to_document(),
            doc! { "title": { "$regex": "c\\+\\+", "$options": "i" } }
        );
        assert!(filter.matches(&doc! { "title": "Learning C++ fast" }));
        assert!(!filter.matches(&doc! { "title": "Learning C fast" }));
    }

    #[test]
    fn base_filter_wins_on_conflicting_field() {
        let request = Filter::new().eq("category", "evil").eq("brand", "b1");
        let base = Filter::new().eq("category", "c1");

        let merged = request.scoped_by(&base);
        assert_eq!(merged.to_document(), doc! { "brand": "b1", "category": "c1" });
    }

    #[test]
    fn numeric_comparison_crosses_integer_and_double() {
        let filter = Filter::new().compare("price", Operator::Gt, 9_i64);
        assert!(filter.matches(&doc! { "price": 9.5 }));
        assert!(!filter.matches(&doc! { "price": 9.0 }));
        assert!(!filter.matches(&doc! { "title": "no price" }));
    }

    #[test]
    fn any_of_matches_array_elements() {
        let filter = Filter::new().with(
            "subcategories",
            Condition::AnyOf(vec!["s1".into(), "s2".into()]),
        );
        assert!(filter.matches(&doc! { "subcategories": ["s0", "s2"] }));
        assert!(!filter.matches(&doc! { "subcategories": ["s3"] }));
    }

    #[test]
    fn lookup_follows_dotted_paths() {
        let document = doc! { "shippingAddress": { "city": "Haifa" } };
        assert_eq!(
            lookup(&document, "shippingAddress.city"),
            Some(&Bson::String("Haifa".into()))
        );
        assert_eq!(lookup(&document, "shippingAddress.zip"), None);
    }
}
