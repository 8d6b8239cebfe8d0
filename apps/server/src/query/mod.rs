//! List-endpoint query pipeline.
//!
//! A [`QueryRequest`] holds the raw query-string pairs. [`execute`] turns it
//! into a count and a page of documents in a fixed order: filter, search,
//! count, sort, projection, paginate. The count therefore reflects filter and
//! search but never the page window.

pub mod filter;
mod pagination;

pub use filter::{compare_bson, lookup, Condition, Filter, Operator};
pub use pagination::{Page, PaginationResult};

use std::collections::BTreeMap;

use bson::{doc, Bson, DateTime, Document};
use chrono::{NaiveDate, Utc};

use crate::models::Entity;
use crate::store::{DocumentStore, FindOptions, StoreResult};

pub const RESERVED_KEYS: [&str; 5] = ["page", "limit", "sort", "fields", "keyword"];

const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Raw query parameters of one list request. Repeated keys accumulate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |request, (key, value)| request.with(key, value))
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn keyword(&self) -> Option<&str> {
        self.get("keyword").filter(|keyword| !keyword.is_empty())
    }

    pub fn page(&self) -> Option<Page> {
        Page::from_raw(self.get("page"), self.get("limit"))
    }

    fn filter_params(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.params
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
    }
}

/// Parses a raw value as a number, or `None` when it is not one.
fn number(raw: &str) -> Option<Bson> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(Bson::Int64(value));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Bson::Double)
}

/// Parses RFC 3339 timestamps and plain `YYYY-MM-DD` dates (UTC midnight).
fn timestamp(raw: &str) -> Option<Bson> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(Bson::DateTime(DateTime::from_chrono(parsed.with_timezone(&Utc))));
    }
    let midnight = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?;
    Some(Bson::DateTime(DateTime::from_chrono(midnight.and_utc())))
}

/// Interprets a raw equality value by the stored type of `field`. Values
/// for text fields stay strings even when they look like numbers.
pub fn coerce<T: Entity>(field: &str, raw: &str) -> Bson {
    let typed = if T::is_numeric(field) {
        number(raw)
    } else if T::is_flag(field) {
        match raw {
            "true" => Some(Bson::Boolean(true)),
            "false" => Some(Bson::Boolean(false)),
            _ => None,
        }
    } else {
        None
    };
    typed.unwrap_or_else(|| Bson::String(raw.to_string()))
}

/// Interprets the bound of a range comparison: numeric fields take numbers,
/// any other field takes a date when the value parses as one.
pub fn coerce_bound<T: Entity>(field: &str, raw: &str) -> Bson {
    let typed = if T::is_numeric(field) {
        number(raw)
    } else {
        timestamp(raw)
    };
    typed.unwrap_or_else(|| Bson::String(raw.to_string()))
}

/// Splits `price[gte]` into `("price", Some("gte"))`.
fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.strip_suffix(']').and_then(|rest| rest.split_once('[')) {
        Some((field, suffix)) if !field.is_empty() => (field, Some(suffix)),
        _ => (key, None),
    }
}

/// Step 1: translate non-reserved parameters into conditions, then merge the
/// base filter, which wins on any field it constrains.
pub fn build_filter<T: Entity>(base: &Filter, request: &QueryRequest) -> Filter {
    let mut filter = Filter::new();

    for (key, values) in request.filter_params() {
        let (field, suffix) = split_key(key);
        match suffix {
            None => {
                let candidates: Vec<&str> = values
                    .iter()
                    .flat_map(|v| v.split(','))
                    .filter(|v| !v.is_empty())
                    .collect();
                let condition = match candidates.as_slice() {
                    // `field=` still means "equals the empty string"
                    [] => Condition::Eq(Bson::String(String::new())),
                    [single] => Condition::Eq(coerce::<T>(field, single)),
                    many => Condition::AnyOf(many.iter().map(|v| coerce::<T>(field, v)).collect()),
                };
                filter = filter.with(field, condition);
            }
            Some(suffix) => match Operator::from_suffix(suffix) {
                Some(op) => {
                    for value in values {
                        filter = filter.compare(field, op, coerce_bound::<T>(field, value));
                    }
                }
                None => {
                    // unrecognized suffix: literal sub-document match
                    for value in values {
                        let mut literal = Document::new();
                        literal.insert(suffix, value.clone());
                        filter = filter.eq(field, literal);
                    }
                }
            },
        }
    }

    filter.scoped_by(base)
}

/// Step 2: AND a case-insensitive substring match on `field`.
pub fn search(filter: Filter, field: &str, keyword: Option<&str>) -> Filter {
    match keyword {
        Some(keyword) => filter.contains(field, keyword),
        None => filter,
    }
}

/// Step 4: `-field` sorts descending. Defaults to newest first.
pub fn sort_spec(raw: Option<&str>) -> Document {
    let mut sort = Document::new();
    for part in raw.unwrap_or_default().split([',', ' ']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.strip_prefix('-') {
            Some(field) if !field.is_empty() => sort.insert(field, -1),
            _ => sort.insert(part.trim_start_matches('+'), 1),
        };
    }
    if sort.is_empty() {
        sort.insert(DEFAULT_SORT_FIELD, -1);
    }
    sort
}

/// Step 5: allow-list of returned fields. `-field` excludes instead; an
/// inclusive projection always keeps `id`.
pub fn projection(raw: Option<&str>) -> Option<Document> {
    let mut projection = Document::new();
    for part in raw?.split([',', ' ']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.strip_prefix('-') {
            Some(field) => projection.insert(field, 0),
            None => projection.insert(part, 1),
        };
    }
    if projection.is_empty() {
        return None;
    }
    if projection.values().any(|flag| flag == &Bson::Int32(1)) {
        projection.insert("id", 1);
        projection.insert("_id", 0);
    }
    Some(projection)
}

/// Runs the whole pipeline against `store`.
pub async fn execute<T: Entity>(
    store: &dyn DocumentStore<T>,
    base: &Filter,
    request: &QueryRequest,
    search_field: &str,
) -> StoreResult<(Vec<Document>, PaginationResult)> {
    let filter = search(build_filter::<T>(base, request), search_field, request.keyword());
    let count = store.count(&filter).await?;

    let page = request.page();
    let options = FindOptions {
        sort: Some(sort_spec(request.get("sort"))),
        projection: projection(request.get("fields")).or_else(|| Some(doc! { "_id": 0 })),
        skip: page.map(|p| p.skip()),
        limit: page.map(|p| i64::try_from(p.limit).unwrap_or(i64::MAX)),
    };
    tracing::debug!(
        "{} query - filter: {}, options: {:?}",
        T::COLLECTION,
        filter.to_document(),
        options
    );

    let documents = store.find(&filter, options).await?;
    let pagination = page.map(|p| p.result(count)).unwrap_or_default();
    Ok((documents, pagination))
}
