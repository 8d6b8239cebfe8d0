use std::{cmp::Ordering, marker::PhantomData};

use async_trait::async_trait;
use bson::{Bson, DateTime, Document};
use tokio::sync::RwLock;

use super::{DocumentStore, FindOptions, GroupStats, Increment, StoreResult};
use crate::models::Entity;
use crate::query::{compare_bson, filter::bson_eq, lookup, Filter};

/// In-process store keeping documents in insertion order.
///
/// Mirrors the server-side semantics the services rely on (operators,
/// array matching, `$inc`, `$addToSet`, `$pull`). Unique indexes are not
/// enforced.
pub struct MemoryStore<T> {
    documents: RwLock<Vec<Document>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    async fn modify<F>(&self, filter: &Filter, apply: F) -> StoreResult<Option<T>>
    where
        F: FnOnce(&mut Document) + Send,
    {
        let mut documents = self.documents.write().await;
        let Some(document) = documents.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(None);
        };
        apply(document);
        document.insert("updatedAt", DateTime::now());
        Ok(Some(bson::from_document(document.clone())?))
    }
}

fn sort_documents(documents: &mut [Document], sort: &Document) {
    documents.sort_by(|a, b| {
        for (field, direction) in sort {
            let ordering = match (lookup(a, field), lookup(b, field)) {
                (Some(l), Some(r)) => compare_bson(l, r).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let descending = matches!(direction, Bson::Int32(d) if *d < 0)
                || matches!(direction, Bson::Int64(d) if *d < 0);
            let ordering = if descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn project(document: Document, projection: &Document) -> Document {
    let inclusive = projection
        .values()
        .any(|flag| matches!(flag, Bson::Int32(1) | Bson::Int64(1) | Bson::Boolean(true)));

    if inclusive {
        document
            .into_iter()
            .filter(|(key, _)| {
                matches!(
                    projection.get(key),
                    Some(Bson::Int32(1) | Bson::Int64(1) | Bson::Boolean(true))
                )
            })
            .collect()
    } else {
        document
            .into_iter()
            .filter(|(key, _)| !projection.contains_key(key))
            .collect()
    }
}

fn add_amount(current: Option<&Bson>, amount: i64) -> Bson {
    match current {
        Some(Bson::Int32(v)) => Bson::Int64(i64::from(*v) + amount),
        Some(Bson::Int64(v)) => Bson::Int64(v + amount),
        Some(Bson::Double(v)) => Bson::Double(v + amount as f64),
        _ => Bson::Int64(amount),
    }
}

fn element_matches(element: &Bson, condition: &Bson) -> bool {
    match (element, condition) {
        (Bson::Document(element), Bson::Document(condition)) => condition
            .iter()
            .all(|(key, expected)| element.get(key).is_some_and(|v| bson_eq(v, expected))),
        _ => bson_eq(element, condition),
    }
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

#[async_trait]
impl<T: Entity> DocumentStore<T> for MemoryStore<T> {
    async fn find(&self, filter: &Filter, options: FindOptions) -> StoreResult<Vec<Document>> {
        let mut matched: Vec<Document> = self
            .documents
            .read()
            .await
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();

        if let Some(sort) = &options.sort {
            sort_documents(&mut matched, sort);
        }

        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .and_then(|limit| usize::try_from(limit).ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| match &options.projection {
                Some(projection) => project(d, projection),
                None => d,
            })
            .collect())
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let documents = self.documents.read().await;
        Ok(documents.iter().filter(|d| filter.matches(d)).count() as u64)
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        let documents = self.documents.read().await;
        documents
            .iter()
            .find(|d| filter.matches(d))
            .map(|d| bson::from_document(d.clone()))
            .transpose()
            .map_err(Into::into)
    }

    async fn create(&self, entity: &T) -> StoreResult<T> {
        let document = bson::to_document(entity)?;
        self.documents.write().await.push(document);
        Ok(entity.clone())
    }

    async fn update_by_id(&self, id: &str, changes: Document) -> StoreResult<Option<T>> {
        self.modify(&Filter::by_id(id), move |document| {
            for (key, value) in changes {
                document.insert(key, value);
            }
        })
        .await
    }

    async fn replace(&self, entity: &T) -> StoreResult<Option<T>> {
        let replacement = bson::to_document(entity)?;
        let filter = Filter::by_id(entity.id());
        let mut documents = self.documents.write().await;
        let Some(document) = documents.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(None);
        };
        *document = replacement;
        Ok(Some(entity.clone()))
    }

    async fn delete_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        let mut documents = self.documents.write().await;
        let Some(index) = documents.iter().position(|d| filter.matches(d)) else {
            return Ok(None);
        };
        let removed = documents.remove(index);
        Ok(Some(bson::from_document(removed)?))
    }

    async fn bulk_update(&self, increments: Vec<Increment>) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        let mut modified = 0;
        for increment in &increments {
            let Some(document) = documents.iter_mut().find(|d| increment.filter.matches(d)) else {
                continue;
            };
            for (field, amount) in &increment.amounts {
                let updated = add_amount(document.get(field), *amount);
                document.insert(field.clone(), updated);
            }
            modified += 1;
        }
        Ok(modified)
    }

    async fn group_average(&self, filter: &Filter, field: &str) -> StoreResult<Option<GroupStats>> {
        let documents = self.documents.read().await;
        let matched: Vec<&Document> = documents.iter().filter(|d| filter.matches(d)).collect();
        if matched.is_empty() {
            return Ok(None);
        }

        let values: Vec<f64> = matched
            .iter()
            .filter_map(|d| lookup(d, field).and_then(numeric))
            .collect();
        let average = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };

        Ok(Some(GroupStats {
            average,
            count: matched.len() as i64,
        }))
    }

    async fn add_to_set(&self, id: &str, field: &str, value: Bson) -> StoreResult<Option<T>> {
        let field = field.to_string();
        self.modify(&Filter::by_id(id), move |document| {
            let mut items = match document.get(&field) {
                Some(Bson::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            if !items.iter().any(|item| bson_eq(item, &value)) {
                items.push(value);
            }
            document.insert(field, items);
        })
        .await
    }

    async fn pull(&self, id: &str, field: &str, condition: Bson) -> StoreResult<Option<T>> {
        let field = field.to_string();
        self.modify(&Filter::by_id(id), move |document| {
            if let Some(Bson::Array(items)) = document.get_mut(&field) {
                items.retain(|item| !element_matches(item, &condition));
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, User};
    use bson::doc;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn find_sorts_skips_and_projects() {
        let store = MemoryStore::<Product>::new();
        for (title, price) in [("b", 20), ("a", 10), ("c", 30)] {
            store.create(&Product::new(title, Decimal::from(price), 5, "c1")).await.unwrap();
        }

        let options = FindOptions {
            sort: Some(doc! { "price": -1 }),
            projection: Some(doc! { "title": 1 }),
            skip: Some(1),
            limit: Some(1),
        };
        let found = store.find(&Filter::new(), options).await.unwrap();

        assert_eq!(found, vec![doc! { "title": "b" }]);
    }

    #[tokio::test]
    async fn bulk_update_increments_matching_documents_once() {
        let store = MemoryStore::<Product>::new();
        let product = store.create(&Product::new("lamp", Decimal::from(12), 10, "c1")).await.unwrap();

        let modified = store
            .bulk_update(vec![
                Increment::new(Filter::by_id(&product.id))
                    .by("quantity", -3)
                    .by("sold", 3),
                Increment::new(Filter::by_id("missing")).by("quantity", -1),
            ])
            .await
            .unwrap();

        let stored = store.find_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(modified, 1);
        assert_eq!(stored.quantity, 7);
        assert_eq!(stored.sold, 3);
    }

    #[tokio::test]
    async fn add_to_set_and_pull_edit_array_membership() {
        let store = MemoryStore::<User>::new();
        let user = store.create(&User::new("Dana", "dana@example.com")).await.unwrap();

        store.add_to_set(&user.id, "wishlist", "p1".into()).await.unwrap();
        store.add_to_set(&user.id, "wishlist", "p1".into()).await.unwrap();
        let updated = store
            .add_to_set(&user.id, "wishlist", "p2".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.wishlist, vec!["p1", "p2"]);

        let updated = store
            .pull(&user.id, "wishlist", "p1".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.wishlist, vec!["p2"]);
    }

    #[tokio::test]
    async fn group_average_is_none_without_matches() {
        let store = MemoryStore::<Product>::new();
        let stats = store
            .group_average(&Filter::new().eq("category", "none"), "price")
            .await
            .unwrap();
        assert!(stats.is_none());
    }
}
