use async_trait::async_trait;
use bson::{doc, Bson, DateTime, Document};
use futures::TryStreamExt;
use mongodb::{options::ReturnDocument, Client, Collection, Database};

use super::{DocumentStore, FindOptions, GroupStats, Increment, StoreError, StoreResult};
use crate::models::Entity;
use crate::query::Filter;

/// MongoDB binding of [`DocumentStore`] for one entity collection.
pub struct MongoStore<T: Entity> {
    database: Database,
    collection: Collection<T>,
}

impl<T: Entity> MongoStore<T> {
    pub fn new(client: &Client, database: &str) -> Self {
        let database = client.database(database);
        Self {
            collection: database.collection(T::COLLECTION),
            database,
        }
    }

    fn documents(&self) -> Collection<Document> {
        self.collection.clone_with_type()
    }

    async fn update_returning(&self, id: &str, update: Document) -> StoreResult<Option<T>> {
        let updated = self
            .collection
            .find_one_and_update(doc! { "id": id }, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }
}

fn as_f64(value: Option<&Bson>) -> f64 {
    match value {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

fn as_i64(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

/// One `update` command carrying every increment as its own statement: a
/// single round trip that any server version accepts.
fn update_command(collection: &str, increments: &[Increment]) -> Document {
    let updates: Vec<Document> = increments
        .iter()
        .map(|increment| {
            doc! {
                "q": increment.filter.to_document(),
                "u": increment.to_update(),
                "multi": false,
            }
        })
        .collect();

    doc! {
        "update": collection,
        "updates": updates,
        "ordered": true,
    }
}

/// First write or write-concern error reported in a command reply.
fn write_failure(reply: &Document) -> Option<String> {
    let first = reply
        .get_array("writeErrors")
        .ok()
        .and_then(|errors| errors.first())
        .and_then(Bson::as_document)
        .or_else(|| reply.get_document("writeConcernError").ok())?;
    Some(format!(
        "code {}: {}",
        as_i64(first.get("code")),
        first.get_str("errmsg").unwrap_or("unknown write error")
    ))
}

#[async_trait]
impl<T: Entity> DocumentStore<T> for MongoStore<T> {
    async fn find(&self, filter: &Filter, options: FindOptions) -> StoreResult<Vec<Document>> {
        let find_options = mongodb::options::FindOptions::builder()
            .sort(options.sort)
            .projection(options.projection)
            .skip(options.skip)
            .limit(options.limit)
            .build();

        let documents = self
            .documents()
            .find(filter.to_document())
            .with_options(find_options)
            .await?
            .try_collect()
            .await?;
        Ok(documents)
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        Ok(self.collection.count_documents(filter.to_document()).await?)
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        Ok(self.collection.find_one(filter.to_document()).await?)
    }

    async fn create(&self, entity: &T) -> StoreResult<T> {
        self.collection.insert_one(entity).await?;
        Ok(entity.clone())
    }

    async fn update_by_id(&self, id: &str, mut changes: Document) -> StoreResult<Option<T>> {
        changes.insert("updatedAt", DateTime::now());
        self.update_returning(id, doc! { "$set": changes }).await
    }

    async fn replace(&self, entity: &T) -> StoreResult<Option<T>> {
        let replaced = self
            .collection
            .find_one_and_replace(doc! { "id": entity.id() }, entity)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(replaced)
    }

    async fn delete_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        Ok(self.collection.find_one_and_delete(filter.to_document()).await?)
    }

    async fn bulk_update(&self, increments: Vec<Increment>) -> StoreResult<u64> {
        if increments.is_empty() {
            return Ok(0);
        }

        let reply = self
            .database
            .run_command(update_command(self.collection.name(), &increments))
            .await?;

        if let Some(failure) = write_failure(&reply) {
            return Err(StoreError::Write(failure));
        }
        Ok(u64::try_from(as_i64(reply.get("nModified"))).unwrap_or_default())
    }

    async fn group_average(&self, filter: &Filter, field: &str) -> StoreResult<Option<GroupStats>> {
        let pipeline = vec![
            doc! { "$match": filter.to_document() },
            doc! { "$group": {
                "_id": Bson::Null,
                "average": { "$avg": format!("${field}") },
                "count": { "$sum": 1 },
            } },
        ];

        let mut cursor = self.documents().aggregate(pipeline).await?;
        let Some(group) = cursor.try_next().await? else {
            return Ok(None);
        };

        Ok(Some(GroupStats {
            average: as_f64(group.get("average")),
            count: as_i64(group.get("count")),
        }))
    }

    async fn add_to_set(&self, id: &str, field: &str, value: Bson) -> StoreResult<Option<T>> {
        let mut add = Document::new();
        add.insert(field, value);
        self.update_returning(
            id,
            doc! { "$addToSet": add, "$set": { "updatedAt": DateTime::now() } },
        )
        .await
    }

    async fn pull(&self, id: &str, field: &str, condition: Bson) -> StoreResult<Option<T>> {
        let mut pull = Document::new();
        pull.insert(field, condition);
        self.update_returning(
            id,
            doc! { "$pull": pull, "$set": { "updatedAt": DateTime::now() } },
        )
        .await
    }
}
