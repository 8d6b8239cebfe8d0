use mongodb::{bson::doc, options::IndexOptions, Client, Database, IndexModel};

use crate::config::MongoConfig;
use crate::models::{
    Brand, Cart, Category, Coupon, Entity, Order, Product, Review, SubCategory, User,
};

pub async fn connect(config: &MongoConfig) -> Result<Client, mongodb::error::Error> {
    let client = Client::with_uri_str(&config.uri).await?;

    // Ping to verify connection
    client
        .database(&config.database)
        .run_command(doc! { "ping": 1 })
        .await?;
    tracing::info!("Connected to MongoDB database {}", config.database);

    Ok(client)
}

fn unique(keys: mongodb::bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn lookup(keys: mongodb::bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

async fn index<T: Entity>(
    db: &Database,
    extra: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    let mut indices = vec![unique(doc! { "id": 1 })];
    indices.extend(extra);
    db.collection::<T>(T::COLLECTION)
        .create_indexes(indices)
        .await?;
    Ok(())
}

pub async fn create_indices(db: &Database) -> Result<(), mongodb::error::Error> {
    index::<Category>(db, vec![]).await?;
    index::<SubCategory>(db, vec![lookup(doc! { "category": 1 })]).await?;
    index::<Brand>(db, vec![]).await?;
    index::<Product>(db, vec![lookup(doc! { "category": 1, "createdAt": -1 })]).await?;
    index::<Review>(db, vec![lookup(doc! { "product": 1 })]).await?;
    index::<Coupon>(db, vec![unique(doc! { "name": 1 })]).await?;
    // One cart per user
    index::<Cart>(db, vec![unique(doc! { "user": 1 })]).await?;
    index::<Order>(db, vec![lookup(doc! { "user": 1, "createdAt": -1 })]).await?;
    index::<User>(db, vec![unique(doc! { "email": 1 })]).await?;

    tracing::info!("Database indices created");
    Ok(())
}
