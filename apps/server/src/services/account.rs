use bson::{doc, Bson};

use crate::errors::{AppError, AppResult};
use crate::models::{new_id, Address, Product, User};
use crate::query::{Condition, Filter};
use crate::store::{FindOptions, SharedStore};

/// Wishlist and address-book edits. Each edit is a single atomic store
/// update, so concurrent edits never lose each other.
#[derive(Clone)]
pub struct AccountService {
    users: SharedStore<User>,
    products: SharedStore<Product>,
}

impl AccountService {
    pub fn new(users: SharedStore<User>, products: SharedStore<Product>) -> Self {
        Self { users, products }
    }

    async fn user(&self, user_id: &str) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| missing_user(user_id))
    }

    /// The wishlisted products, in wishlist order. Ids whose product no
    /// longer exists are skipped.
    pub async fn wishlist(&self, user_id: &str) -> AppResult<Vec<Product>> {
        let ids = self.user(user_id).await?.wishlist;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = Filter::new().with(
            "id",
            Condition::AnyOf(ids.iter().cloned().map(Bson::String).collect()),
        );
        let options = FindOptions {
            projection: Some(doc! { "_id": 0 }),
            ..FindOptions::default()
        };
        let mut products = self
            .products
            .find(&filter, options)
            .await?
            .into_iter()
            .map(bson::from_document::<Product>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| AppError::Upstream(format!("failed to decode product: {err}")))?;

        products.sort_by_key(|product| ids.iter().position(|id| *id == product.id));
        Ok(products)
    }

    /// Marks the account inactive. The profile and its relations are kept.
    pub async fn deactivate(&self, user_id: &str) -> AppResult<User> {
        let user = self
            .users
            .update_by_id(user_id, doc! { "active": false })
            .await?
            .ok_or_else(|| missing_user(user_id))?;

        tracing::info!("account deactivate - user: {}", user_id);
        Ok(user)
    }

    pub async fn add_to_wishlist(&self, user_id: &str, product_id: &str) -> AppResult<Vec<String>> {
        let user = self
            .users
            .add_to_set(user_id, "wishlist", Bson::String(product_id.to_string()))
            .await?
            .ok_or_else(|| missing_user(user_id))?;

        tracing::info!("wishlist add - user: {}, product: {}", user_id, product_id);
        Ok(user.wishlist)
    }

    pub async fn remove_from_wishlist(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> AppResult<Vec<String>> {
        let user = self
            .users
            .pull(user_id, "wishlist", Bson::String(product_id.to_string()))
            .await?
            .ok_or_else(|| missing_user(user_id))?;

        tracing::info!("wishlist remove - user: {}, product: {}", user_id, product_id);
        Ok(user.wishlist)
    }

    pub async fn addresses(&self, user_id: &str) -> AppResult<Vec<Address>> {
        Ok(self.user(user_id).await?.addresses)
    }

    /// Stores the address under a fresh id.
    pub async fn add_address(&self, user_id: &str, mut address: Address) -> AppResult<Vec<Address>> {
        address.id = new_id();
        let value = bson::to_bson(&address)
            .map_err(|err| AppError::Upstream(format!("failed to encode address: {err}")))?;

        let user = self
            .users
            .add_to_set(user_id, "addresses", value)
            .await?
            .ok_or_else(|| missing_user(user_id))?;

        tracing::info!("address add - user: {}, address: {}", user_id, address.id);
        Ok(user.addresses)
    }

    pub async fn remove_address(&self, user_id: &str, address_id: &str) -> AppResult<Vec<Address>> {
        let user = self
            .users
            .pull(user_id, "addresses", Bson::Document(doc! { "id": address_id }))
            .await?
            .ok_or_else(|| missing_user(user_id))?;

        tracing::info!("address remove - user: {}, address: {}", user_id, address_id);
        Ok(user.addresses)
    }
}

fn missing_user(user_id: &str) -> AppError {
    AppError::not_found(format!("no user with this id {user_id}"))
}
