use std::sync::Arc;

use mongodb::{Client, Database};

use crate::config::AppConfig;
use crate::models::{Brand, Category, Coupon, Entity, Product, Review, SubCategory, User};
use crate::services::{
    AccountService, CartService, OrderService, RatingAggregator, ResourceHandler, ReviewService,
};
use crate::store::{MongoStore, SharedStore};

/// Everything the HTTP layer needs, bound to MongoDB collections.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub categories: ResourceHandler<Category>,
    pub subcategories: ResourceHandler<SubCategory>,
    pub brands: ResourceHandler<Brand>,
    pub products: ResourceHandler<Product>,
    pub coupons: ResourceHandler<Coupon>,
    pub users: ResourceHandler<User>,
    pub reviews: ReviewService,
    pub carts: CartService,
    pub orders: OrderService,
    pub accounts: AccountService,
}

fn store<T: Entity>(client: &Client, database: &str) -> SharedStore<T> {
    Arc::new(MongoStore::<T>::new(client, database))
}

impl AppState {
    pub fn new(client: &Client, config: &AppConfig) -> Self {
        let db = config.mongo.database.as_str();
        let products = store::<Product>(client, db);
        let reviews = store::<Review>(client, db);
        let coupons = store::<Coupon>(client, db);
        let users = store::<User>(client, db);
        let carts = store(client, db);

        Self {
            database: client.database(db),
            categories: ResourceHandler::new(store(client, db)),
            subcategories: ResourceHandler::new(store(client, db)),
            brands: ResourceHandler::new(store(client, db)),
            products: ResourceHandler::new(products.clone()),
            coupons: ResourceHandler::new(coupons.clone()),
            users: ResourceHandler::new(users.clone()),
            reviews: ReviewService::new(
                ResourceHandler::new(reviews.clone()),
                RatingAggregator::new(reviews, products.clone()),
            ),
            carts: CartService::new(carts.clone(), products.clone(), coupons),
            orders: OrderService::new(
                ResourceHandler::new(store(client, db)),
                carts,
                products.clone(),
                config.pricing,
            ),
            accounts: AccountService::new(users, products),
        }
    }
}
