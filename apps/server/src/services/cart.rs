use bson::DateTime;

use crate::errors::{AppError, AppResult};
use crate::models::{Cart, Coupon, Entity, Product};
use crate::query::{Filter, Operator};
use crate::store::SharedStore;

/// Loads, mutates and saves the caller's cart.
///
/// Each operation is a read-modify-write against the store; concurrent
/// mutations of the same cart are last-write-wins.
#[derive(Clone)]
pub struct CartService {
    carts: SharedStore<Cart>,
    products: SharedStore<Product>,
    coupons: SharedStore<Coupon>,
}

impl CartService {
    pub fn new(
        carts: SharedStore<Cart>,
        products: SharedStore<Product>,
        coupons: SharedStore<Coupon>,
    ) -> Self {
        Self {
            carts,
            products,
            coupons,
        }
    }

    /// `None` means the user has no active cart.
    pub async fn get_cart(&self, user_id: &str) -> AppResult<Option<Cart>> {
        Ok(self.carts.find_one(&Filter::new().eq("user", user_id)).await?)
    }

    async fn require_cart(&self, user_id: &str) -> AppResult<Cart> {
        self.get_cart(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("there is no cart for user {user_id}")))
    }

    async fn save(&self, mut cart: Cart) -> AppResult<Cart> {
        cart.touch(DateTime::now());
        self.carts
            .replace(&cart)
            .await?
            .ok_or_else(|| AppError::not_found(format!("there is no cart with id {}", cart.id)))
    }

    /// Adds one unit of the product, creating the cart on first use.
    pub async fn add_product(
        &self,
        user_id: &str,
        product_id: &str,
        color: Option<String>,
    ) -> AppResult<Cart> {
        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no product with this id {product_id}")))?;

        let cart = match self.get_cart(user_id).await? {
            Some(mut cart) => {
                cart.add_item(&product, 1, color)?;
                self.save(cart).await?
            }
            None => {
                let mut cart = Cart::new(user_id);
                cart.add_item(&product, 1, color)?;
                self.carts.create(&cart).await?
            }
        };

        tracing::info!(
            "cart add - user: {}, product: {}, items: {}",
            user_id,
            product_id,
            cart.cart_items.len()
        );
        Ok(cart)
    }

    pub async fn update_item_quantity(
        &self,
        user_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> AppResult<Cart> {
        let mut cart = self.require_cart(user_id).await?;
        cart.set_item_quantity(item_id, quantity)?;
        let cart = self.save(cart).await?;

        tracing::info!("cart quantity - user: {}, item: {} -> {}", user_id, item_id, quantity);
        Ok(cart)
    }

    pub async fn remove_item(&self, user_id: &str, item_id: &str) -> AppResult<Cart> {
        let mut cart = self.require_cart(user_id).await?;
        let removed = cart.remove_item(item_id);
        let cart = self.save(cart).await?;

        tracing::info!("cart remove - user: {}, item: {}, removed: {}", user_id, item_id, removed);
        Ok(cart)
    }

    /// Applies a coupon that is still valid at call time. An unknown or
    /// expired coupon leaves the cart untouched.
    pub async fn apply_coupon(&self, user_id: &str, coupon_name: &str) -> AppResult<Cart> {
        let now = DateTime::now();
        let coupon = self
            .coupons
            .find_one(
                &Filter::new()
                    .eq("name", coupon_name)
                    .compare("expire", Operator::Gt, now),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Coupon is invalid or expired"))?;

        let mut cart = self.require_cart(user_id).await?;
        let total = cart.apply_coupon(&coupon, now)?;
        let cart = self.save(cart).await?;

        tracing::info!("cart coupon - user: {}, coupon: {}, total: {}", user_id, coupon_name, total);
        Ok(cart)
    }

    /// Deletes the user's cart. Clearing a missing cart is a no-op.
    pub async fn clear(&self, user_id: &str) -> AppResult<()> {
        let removed = self
            .carts
            .delete_one(&Filter::new().eq("user", user_id))
            .await?;
        tracing::info!("cart clear - user: {}, existed: {}", user_id, removed.is_some());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::{DocumentStore, MemoryStore};

    struct Fixture {
        service: CartService,
        products: Arc<MemoryStore<Product>>,
        coupons: Arc<MemoryStore<Coupon>>,
    }

    fn fixture() -> Fixture {
        let products = Arc::new(MemoryStore::new());
        let coupons = Arc::new(MemoryStore::new());
        let service = CartService::new(
            Arc::new(MemoryStore::<Cart>::new()),
            products.clone(),
            coupons.clone(),
        );
        Fixture {
            service,
            products,
            coupons,
        }
    }

    fn money(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    async fn product(fixture: &Fixture, price: &str) -> Product {
        fixture
            .products
            .create(&Product::new(format!("p{price}"), money(price), 10, "c1"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn first_add_creates_cart_and_repeat_add_increments() {
        let f = fixture();
        let a = product(&f, "10").await;
        assert!(f.service.get_cart("u1").await.unwrap().is_none());

        f.service.add_product("u1", &a.id, None).await.unwrap();
        let cart = f.service.add_product("u1", &a.id, None).await.unwrap();

        assert_eq!(cart.cart_items.len(), 1);
        assert_eq!(cart.cart_items[0].quantity, 2);
        assert_eq!(cart.total_cart_price, money("20"));
        assert_eq!(f.service.get_cart("u1").await.unwrap(), Some(cart));
    }

    #[tokio::test]
    async fn adding_unknown_product_is_not_found() {
        let f = fixture();
        let err = f.service.add_product("u1", "ghost", None).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(f.service.get_cart("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn coupon_applies_then_is_dropped_by_next_change() {
        let f = fixture();
        let (a, b) = (product(&f, "10").await, product(&f, "5").await);
        f.coupons
            .create(&Coupon::new(
                "TEN",
                DateTime::from_chrono(Utc::now() + Duration::hours(1)),
                money("10"),
            ))
            .await
            .unwrap();

        f.service.add_product("u1", &a.id, None).await.unwrap();
        f.service.add_product("u1", &a.id, None).await.unwrap();
        f.service.add_product("u1", &b.id, None).await.unwrap();

        let cart = f.service.apply_coupon("u1", "TEN").await.unwrap();
        assert_eq!(cart.total_cart_price, money("25"));
        assert_eq!(cart.total_price_after_discount, Some(money("22.5")));

        let item = cart.cart_items[1].id.clone();
        let cart = f.service.update_item_quantity("u1", &item, 3).await.unwrap();
        assert_eq!(cart.total_cart_price, money("35"));
        assert_eq!(cart.total_price_after_discount, None);
    }

    #[tokio::test]
    async fn expired_coupon_is_rejected_and_cart_unchanged() {
        let f = fixture();
        let a = product(&f, "10").await;
        f.coupons
            .create(&Coupon::new(
                "OLD",
                DateTime::from_chrono(Utc::now() - Duration::hours(1)),
                money("50"),
            ))
            .await
            .unwrap();
        let before = f.service.add_product("u1", &a.id, None).await.unwrap();

        let err = f.service.apply_coupon("u1", "OLD").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.service.get_cart("u1").await.unwrap(), Some(before));
    }

    #[tokio::test]
    async fn cart_operations_without_cart_are_not_found() {
        let f = fixture();
        assert!(f.service.remove_item("u1", "i1").await.unwrap_err().is_not_found());
        assert!(f
            .service
            .update_item_quantity("u1", "i1", 2)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn clear_removes_cart_and_tolerates_absence() {
        let f = fixture();
        let a = product(&f, "1.5").await;
        f.service.add_product("u1", &a.id, None).await.unwrap();

        f.service.clear("u1").await.unwrap();
        f.service.clear("u1").await.unwrap();
        assert!(f.service.get_cart("u1").await.unwrap().is_none());
    }
}
