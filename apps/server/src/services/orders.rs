use bson::DateTime;
use rust_decimal::Decimal;

use crate::config::PricingConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Address, Cart, Entity, Order, PaymentMethod, Product};
use crate::query::{Filter, QueryRequest};
use crate::services::handlers::{ListResponse, ResourceHandler};
use crate::store::{Increment, SharedStore};

/// Turns carts into orders and drives paid/delivered state.
#[derive(Clone)]
pub struct OrderService {
    orders: ResourceHandler<Order>,
    carts: SharedStore<Cart>,
    products: SharedStore<Product>,
    pricing: PricingConfig,
}

impl Order {
    /// Freezes the cart's items and payable total into a new cash order.
    pub fn from_cart(
        cart: &Cart,
        shipping_address: Option<Address>,
        tax_price: Decimal,
        shipping_price: Decimal,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: crate::models::new_id(),
            user: cart.user.clone(),
            cart_items: cart.cart_items.clone(),
            tax_price,
            shipping_price,
            shipping_address,
            total_order_price: cart.payable_total() + tax_price + shipping_price,
            payment_method_type: PaymentMethod::Cash,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn toggle_paid(&mut self, now: DateTime) {
        self.is_paid = !self.is_paid;
        self.paid_at = self.is_paid.then_some(now);
    }

    pub fn toggle_delivered(&mut self, now: DateTime) {
        self.is_delivered = !self.is_delivered;
        self.delivered_at = self.is_delivered.then_some(now);
    }
}

impl OrderService {
    pub fn new(
        orders: ResourceHandler<Order>,
        carts: SharedStore<Cart>,
        products: SharedStore<Product>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            orders,
            carts,
            products,
            pricing,
        }
    }

    /// Creates an order from the cart, then moves stock to `sold` for every
    /// ordered product in one batched write, then deletes the cart.
    ///
    /// Stock is not checked first, so quantities can go negative. The steps
    /// are not transactional: a failure after the order is stored leaves the
    /// order in place.
    pub async fn create_order(
        &self,
        cart_id: &str,
        shipping_address: Option<Address>,
        tax_price: Decimal,
        shipping_price: Decimal,
    ) -> AppResult<Order> {
        let cart = self
            .carts
            .find_by_id(cart_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("There is no such cart with id {cart_id}")))?;

        let order = self
            .orders
            .create(Order::from_cart(&cart, shipping_address, tax_price, shipping_price))
            .await?;

        let increments = order
            .cart_items
            .iter()
            .map(|item| {
                Increment::new(Filter::by_id(&item.product))
                    .by("quantity", -item.quantity)
                    .by("sold", item.quantity)
            })
            .collect();
        if let Err(err) = self.products.bulk_update(increments).await {
            tracing::error!("order {} stored but inventory update failed: {}", order.id, err);
            return Err(err.into());
        }

        self.carts.delete_by_id(&cart.id).await?;

        tracing::info!(
            "order create - id: {}, user: {}, total: {}",
            order.id,
            order.user,
            order.total_order_price
        );
        Ok(order)
    }

    /// Cash order priced with the configured tax and shipping.
    pub async fn create_cash_order(
        &self,
        cart_id: &str,
        shipping_address: Option<Address>,
    ) -> AppResult<Order> {
        self.create_order(
            cart_id,
            shipping_address,
            self.pricing.tax_price,
            self.pricing.shipping_price,
        )
        .await
    }

    /// Orders visible to the caller; customers pass their own id as scope.
    pub async fn list(&self, user_scope: Option<&str>, request: &QueryRequest) -> AppResult<ListResponse> {
        let base = match user_scope {
            Some(user) => Filter::new().eq("user", user),
            None => Filter::new(),
        };
        self.orders.list(&base, request, Order::SEARCH_FIELD).await
    }

    pub async fn get(&self, order_id: &str) -> AppResult<Order> {
        self.orders.get_by_id(order_id).await
    }

    /// Flips `isPaid`; `paidAt` is set on the way to true and cleared on the
    /// way back, so two toggles restore the unpaid state.
    pub async fn toggle_paid(&self, order_id: &str) -> AppResult<Order> {
        let order = self
            .transition(order_id, |order, now| order.toggle_paid(now))
            .await?;
        tracing::info!("order paid - id: {}, is_paid: {}", order.id, order.is_paid);
        Ok(order)
    }

    pub async fn toggle_delivered(&self, order_id: &str) -> AppResult<Order> {
        let order = self
            .transition(order_id, |order, now| order.toggle_delivered(now))
            .await?;
        tracing::info!("order delivered - id: {}, is_delivered: {}", order.id, order.is_delivered);
        Ok(order)
    }

    async fn transition<F>(&self, order_id: &str, apply: F) -> AppResult<Order>
    where
        F: FnOnce(&mut Order, DateTime),
    {
        let mut order = self.orders.get_by_id(order_id).await?;
        let now = DateTime::now();
        apply(&mut order, now);
        order.touch(now);

        self.orders
            .store()
            .replace(&order)
            .await?
            .ok_or_else(|| AppError::not_found(format!("There is no such order with id {order_id}")))
    }
}
