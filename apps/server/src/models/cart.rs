use bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::new_id;

/// Line item owned by a [`Cart`]. `price` is the unit price frozen when the
/// product was first added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub product: String,
    #[schema(example = 1)]
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(example = 29.99)]
    pub price: Decimal,
}

impl CartItem {
    pub fn new(
        product: impl Into<String>,
        quantity: i64,
        color: Option<String>,
        price: Decimal,
    ) -> Self {
        Self {
            id: new_id(),
            product: product.into(),
            quantity,
            color,
            price,
        }
    }
}

/// One cart per user. Totals are derived; see the pricing operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub user: String,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total_cart_price: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_price_after_discount: Option<Decimal>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

impl Cart {
    pub fn new(user: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: new_id(),
            user: user.into(),
            cart_items: Vec::new(),
            total_cart_price: Decimal::ZERO,
            total_price_after_discount: None,
            created_at: now,
            updated_at: now,
        }
    }
}

entity!(
    Cart,
    "carts",
    search = "user",
    numeric = ["totalCartPrice", "totalPriceAfterDiscount", "cartItems.quantity", "cartItems.price"]
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    #[schema(example = "SUMMER10")]
    pub name: String,
    #[schema(value_type = String, format = DateTime)]
    pub expire: DateTime,
    /// Percentage in `0..=100`.
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(example = 10.0)]
    pub discount: Decimal,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

impl Coupon {
    pub fn new(name: impl Into<String>, expire: DateTime, discount: Decimal) -> Self {
        let now = DateTime::now();
        Self {
            id: new_id(),
            name: name.into(),
            expire,
            discount,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self, now: DateTime) -> bool {
        now < self.expire
    }
}

entity!(Coupon, "coupons", numeric = ["discount"]);
