use bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Address, CartItem};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
}

/// Order created from a cart. Items, address and `totalOrderPrice` are
/// snapshots and never follow later catalog or cart changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user: String,
    pub cart_items: Vec<CartItem>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub tax_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub shipping_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_order_price: Decimal,
    #[serde(default)]
    pub payment_method_type: PaymentMethod,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub paid_at: Option<DateTime>,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub delivered_at: Option<DateTime>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

entity!(
    Order,
    "orders",
    numeric = ["taxPrice", "shippingPrice", "totalOrderPrice", "cartItems.quantity", "cartItems.price"],
    flags = ["isPaid", "isDelivered"]
);
