use bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::new_id;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    #[schema(example = "Electronics")]
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

impl Category {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: new_id(),
            name: name.into(),
            slug: slug.into(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }
}

entity!(Category, "categories");

/// Child of a [`Category`]; listed through the parent with a base filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: String,
    #[schema(example = "Headphones")]
    pub name: String,
    pub slug: String,
    pub category: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

impl SubCategory {
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: new_id(),
            name: name.into(),
            slug: slug.into(),
            category: category.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

entity!(SubCategory, "subcategories");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: String,
    #[schema(example = "Acme")]
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

impl Brand {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: new_id(),
            name: name.into(),
            slug: slug.into(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }
}

entity!(Brand, "brands");

/// Catalog product. `quantity` is the stock level and may go negative when
/// orders oversell; `ratingsAverage`/`ratingsQuantity` are derived from reviews.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[schema(example = "Wireless Bluetooth Headphones")]
    pub title: String,
    pub slug: String,
    pub description: String,
    pub quantity: i64,
    #[serde(default)]
    pub sold: i64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(example = 29.99)]
    pub price: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price_after_discount: Option<Decimal>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default)]
    pub ratings_average: f64,
    #[serde(default)]
    pub ratings_quantity: i64,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

impl Product {
    pub fn new(
        title: impl Into<String>,
        price: Decimal,
        quantity: i64,
        category: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let now = DateTime::now();
        Self {
            id: new_id(),
            slug: title.to_lowercase().replace(' ', "-"),
            description: title.clone(),
            title,
            quantity,
            sold: 0,
            price,
            price_after_discount: None,
            colors: Vec::new(),
            image_cover: String::new(),
            images: Vec::new(),
            category: category.into(),
            subcategories: Vec::new(),
            brand: None,
            ratings_average: 0.0,
            ratings_quantity: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

entity!(
    Product,
    "products",
    search = "title",
    numeric = ["quantity", "sold", "price", "priceAfterDiscount", "ratingsAverage", "ratingsQuantity"]
);
