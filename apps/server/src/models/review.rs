use bson::DateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::new_id;

/// A user's rating of a product. One review per (user, product) is enforced
/// upstream by request validation, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[schema(example = 4.5)]
    pub ratings: f64,
    pub user: String,
    pub product: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

impl Review {
    pub fn new(user: impl Into<String>, product: impl Into<String>, ratings: f64) -> Self {
        let now = DateTime::now();
        Self {
            id: new_id(),
            title: None,
            ratings,
            user: user.into(),
            product: product.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

entity!(Review, "reviews", search = "title", numeric = ["ratings"]);

/// Review aggregate written back onto the product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub product: String,
    pub ratings_average: f64,
    pub ratings_quantity: i64,
}
