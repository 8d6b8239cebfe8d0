use bson::doc;

use crate::errors::{AppError, AppResult};
use crate::models::{Product, RatingSummary, Review};
use crate::query::Filter;
use crate::store::SharedStore;

/// Recomputes a product's rating summary from its full review set.
#[derive(Clone)]
pub struct RatingAggregator {
    reviews: SharedStore<Review>,
    products: SharedStore<Product>,
}

impl RatingAggregator {
    pub fn new(reviews: SharedStore<Review>, products: SharedStore<Product>) -> Self {
        Self { reviews, products }
    }

    /// Averages every review of `product_id` and writes the result onto the
    /// product. A product with no reviews left gets `0`/`0`.
    pub async fn recompute(&self, product_id: &str) -> AppResult<RatingSummary> {
        let stats = self
            .reviews
            .group_average(&Filter::new().eq("product", product_id), "ratings")
            .await?;

        let summary = RatingSummary {
            product: product_id.to_string(),
            ratings_average: stats.map_or(0.0, |s| s.average),
            ratings_quantity: stats.map_or(0, |s| s.count),
        };

        self.products
            .update_by_id(
                product_id,
                doc! {
                    "ratingsAverage": summary.ratings_average,
                    "ratingsQuantity": summary.ratings_quantity,
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found(format!("no product with this id {product_id}")))?;

        tracing::debug!(
            "ratings - product: {}, average: {}, quantity: {}",
            product_id,
            summary.ratings_average,
            summary.ratings_quantity
        );
        Ok(summary)
    }
}
