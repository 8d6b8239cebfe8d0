use bson::Document;

use crate::errors::AppResult;
use crate::models::{Entity, Review};
use crate::query::{Filter, QueryRequest};
use crate::services::handlers::{ListResponse, ResourceHandler};
use crate::services::ratings::RatingAggregator;

/// Review CRUD that refreshes the subject's rating summary after each
/// committed change.
#[derive(Clone)]
pub struct ReviewService {
    reviews: ResourceHandler<Review>,
    ratings: RatingAggregator,
}

impl ReviewService {
    pub fn new(reviews: ResourceHandler<Review>, ratings: RatingAggregator) -> Self {
        Self { reviews, ratings }
    }

    /// Lists reviews, optionally nested under one product.
    pub async fn list(&self, product: Option<&str>, request: &QueryRequest) -> AppResult<ListResponse> {
        let base = match product {
            Some(product) => Filter::new().eq("product", product),
            None => Filter::new(),
        };
        self.reviews.list(&base, request, Review::SEARCH_FIELD).await
    }

    pub async fn get(&self, id: &str) -> AppResult<Review> {
        self.reviews.get_by_id(id).await
    }

    pub async fn create(&self, review: Review) -> AppResult<Review> {
        let created = self.reviews.create(review).await?;
        self.refresh(&created.product).await;
        Ok(created)
    }

    /// Updates a review; when it moves to another product both products are
    /// refreshed.
    pub async fn update(&self, id: &str, payload: Document) -> AppResult<Review> {
        let previous = if payload.contains_key("product") {
            Some(self.reviews.get_by_id(id).await?.product)
        } else {
            None
        };

        let updated = self.reviews.update_by_id(id, payload).await?;
        self.refresh(&updated.product).await;
        if let Some(previous) = previous.filter(|p| *p != updated.product) {
            self.refresh(&previous).await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let removed = self.reviews.delete_by_id(id).await?;
        self.refresh(&removed.product).await;
        Ok(())
    }

    /// Best effort: a failed recompute never fails the review operation.
    async fn refresh(&self, product: &str) {
        if let Err(err) = self.ratings.recompute(product).await {
            tracing::warn!("rating recompute failed for product {}: {}", product, err);
        }
    }
}
