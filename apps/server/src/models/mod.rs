macro_rules! entity {
    (
        $ty:ty, $collection:literal
        $(, search = $search:literal)?
        $(, numeric = [$($number:literal),* $(,)?])?
        $(, flags = [$($flag:literal),* $(,)?])?
    ) => {
        impl $crate::models::Entity for $ty {
            const COLLECTION: &'static str = $collection;
            $(const SEARCH_FIELD: &'static str = $search;)?
            $(const NUMERIC_FIELDS: &'static [&'static str] = &[$($number),*];)?
            $(const FLAG_FIELDS: &'static [&'static str] = &[$($flag),*];)?

            fn id(&self) -> &str {
                &self.id
            }

            fn touch(&mut self, now: bson::DateTime) {
                self.updated_at = now;
            }
        }
    };
}

mod account;
mod cart;
mod catalog;
mod order;
mod review;

pub use account::{Address, Role, User};
pub use cart::{Cart, CartItem, Coupon};
pub use catalog::{Brand, Category, Product, SubCategory};
pub use order::{Order, PaymentMethod};
pub use review::{RatingSummary, Review};

use bson::DateTime;
use serde::{de::DeserializeOwned, Serialize};

/// A document type stored in its own collection, addressed by a string `id`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;
    /// Field matched by the `keyword` query parameter.
    const SEARCH_FIELD: &'static str = "name";
    /// Stored fields holding numbers (dotted paths for nested arrays). Query
    /// values for every other field stay strings.
    const NUMERIC_FIELDS: &'static [&'static str] = &[];
    const FLAG_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str;

    fn touch(&mut self, now: DateTime);

    fn is_numeric(field: &str) -> bool {
        Self::NUMERIC_FIELDS.iter().any(|known| *known == field)
    }

    fn is_flag(field: &str) -> bool {
        Self::FLAG_FIELDS.iter().any(|known| *known == field)
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
