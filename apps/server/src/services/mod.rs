pub mod account;
pub mod cart;
pub mod handlers;
pub mod orders;
pub mod pricing;
pub mod ratings;
pub mod reviews;

pub use account::AccountService;
pub use cart::CartService;
pub use handlers::{ListResponse, ResourceHandler};
pub use orders::OrderService;
pub use pricing::{discounted, round_money};
pub use ratings::RatingAggregator;
pub use reviews::ReviewService;
