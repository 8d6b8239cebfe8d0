use crate::{
    errors::ApiError,
    models::{
        Address, Brand, Cart, CartItem, Category, Coupon, Order, PaymentMethod, Product,
        RatingSummary, Review, Role, SubCategory, User,
    },
    query::PaginationResult,
    services::ListResponse,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(schemas(
        Category,
        SubCategory,
        Brand,
        Product,
        Review,
        RatingSummary,
        Coupon,
        Cart,
        CartItem,
        Order,
        PaymentMethod,
        User,
        Role,
        Address,
        ListResponse,
        PaginationResult,
        ApiError
    )),
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = "Catalog, cart and order resources.\n\n## Listing\n\nEvery list accepts `page`, `limit`, `sort` (comma list, `-` for descending), `fields` (comma list), `keyword`, plain `field=value` filters, `field=a,b` any-of filters and `field[gte|gt|lte|lt]=value` comparisons."
    )
)]
pub struct ApiDoc;
