use std::sync::Arc;

use bson::DateTime;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use storefront::config::PricingConfig;
use storefront::models::{Address, Cart, Coupon, Order, Product, Review};
use storefront::query::QueryRequest;
use storefront::services::{
    CartService, OrderService, RatingAggregator, ResourceHandler, ReviewService,
};
use storefront::store::{DocumentStore, MemoryStore};

struct Storefront {
    products: Arc<MemoryStore<Product>>,
    coupons: Arc<MemoryStore<Coupon>>,
    carts: CartService,
    orders: OrderService,
    reviews: ReviewService,
}

fn storefront() -> Storefront {
    let products = Arc::new(MemoryStore::<Product>::new());
    let coupons = Arc::new(MemoryStore::<Coupon>::new());
    let carts = Arc::new(MemoryStore::<Cart>::new());
    let reviews = Arc::new(MemoryStore::<Review>::new());

    Storefront {
        carts: CartService::new(carts.clone(), products.clone(), coupons.clone()),
        orders: OrderService::new(
            ResourceHandler::new(Arc::new(MemoryStore::<Order>::new())),
            carts,
            products.clone(),
            PricingConfig::default(),
        ),
        reviews: ReviewService::new(
            ResourceHandler::new(reviews.clone()),
            RatingAggregator::new(reviews, products.clone()),
        ),
        products,
        coupons,
    }
}

#[tokio::test]
async fn cart_to_order_checkout() {
    let shop = storefront();
    let a = shop
        .products
        .create(&Product::new("Product A", Decimal::from(10), 8, "c1"))
        .await
        .unwrap();
    let b = shop
        .products
        .create(&Product::new("Product B", Decimal::from(5), 8, "c1"))
        .await
        .unwrap();
    shop.coupons
        .create(&Coupon::new(
            "TEN",
            DateTime::from_chrono(Utc::now() + Duration::days(7)),
            Decimal::from(10),
        ))
        .await
        .unwrap();

    shop.carts.add_product("buyer", &a.id, None).await.unwrap();
    shop.carts.add_product("buyer", &a.id, None).await.unwrap();
    let cart = shop.carts.add_product("buyer", &b.id, None).await.unwrap();
    assert_eq!(cart.total_cart_price, Decimal::from(25));

    let cart = shop.carts.apply_coupon("buyer", "TEN").await.unwrap();
    assert_eq!(cart.total_price_after_discount, Some(Decimal::new(225, 1)));

    let address = Address {
        alias: "home".into(),
        city: "Nazareth".into(),
        ..Address::default()
    };
    let order = shop
        .orders
        .create_order(&cart.id, Some(address.clone()), Decimal::from(2), Decimal::from(3))
        .await
        .unwrap();

    assert_eq!(order.total_order_price, Decimal::new(275, 1));
    assert_eq!(order.user, "buyer");
    assert_eq!(order.shipping_address, Some(address));

    let a = shop.products.find_by_id(&a.id).await.unwrap().unwrap();
    let b = shop.products.find_by_id(&b.id).await.unwrap().unwrap();
    assert_eq!((a.quantity, a.sold), (6, 2));
    assert_eq!((b.quantity, b.sold), (7, 1));
    assert!(shop.carts.get_cart("buyer").await.unwrap().is_none());

    let mine = shop
        .orders
        .list(Some("buyer"), &QueryRequest::new())
        .await
        .unwrap();
    assert_eq!(mine.results, 1);
}

#[tokio::test]
async fn review_lifecycle_drives_product_rating() {
    let shop = storefront();
    let x = shop
        .products
        .create(&Product::new("Product X", Decimal::from(12), 1, "c1"))
        .await
        .unwrap();

    let mut created = Vec::new();
    for (user, rating) in [("u1", 3.0), ("u2", 4.0), ("u3", 5.0)] {
        created.push(
            shop.reviews
                .create(Review::new(user, &x.id, rating))
                .await
                .unwrap(),
        );
    }
    let stored = shop.products.find_by_id(&x.id).await.unwrap().unwrap();
    assert_eq!((stored.ratings_average, stored.ratings_quantity), (4.0, 3));

    let five = created
        .iter()
        .find(|review| review.ratings == 5.0)
        .unwrap();
    shop.reviews.delete(&five.id).await.unwrap();

    let stored = shop.products.find_by_id(&x.id).await.unwrap().unwrap();
    assert_eq!((stored.ratings_average, stored.ratings_quantity), (3.5, 2));

    let listed = shop
        .reviews
        .list(Some(x.id.as_str()), &QueryRequest::new().with("ratings[gte]", "4"))
        .await
        .unwrap();
    assert_eq!(listed.results, 1);
}
