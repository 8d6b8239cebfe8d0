//! Cart line-item mutation and total computation.
//!
//! Every mutation ends in [`Cart::recompute_totals`], which also drops any
//! applied discount: a discount only stands until the cart contents change.

use bson::DateTime;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::{AppError, AppResult};
use crate::models::{Cart, CartItem, Coupon, Product};

/// Rounds a money amount to whole cents, halves away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount` reduced by `percent` percent, rounded to cents. `None` on
/// overflow.
pub fn discounted(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    let remaining = Decimal::ONE_HUNDRED.checked_sub(percent)?;
    amount
        .checked_mul(remaining)?
        .checked_div(Decimal::ONE_HUNDRED)
        .map(round_money)
}

impl Cart {
    /// Adds `product` to the cart. An existing line for the same product
    /// (and the same color, when one is given) gains one unit; otherwise a
    /// new line of `quantity` units is appended at the product's current price.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        color: Option<String>,
    ) -> AppResult<&CartItem> {
        if quantity < 1 {
            return Err(AppError::invalid_state(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }

        let existing = self.cart_items.iter().position(|item| {
            item.product == product.id
                && match &color {
                    Some(color) => item.color.as_deref() == Some(color.as_str()),
                    None => true,
                }
        });

        let index = match existing {
            Some(index) => {
                self.cart_items[index].quantity += 1;
                index
            }
            None => {
                self.cart_items
                    .push(CartItem::new(&product.id, quantity, color, product.price));
                self.cart_items.len() - 1
            }
        };

        self.recompute_totals();
        Ok(&self.cart_items[index])
    }

    pub fn set_item_quantity(&mut self, item_id: &str, quantity: i64) -> AppResult<()> {
        if quantity < 1 {
            return Err(AppError::invalid_state(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }

        let item = self
            .cart_items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| AppError::not_found(format!("there is no item for this id {item_id}")))?;
        item.quantity = quantity;

        self.recompute_totals();
        Ok(())
    }

    /// Returns whether an item was removed. Totals are recomputed either way.
    pub fn remove_item(&mut self, item_id: &str) -> bool {
        let before = self.cart_items.len();
        self.cart_items.retain(|item| item.id != item_id);
        self.recompute_totals();
        self.cart_items.len() != before
    }

    pub fn recompute_totals(&mut self) -> Decimal {
        self.total_cart_price = self
            .cart_items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();
        self.total_price_after_discount = None;
        self.total_cart_price
    }

    /// Applies `coupon` to the current total. Fails without touching the
    /// cart when the coupon has expired.
    pub fn apply_coupon(&mut self, coupon: &Coupon, now: DateTime) -> AppResult<Decimal> {
        if !coupon.is_active(now) {
            return Err(AppError::invalid_state(format!(
                "Coupon {} is invalid or expired",
                coupon.name
            )));
        }

        let total = discounted(self.total_cart_price, coupon.discount)
            .unwrap_or(self.total_cart_price);
        self.total_price_after_discount = Some(total);
        Ok(total)
    }

    /// Price an order is charged for: the discounted total when one stands.
    pub fn payable_total(&self) -> Decimal {
        self.total_price_after_discount
            .unwrap_or(self.total_cart_price)
    }

    pub fn clear(&mut self) {
        self.cart_items.clear();
        self.total_cart_price = Decimal::ZERO;
        self.total_price_after_discount = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn in_days(days: i64) -> DateTime {
        DateTime::from_chrono(Utc::now() + Duration::days(days))
    }

    fn money(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn priced(price: &str) -> Product {
        Product::new(format!("item {price}"), money(price), 10, "c1")
    }

    fn assert_invariant(cart: &Cart) {
        let expected: Decimal = cart
            .cart_items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();
        assert_eq!(cart.total_cart_price, expected);
    }

    #[test]
    fn scenario_totals_and_coupon() {
        let (a, b) = (priced("10"), priced("5"));
        let mut cart = Cart::new("u1");
        cart.add_item(&a, 1, None).unwrap();
        cart.add_item(&a, 1, None).unwrap();
        cart.add_item(&b, 1, None).unwrap();
        assert_eq!(cart.total_cart_price, money("25"));

        let coupon = Coupon::new("TEN", in_days(1), money("10"));
        let total = cart.apply_coupon(&coupon, DateTime::now()).unwrap();
        assert_eq!(total, money("22.5"));
        assert_eq!(cart.total_price_after_discount, Some(money("22.50")));
        assert_eq!(cart.payable_total(), money("22.5"));
    }

    #[test]
    fn existing_line_gains_one_unit_regardless_of_quantity() {
        let a = priced("10");
        let mut cart = Cart::new("u1");
        cart.add_item(&a, 2, None).unwrap();

        let line = cart.add_item(&a, 3, None).unwrap();

        assert_eq!(line.quantity, 3);
        assert_eq!(cart.cart_items.len(), 1);
        assert_eq!(cart.total_cart_price, money("30"));
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let mut cart = Cart::new("u1");
        for quantity in [0, -2] {
            assert!(matches!(
                cart.add_item(&priced("1"), quantity, None),
                Err(AppError::InvalidState(_))
            ));
        }
        assert!(cart.cart_items.is_empty());
        assert_eq!(cart.total_cart_price, Decimal::ZERO);
    }

    #[test]
    fn same_product_different_color_gets_own_line() {
        let shirt = priced("12");
        let mut cart = Cart::new("u1");
        cart.add_item(&shirt, 1, Some("red".into())).unwrap();
        cart.add_item(&shirt, 1, Some("blue".into())).unwrap();
        cart.add_item(&shirt, 1, Some("red".into())).unwrap();

        assert_eq!(cart.cart_items.len(), 2);
        assert_eq!(cart.cart_items[0].quantity, 2);
        assert_invariant(&cart);
    }

    #[test]
    fn unit_price_is_frozen_at_first_add() {
        let mut lamp = priced("8");
        let mut cart = Cart::new("u1");
        cart.add_item(&lamp, 1, None).unwrap();
        lamp.price = money("100");
        cart.add_item(&lamp, 1, None).unwrap();

        assert_eq!(cart.cart_items[0].price, money("8"));
        assert_eq!(cart.total_cart_price, money("16"));
    }

    #[test]
    fn totals_stay_on_whole_cents() {
        let mut cart = Cart::new("u1");
        cart.add_item(&priced("0.1"), 1, None).unwrap();
        cart.add_item(&priced("0.2"), 1, None).unwrap();

        assert_eq!(cart.total_cart_price, money("0.3"));
    }

    #[test]
    fn every_mutation_clears_discount_and_keeps_invariant() {
        let coupon = Coupon::new("HALF", in_days(1), money("50"));
        let (a, b) = (priced("3"), priced("7.5"));
        let mut cart = Cart::new("u1");
        let first = cart.add_item(&a, 1, None).unwrap().id.clone();

        cart.apply_coupon(&coupon, DateTime::now()).unwrap();
        cart.add_item(&b, 2, None).unwrap();
        assert_eq!(cart.total_price_after_discount, None);
        assert_invariant(&cart);

        cart.apply_coupon(&coupon, DateTime::now()).unwrap();
        cart.set_item_quantity(&first, 4).unwrap();
        assert_eq!(cart.total_price_after_discount, None);
        assert_invariant(&cart);

        cart.apply_coupon(&coupon, DateTime::now()).unwrap();
        assert!(cart.remove_item(&first));
        assert_eq!(cart.total_price_after_discount, None);
        assert_eq!(cart.total_cart_price, money("15"));
    }

    #[test]
    fn set_quantity_rejects_unknown_item_and_zero() {
        let mut cart = Cart::new("u1");
        let id = cart.add_item(&priced("2"), 1, None).unwrap().id.clone();

        assert!(cart.set_item_quantity("missing", 3).unwrap_err().is_not_found());
        assert!(matches!(
            cart.set_item_quantity(&id, 0),
            Err(AppError::InvalidState(_))
        ));
        assert_eq!(cart.cart_items[0].quantity, 1);
    }

    #[test]
    fn removing_absent_item_is_idempotent() {
        let mut cart = Cart::new("u1");
        cart.add_item(&priced("4"), 1, None).unwrap();
        assert!(!cart.remove_item("missing"));
        assert_eq!(cart.total_cart_price, money("4"));
    }

    #[test]
    fn expired_coupon_leaves_totals_unchanged() {
        let mut cart = Cart::new("u1");
        cart.add_item(&priced("40"), 1, None).unwrap();
        let expired = Coupon::new("OLD", in_days(-1), money("25"));

        let err = cart.apply_coupon(&expired, DateTime::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(cart.total_cart_price, money("40"));
        assert_eq!(cart.total_price_after_discount, None);
    }

    #[test]
    fn overflowing_discount_falls_back_to_total() {
        let mut cart = Cart::new("u1");
        cart.add_item(&priced("10"), 1, None).unwrap();
        let broken = Coupon::new("HUGE", in_days(1), Decimal::MIN);

        assert_eq!(cart.apply_coupon(&broken, DateTime::now()).unwrap(), money("10"));
    }

    #[test]
    fn rounds_half_cents_away_from_zero() {
        assert_eq!(round_money(money("1.005")), money("1.01"));
        assert_eq!(round_money(money("22.499")), money("22.50"));
        assert_eq!(round_money(money("-1.005")), money("-1.01"));
        assert_eq!(discounted(money("0.15"), money("50")), Some(money("0.08")));
    }
}
