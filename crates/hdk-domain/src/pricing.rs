//! Fixed-point money and the static menu price table.
//!
//! All amounts use a 1e-6 (micros) fixed-point representation stored as
//! `i64`. 1.00 in the house currency = `Price::from_micros(1_000_000)`.
//! The database stores the raw micros; the JSON API renders a decimal
//! number (e.g. `15.0`).
//!
//! Prices are computed once, at save time, and stored on every item and on
//! the order. Nothing here is ever consulted on read, so historical orders
//! keep the price that applied when they were placed.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::order::Item;
use crate::status::ItemKind;

const MICROS_PER_UNIT: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Price newtype
// ---------------------------------------------------------------------------

/// A monetary amount at 1e-6 scale.
///
/// There is intentionally no `From<i64>`: callers must say whether a raw
/// integer is whole currency units ([`Price::from_whole`]) or micros
/// ([`Price::from_micros`]).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Price(micros)
    }

    #[inline]
    pub const fn from_whole(units: i64) -> Self {
        Price(units * MICROS_PER_UNIT)
    }

    #[inline]
    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Returns `None` on overflow.
    #[inline]
    pub fn checked_add(self, rhs: Price) -> Option<Price> {
        self.0.checked_add(rhs.0).map(Price)
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    /// Nearest micros to a decimal amount.
    pub fn from_f64(amount: f64) -> Self {
        Price((amount * MICROS_PER_UNIT as f64).round() as i64)
    }
}

impl Add for Price {
    type Output = Price;
    #[inline]
    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    #[inline]
    fn add_assign(&mut self, rhs: Price) {
        self.0 += rhs.0;
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        iter.fold(Price::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 / MICROS_PER_UNIT;
        // two decimals; sub-cent micros are truncated for display only
        let cents = (self.0 % MICROS_PER_UNIT).abs() / 10_000;
        if self.0 < 0 && units == 0 {
            write!(f, "-{units}.{cents:02}")
        } else {
            write!(f, "{units}.{cents:02}")
        }
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Price::from_f64)
    }
}

// ---------------------------------------------------------------------------
// PricingCalculator
// ---------------------------------------------------------------------------

/// Deterministic price computation over the static menu.
pub struct PricingCalculator;

impl PricingCalculator {
    /// Fixed unit price of one item of `kind`.
    pub fn price(kind: ItemKind) -> Price {
        kind.unit_price()
    }

    /// Sum of the unit prices of `items`; zero for an empty slice.
    ///
    /// Uses the kind of each item, not any previously stored `price`.
    pub fn order_total(items: &[Item]) -> Result<Price, ValidationError> {
        items.iter().try_fold(Price::ZERO, |acc, item| {
            acc.checked_add(Self::price(item.kind))
                .ok_or(ValidationError::PriceOverflow)
        })
    }

    /// Stamp every item with its unit price and return the order total.
    ///
    /// Either all items are priced or, on overflow, the error is returned
    /// before anything is handed to a store.
    pub fn price_items(items: &mut [Item]) -> Result<Price, ValidationError> {
        let total = Self::order_total(items)?;
        for item in items.iter_mut() {
            item.price = Self::price(item.kind);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Item;

    #[test]
    fn whole_and_micros_agree() {
        assert_eq!(Price::from_whole(7), Price::from_micros(7_000_000));
        assert_eq!(Price::from_whole(7).micros(), 7_000_000);
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(PricingCalculator::order_total(&[]).unwrap(), Price::ZERO);
    }

    #[test]
    fn classic_plus_alsace_is_fifteen() {
        let items = vec![Item::of(ItemKind::Classic), Item::of(ItemKind::Alsace)];
        let total = PricingCalculator::order_total(&items).unwrap();
        assert_eq!(total, Price::from_whole(15));
        assert_eq!(total.as_f64(), 15.0);
    }

    #[test]
    fn price_items_overwrites_stale_item_prices() {
        let mut stale = Item::of(ItemKind::NewYork);
        stale.price = Price::from_whole(99);
        let mut items = vec![stale, Item::of(ItemKind::Classic)];

        let total = PricingCalculator::price_items(&mut items).unwrap();

        assert_eq!(items[0].price, Price::from_whole(8));
        assert_eq!(items[1].price, Price::from_whole(7));
        assert_eq!(total, items.iter().map(|i| i.price).sum());
    }

    #[test]
    fn checked_add_overflow_returns_none() {
        assert_eq!(Price::from_micros(i64::MAX).checked_add(Price::from_micros(1)), None);
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Price::from_micros(7_500_000).to_string(), "7.50");
        assert_eq!(Price::ZERO.to_string(), "0.00");
    }

    #[test]
    fn json_renders_decimal_number() {
        let json = serde_json::to_string(&Price::from_whole(15)).unwrap();
        assert_eq!(json, "15.0");
        let back: Price = serde_json::from_str("8.5").unwrap();
        assert_eq!(back, Price::from_micros(8_500_000));
    }
}
