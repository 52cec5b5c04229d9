//! Order status state machine.
//!
//! # State diagram
//!
//! ```text
//!    place()          claim() / set InPreparation       set Ready
//!   ────────►  Ordered ─────────────────────────► InPreparation ──────────► Ready
//!                 ▲                                                           │
//!                 └────────────── explicit status update (any → any) ─────────┘
//! ```
//!
//! Two paths move an order:
//!
//! 1. **Claim** ([`claim`]): only from `Ordered`. Stamps `prepared_by` and
//!    `preparation_time`. Stores call this inside the same transaction that
//!    locked the row.
//! 2. **Explicit status update** ([`apply_status`]): permissive. Any target
//!    status is applied, including backward moves such as `Ready → Ordered`
//!    (the preparation screen uses this to hand an order back to the queue).
//!    The only side effect is the set-once stamping of `preparation_time`.
//!
//! `preparation_time` is stamped when the order first enters
//! `InPreparation` or `Ready` and is never overwritten afterwards.

use chrono::{DateTime, Utc};

use crate::error::{LifecycleError, ValidationError};
use crate::order::{Item, NewOrder, Order};
use crate::pricing::PricingCalculator;
use crate::status::OrderStatus;

/// Result of an explicit status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl StatusChange {
    pub fn is_forward(&self) -> bool {
        self.from.is_forward_to(self.to)
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Build a new, priced, unsaved order from caller input.
///
/// Defaults `status` to `Ordered` and `order_time` to `now` when absent. An
/// absent item collection becomes an empty one with a zero total.
pub fn place(new: NewOrder, now: DateTime<Utc>) -> Result<Order, ValidationError> {
    new.validate()?;

    let status = new.status.unwrap_or(OrderStatus::Ordered);
    let mut items: Vec<Item> = new
        .items
        .unwrap_or_default()
        .into_iter()
        .map(Item::from)
        .collect();
    let total_price = PricingCalculator::price_items(&mut items)?;

    Ok(Order {
        id: None,
        status,
        ordered_by: new.ordered_by.trim().to_string(),
        prepared_by: None,
        order_time: new.order_time.unwrap_or(now),
        preparation_time: status.requires_preparation_time().then_some(now),
        customer_name: new.customer_name,
        payment_type: new.payment_type,
        total_price,
        items,
    })
}

/// Recompute every item price and the order total from the price table.
///
/// Called on every save so `total_price` always equals the item sum.
pub fn reprice(order: &mut Order) -> Result<(), ValidationError> {
    order.total_price = PricingCalculator::price_items(&mut order.items)?;
    Ok(())
}

/// Hand an `Ordered` order to `preparer`.
///
/// # Errors
/// [`LifecycleError::NotClaimable`] if the order is not `Ordered`. The order
/// is left untouched in that case.
pub fn claim(order: &mut Order, preparer: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
    if order.status != OrderStatus::Ordered {
        return Err(LifecycleError::NotClaimable { from: order.status });
    }
    order.status = OrderStatus::InPreparation;
    order.prepared_by = Some(preparer.to_string());
    stamp_preparation_time(order, now);
    Ok(())
}

/// Apply an explicit status update. Never refuses.
pub fn apply_status(order: &mut Order, to: OrderStatus, now: DateTime<Utc>) -> StatusChange {
    let from = order.status;
    order.status = to;
    if to.requires_preparation_time() {
        stamp_preparation_time(order, now);
    }
    StatusChange { from, to }
}

fn stamp_preparation_time(order: &mut Order, now: DateTime<Utc>) {
    if order.preparation_time.is_none() {
        order.preparation_time = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::NewItem;
    use crate::pricing::Price;
    use crate::status::ItemKind;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 3, 11, 45, 0).unwrap()
    }

    fn placed() -> Order {
        let new = NewOrder::new("till-1")
            .with_item(NewItem::of(ItemKind::Classic))
            .with_item(NewItem::of(ItemKind::Alsace));
        place(new, t0()).unwrap()
    }

    #[test]
    fn place_defaults_status_time_and_prices() {
        let o = placed();
        assert_eq!(o.status, OrderStatus::Ordered);
        assert_eq!(o.order_time, t0());
        assert_eq!(o.preparation_time, None);
        assert_eq!(o.prepared_by, None);
        assert_eq!(o.total_price, Price::from_whole(15));
        assert_eq!(o.items[0].price, Price::from_whole(7));
        assert_eq!(o.items[1].price, Price::from_whole(8));
    }

    #[test]
    fn place_keeps_caller_order_time() {
        let earlier = t0() - Duration::hours(2);
        let new = NewOrder {
            order_time: Some(earlier),
            ..NewOrder::new("till-1")
        };
        assert_eq!(place(new, t0()).unwrap().order_time, earlier);
    }

    #[test]
    fn place_without_items_totals_zero() {
        let o = place(NewOrder::new("till-1"), t0()).unwrap();
        assert!(o.items.is_empty());
        assert_eq!(o.total_price, Price::ZERO);
    }

    #[test]
    fn place_in_later_status_stamps_preparation_time() {
        let new = NewOrder {
            status: Some(OrderStatus::Ready),
            ..NewOrder::new("till-1")
        };
        let o = place(new, t0()).unwrap();
        assert_eq!(o.preparation_time, Some(t0()));
    }

    #[test]
    fn place_rejects_blank_requester() {
        assert_eq!(
            place(NewOrder::new(""), t0()),
            Err(ValidationError::MissingOrderedBy)
        );
    }

    #[test]
    fn claim_stamps_preparer_and_time() {
        let mut o = placed();
        let at = t0() + Duration::minutes(4);
        claim(&mut o, "chef-mike", at).unwrap();
        assert_eq!(o.status, OrderStatus::InPreparation);
        assert_eq!(o.prepared_by.as_deref(), Some("chef-mike"));
        assert_eq!(o.preparation_time, Some(at));
        assert_eq!(o.preparation_minutes(), Some(4));
    }

    #[test]
    fn claim_refuses_non_ordered_and_leaves_order_untouched() {
        let mut o = placed();
        apply_status(&mut o, OrderStatus::Ready, t0());
        let before = o.clone();
        let err = claim(&mut o, "chef-mike", t0() + Duration::minutes(1)).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::NotClaimable {
                from: OrderStatus::Ready
            }
        );
        assert_eq!(o, before);
    }

    #[test]
    fn preparation_time_is_set_once() {
        let mut o = placed();
        let first = t0() + Duration::minutes(2);
        apply_status(&mut o, OrderStatus::InPreparation, first);
        apply_status(&mut o, OrderStatus::Ready, first + Duration::minutes(6));
        assert_eq!(o.preparation_time, Some(first));
    }

    #[test]
    fn ready_without_preparation_stamps_time() {
        let mut o = placed();
        let at = t0() + Duration::minutes(3);
        let change = apply_status(&mut o, OrderStatus::Ready, at);
        assert!(change.is_forward());
        assert_eq!(o.preparation_time, Some(at));
    }

    #[test]
    fn backward_update_is_applied_and_reported() {
        let mut o = placed();
        apply_status(&mut o, OrderStatus::Ready, t0());
        let change = apply_status(&mut o, OrderStatus::Ordered, t0() + Duration::minutes(1));
        assert_eq!(o.status, OrderStatus::Ordered);
        assert!(!change.is_forward());
        assert!(!change.is_noop());
        // the stamp survives a move back to the queue
        assert_eq!(o.preparation_time, Some(t0()));
    }

    #[test]
    fn reprice_restores_total_invariant() {
        let mut o = placed();
        o.items.push(Item::of(ItemKind::NewYork));
        reprice(&mut o).unwrap();
        let sum: Price = o.items.iter().map(|i| i.price).sum();
        assert_eq!(o.total_price, sum);
        assert_eq!(o.total_price, Price::from_whole(23));
    }
}
