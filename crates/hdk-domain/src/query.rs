//! Listing filters, pagination and the canonical orderings.
//!
//! Every store must produce the same sequence for the same data, so the two
//! orderings used by the system live here as plain comparators:
//!
//! - [`listing_cmp`]: `order_time DESC, preparation_time DESC NULLS FIRST, id DESC`
//! - [`claim_queue_cmp`]: `order_time ASC, id ASC`
//!
//! The Postgres store encodes the same orderings in SQL.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::ValidationError;
use crate::order::Order;
use crate::status::OrderStatus;

/// Wire format of the order-date filter (e.g. `03122024`).
pub const ORDER_DATE_FORMAT: &str = "%d%m%Y";

/// Optional, independently combinable listing filters. The default filter
/// matches every order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Calendar day of `order_time`, evaluated in the kitchen's time zone.
    pub date: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
    pub ordered_by: Option<String>,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn by_requester(ordered_by: impl Into<String>) -> Self {
        Self {
            ordered_by: Some(ordered_by.into()),
            ..Self::default()
        }
    }

    /// In-process evaluation of the filter. `tz` decides which calendar day
    /// an `order_time` instant falls on.
    pub fn matches(&self, order: &Order, tz: Tz) -> bool {
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        if let Some(who) = &self.ordered_by {
            if &order.ordered_by != who {
                return false;
            }
        }
        if let Some(date) = self.date {
            if local_date(order.order_time, tz) != date {
                return false;
            }
        }
        true
    }
}

/// Calendar date of `ts` in `tz`.
pub fn local_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// Parse a `DDMMYYYY` order date.
pub fn parse_order_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, ORDER_DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// A window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub start_index: usize,
    pub page_length: usize,
}

impl Page {
    pub const DEFAULT_LENGTH: usize = 10;

    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.start_index)
            .take(self.page_length)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            start_index: 0,
            page_length: Self::DEFAULT_LENGTH,
        }
    }
}

/// `order_time DESC, preparation_time DESC NULLS FIRST, id DESC`.
pub fn listing_cmp(a: &Order, b: &Order) -> Ordering {
    b.order_time
        .cmp(&a.order_time)
        .then_with(|| desc_nulls_first(a.preparation_time, b.preparation_time))
        .then_with(|| b.id.cmp(&a.id))
}

/// `order_time ASC, id ASC`: the order in which pending work is handed out.
pub fn claim_queue_cmp(a: &Order, b: &Order) -> Ordering {
    a.order_time
        .cmp(&b.order_time)
        .then_with(|| a.id.cmp(&b.id))
}

fn desc_nulls_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderId;
    use crate::pricing::Price;
    use chrono::{Duration, TimeZone};

    fn order(id: i64, at: DateTime<Utc>, prep: Option<DateTime<Utc>>) -> Order {
        Order {
            id: Some(OrderId(id)),
            status: OrderStatus::Ordered,
            ordered_by: "till-1".to_string(),
            prepared_by: None,
            order_time: at,
            preparation_time: prep,
            customer_name: None,
            payment_type: None,
            total_price: Price::ZERO,
            items: Vec::new(),
        }
    }

    #[test]
    fn listing_is_newest_first_with_unprepared_ahead() {
        let t = Utc.with_ymd_and_hms(2024, 12, 3, 12, 0, 0).unwrap();
        let mut rows = vec![
            order(1, t - Duration::minutes(10), None),
            order(2, t, Some(t + Duration::minutes(1))),
            order(3, t, None),
            order(4, t, Some(t + Duration::minutes(5))),
        ];
        rows.sort_by(listing_cmp);
        let ids: Vec<i64> = rows.iter().map(|o| o.id.unwrap().0).collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }

    #[test]
    fn claim_queue_is_oldest_first_ties_by_id() {
        let t = Utc.with_ymd_and_hms(2024, 12, 3, 12, 0, 0).unwrap();
        let mut rows = vec![
            order(7, t, None),
            order(5, t, None),
            order(9, t - Duration::seconds(1), None),
        ];
        rows.sort_by(claim_queue_cmp);
        let ids: Vec<i64> = rows.iter().map(|o| o.id.unwrap().0).collect();
        assert_eq!(ids, vec![9, 5, 7]);
    }

    #[test]
    fn date_filter_uses_kitchen_time_zone() {
        // 23:30 UTC on Dec 2 is already Dec 3 in Paris.
        let at = Utc.with_ymd_and_hms(2024, 12, 2, 23, 30, 0).unwrap();
        let o = order(1, at, None);
        let dec3 = NaiveDate::from_ymd_opt(2024, 12, 3).unwrap();
        let f = OrderFilter {
            date: Some(dec3),
            ..OrderFilter::default()
        };
        assert!(f.matches(&o, chrono_tz::Europe::Paris));
        assert!(!f.matches(&o, chrono_tz::UTC));
    }

    #[test]
    fn filters_combine() {
        let at = Utc.with_ymd_and_hms(2024, 12, 3, 9, 0, 0).unwrap();
        let o = order(1, at, None);
        let day = NaiveDate::from_ymd_opt(2024, 12, 3).unwrap();
        let hit = OrderFilter {
            date: Some(day),
            status: Some(OrderStatus::Ordered),
            ordered_by: None,
        };
        let miss = OrderFilter {
            date: Some(day),
            status: Some(OrderStatus::Ready),
            ordered_by: None,
        };
        assert!(hit.matches(&o, chrono_tz::UTC));
        assert!(!miss.matches(&o, chrono_tz::UTC));
        assert!(OrderFilter::all().matches(&o, chrono_tz::UTC));
        assert!(!OrderFilter::by_requester("till-2").matches(&o, chrono_tz::UTC));
    }

    #[test]
    fn order_date_parses_ddmmyyyy_only() {
        assert_eq!(
            parse_order_date("03122024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 3).unwrap()
        );
        assert!(parse_order_date("2024-12-03").is_err());
        assert!(parse_order_date("32122024").is_err());
        assert!(parse_order_date("3122024").is_err());
    }

    #[test]
    fn page_slices_window() {
        let rows: Vec<u32> = (0..25).collect();
        let p = Page {
            start_index: 20,
            page_length: 10,
        };
        assert_eq!(p.apply(rows), vec![20, 21, 22, 23, 24]);
    }
}
