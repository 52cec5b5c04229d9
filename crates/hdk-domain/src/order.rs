//! The `Order` aggregate root and its owned `Item` children.
//!
//! JSON field names follow the public kitchen API (`orderStatus`,
//! `hotdogs`, `type`, ...), which is why a few fields carry explicit serde
//! renames.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::pricing::Price;
use crate::status::{ItemKind, OrderStatus, PaymentType};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Store-assigned order identifier. Immutable once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

/// Store-assigned item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// Independent topping flags. No mutual exclusion between them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Toppings {
    pub with_ketchup: bool,
    pub with_mustard: bool,
    pub with_mayo: bool,
    pub with_onions: bool,
    #[serde(rename = "isVege")]
    pub vege: bool,
}

/// One line of an order. Owned exclusively by its parent [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Option<ItemId>,
    /// Back-reference to the owning order. A plain identifier, never an
    /// owning pointer; not part of the JSON form.
    #[serde(skip)]
    pub order_id: Option<OrderId>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(flatten)]
    pub toppings: Toppings,
    pub comment: Option<String>,
    /// Unit price stamped at save time.
    pub price: Price,
}

impl Item {
    /// Unsaved item of `kind` with no toppings. Price is stamped on save.
    pub fn of(kind: ItemKind) -> Self {
        Self {
            id: None,
            order_id: None,
            kind,
            toppings: Toppings::default(),
            comment: None,
            price: Price::ZERO,
        }
    }
}

impl From<NewItem> for Item {
    fn from(n: NewItem) -> Self {
        Self {
            id: None,
            order_id: None,
            kind: n.kind,
            toppings: n.toppings,
            comment: n.comment.filter(|c| !c.trim().is_empty()),
            price: Price::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// Aggregate root. Owns its items; deleting the order deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Option<OrderId>,
    #[serde(rename = "orderStatus")]
    pub status: OrderStatus,
    pub ordered_by: String,
    pub prepared_by: Option<String>,
    /// Set once at creation.
    pub order_time: DateTime<Utc>,
    /// Set once, on first entry into `InPreparation` (or later).
    pub preparation_time: Option<DateTime<Utc>>,
    pub customer_name: Option<String>,
    pub payment_type: Option<PaymentType>,
    /// Sum of `items[*].price` as of the last save.
    pub total_price: Price,
    #[serde(rename = "hotdogs")]
    pub items: Vec<Item>,
}

impl Order {
    /// Whole minutes between `order_time` and `preparation_time`, rounded
    /// half-up. `None` until the order has been picked up for preparation.
    pub fn preparation_minutes(&self) -> Option<i64> {
        let started = self.preparation_time?;
        let secs = started.signed_duration_since(self.order_time).num_seconds();
        // round(secs / 60) with halves going toward +inf, in integers
        Some((secs * 2 + 60).div_euclid(120))
    }

    /// Point every item's back-reference at this order's id.
    pub fn adopt_items(&mut self) {
        let id = self.id;
        for item in &mut self.items {
            item.order_id = id;
        }
    }
}

// ---------------------------------------------------------------------------
// Creation input
// ---------------------------------------------------------------------------

/// Caller-supplied fields of a new item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(flatten)]
    pub toppings: Toppings,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewItem {
    pub fn of(kind: ItemKind) -> Self {
        Self {
            kind,
            toppings: Toppings::default(),
            comment: None,
        }
    }
}

/// Caller-supplied fields of a new order.
///
/// `status` and `order_time` are normally absent and defaulted by
/// [`crate::lifecycle::place`]. A missing `hotdogs` collection is treated as
/// an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(default, rename = "orderStatus")]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub ordered_by: String,
    #[serde(default)]
    pub order_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
    #[serde(default, rename = "hotdogs")]
    pub items: Option<Vec<NewItem>>,
}

impl NewOrder {
    pub fn new(ordered_by: impl Into<String>) -> Self {
        Self {
            ordered_by: ordered_by.into(),
            ..Self::default()
        }
    }

    pub fn with_item(mut self, item: NewItem) -> Self {
        self.items.get_or_insert_with(Vec::new).push(item);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ordered_by.trim().is_empty() {
            return Err(ValidationError::MissingOrderedBy);
        }
        Ok(())
    }
}
