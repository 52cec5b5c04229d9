//! Closed enumerations used across the order domain.
//!
//! Each enum has a stable upper-case wire/storage form (`as_str` / `parse`)
//! shared by the JSON API, the SQL schema check constraints and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::pricing::Price;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Where an order sits in the preparation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, waiting for a preparer. Initial state.
    Ordered,
    /// Claimed by (or explicitly handed to) a preparer.
    InPreparation,
    /// Ready for pickup. Terminal in the forward direction.
    Ready,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Ordered,
        OrderStatus::InPreparation,
        OrderStatus::Ready,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Ordered => "ORDERED",
            OrderStatus::InPreparation => "IN_PREPARATION",
            OrderStatus::Ready => "READY",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ORDERED" => Ok(OrderStatus::Ordered),
            "IN_PREPARATION" => Ok(OrderStatus::InPreparation),
            "READY" => Ok(OrderStatus::Ready),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            OrderStatus::Ordered => 0,
            OrderStatus::InPreparation => 1,
            OrderStatus::Ready => 2,
        }
    }

    /// `true` if moving from `self` to `next` progresses the pipeline.
    ///
    /// Informational only: explicit status updates are applied regardless.
    pub fn is_forward_to(&self, next: OrderStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Entering this status requires `preparation_time` to be stamped.
    pub fn requires_preparation_time(&self) -> bool {
        !matches!(self, OrderStatus::Ordered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// The fixed menu. Every kind carries a fixed unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "CLASSIC")]
    Classic,
    #[serde(rename = "ALSACE")]
    Alsace,
    #[serde(rename = "NEWYORK")]
    NewYork,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Classic => "CLASSIC",
            ItemKind::Alsace => "ALSACE",
            ItemKind::NewYork => "NEWYORK",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLASSIC" => Ok(ItemKind::Classic),
            "ALSACE" => Ok(ItemKind::Alsace),
            "NEWYORK" => Ok(ItemKind::NewYork),
            _ => Err(ValidationError::UnknownItemKind(s.to_string())),
        }
    }

    /// Fixed unit price for this kind.
    pub const fn unit_price(&self) -> Price {
        match self {
            ItemKind::Classic => Price::from_whole(7),
            ItemKind::Alsace => Price::from_whole(8),
            ItemKind::NewYork => Price::from_whole(8),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// PaymentType
// ---------------------------------------------------------------------------

/// How the customer paid. Descriptive tag only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    Cash,
    Card,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "CASH",
            PaymentType::Card => "CARD",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(PaymentType::Cash),
            "CARD" => Ok(PaymentType::Card),
            _ => Err(ValidationError::UnknownPaymentType(s.to_string())),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
