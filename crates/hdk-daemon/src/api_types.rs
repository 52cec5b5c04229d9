//! Request and response types for the hdk-daemon HTTP endpoints.
//!
//! Field names are camelCase to match the kitchen front-end. No business
//! logic lives here.

use hdk_domain::Order;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    /// "postgres" | "memory"
    pub store: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "not_found" | "validation" | "store_unavailable"
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// An order plus fields derived on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    /// Whole minutes from order to start of preparation; null until then.
    pub preparation_minutes: Option<i64>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            preparation_minutes: order.preparation_minutes(),
            order,
        }
    }
}

/// `GET /orders/filtered` query. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    /// `DDMMYYYY`
    pub order_date: Option<String>,
    pub status: Option<String>,
    pub ordered_by: Option<String>,
    pub start_index: Option<usize>,
    pub page_length: Option<usize>,
}

/// `GET /orders/next-to-prepare?user=`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextToPrepareQuery {
    pub user: Option<String>,
}

/// `POST /orders/{id}/status?status=`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}
