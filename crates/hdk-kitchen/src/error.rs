use hdk_db::StoreError;
use hdk_domain::{ItemId, OrderId, ValidationError};

/// Errors surfaced by [`crate::OrderService`].
///
/// "No work available" and lookup misses are `Ok(None)`, never errors.
#[derive(Debug, thiserror::Error)]
pub enum KitchenError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl KitchenError {
    /// Stable machine-readable tag, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            KitchenError::NotFound(_) | KitchenError::ItemNotFound(_) => "not_found",
            KitchenError::Validation(_) => "validation",
            KitchenError::Store(_) => "store_unavailable",
        }
    }
}
