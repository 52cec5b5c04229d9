use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hdk_domain::lifecycle::StatusChange;
use hdk_domain::{
    Item, ItemId, LifecycleError, Order, OrderFilter, OrderId, OrderStatus, ValidationError,
};

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failure of the persistence boundary. Propagated to callers as-is; the
/// store never retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connectivity, constraint violation or any other driver failure.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A persisted row could not be decoded into the domain model.
    #[error("corrupt order row: {0}")]
    Corrupt(String),

    /// Update of an order id that is not in the store.
    #[error("order {0} does not exist")]
    UnknownOrder(OrderId),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The aggregate could not be repriced before the write.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ---------------------------------------------------------------------------
// OrderStore
// ---------------------------------------------------------------------------

/// Transactional persistence of the `Order` aggregate.
///
/// Every method is atomic with respect to the aggregate: an order and its
/// items are written, read and deleted together. Listing methods return
/// orders in [`hdk_domain::query::listing_cmp`] order.
///
/// Implementations must be `Send + Sync`; the service layer holds them as
/// `Arc<dyn OrderStore>` and calls them from many tasks at once.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new (`id == None`) or existing aggregate, replacing its
    /// items. Returns the order with store-assigned ids filled in.
    ///
    /// Prices must already be computed; the store writes them verbatim.
    async fn save(&self, order: Order) -> Result<Order, StoreError>;

    /// Point lookup. Absence is `Ok(None)`.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Point lookup of a single item.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Orders matching `filter`, in listing order.
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Claim the oldest `Ordered` order not currently locked by another
    /// in-flight claim, transition it to `InPreparation` for `preparer` and
    /// return it. Never waits behind another claim.
    ///
    /// `Ok(None)` means no work is available and nothing was changed.
    async fn claim_next_ordered(
        &self,
        preparer: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError>;

    /// Apply an explicit status update. `Ok(None)` when `id` is absent.
    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<(Order, StatusChange)>, StoreError>;

    /// Delete the order and all of its items. `Ok(false)` when absent.
    async fn delete(&self, id: OrderId) -> Result<bool, StoreError>;

    /// Human-readable backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        self.list(&OrderFilter::all()).await
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        self.list(&OrderFilter::by_status(status)).await
    }
}
