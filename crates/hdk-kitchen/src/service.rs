use std::sync::Arc;

use chrono::{DateTime, Utc};
use hdk_db::OrderStore;
use hdk_domain::lifecycle;
use hdk_domain::{Item, ItemId, NewOrder, Order, OrderFilter, OrderId, OrderStatus, Page};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::claim::ClaimEngine;
use crate::error::KitchenError;
use crate::events::OrderEvent;

/// Source of "now" for every timestamp the service stamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const EVENT_CAPACITY: usize = 256;

/// Cloneable handle over an [`OrderStore`]; clones share the store and the
/// event channel.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    claims: ClaimEngine,
    events: broadcast::Sender<OrderEvent>,
    clock: Clock,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            claims: ClaimEngine::new(Arc::clone(&store)),
            store,
            events,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Receive every [`OrderEvent`] published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn publish(&self, event: OrderEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Validate, default, price and persist a new order.
    ///
    /// Every item is priced before the write; a validation failure leaves
    /// the store untouched.
    pub async fn create_order(&self, new: NewOrder) -> Result<Order, KitchenError> {
        let order = lifecycle::place(new, self.now())?;
        let saved = self.store.save(order).await?;

        let order_id = saved.id.ok_or_else(|| {
            hdk_db::StoreError::Corrupt("store returned an order without id".to_string())
        })?;
        info!(
            order_id = %order_id,
            ordered_by = %saved.ordered_by,
            items = saved.items.len(),
            total = %saved.total_price,
            "order created"
        );
        self.publish(OrderEvent::Created {
            order_id,
            ordered_by: saved.ordered_by.clone(),
        });
        Ok(saved)
    }

    /// Claim the next waiting order for `preparer`. `Ok(None)` when there is
    /// no work.
    pub async fn claim_next_order(&self, preparer: &str) -> Result<Option<Order>, KitchenError> {
        let claimed = self.claims.claim_next(preparer, self.now()).await?;
        if let Some(order) = &claimed {
            if let (Some(order_id), Some(preparer)) = (order.id, order.prepared_by.clone()) {
                self.publish(OrderEvent::Claimed { order_id, preparer });
            }
        }
        Ok(claimed)
    }

    /// Apply an explicit status update. Any transition is accepted; moves
    /// that are not forward progress are logged.
    pub async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, KitchenError> {
        let (order, change) = self
            .store
            .set_status(id, status, self.now())
            .await?
            .ok_or(KitchenError::NotFound(id))?;

        if !change.is_noop() {
            if change.is_forward() {
                info!(order_id = %id, from = %change.from, to = %change.to, "order status changed");
            } else {
                warn!(
                    order_id = %id,
                    from = %change.from,
                    to = %change.to,
                    "order status moved backward"
                );
            }
            self.publish(OrderEvent::StatusChanged {
                order_id: id,
                from: change.from,
                to: change.to,
            });
        }
        Ok(order)
    }

    /// Delete an order and its items.
    pub async fn delete_order(&self, id: OrderId) -> Result<(), KitchenError> {
        if !self.store.delete(id).await? {
            return Err(KitchenError::NotFound(id));
        }
        info!(order_id = %id, "order deleted");
        self.publish(OrderEvent::Deleted { order_id: id });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, KitchenError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn get_item(&self, id: ItemId) -> Result<Option<Item>, KitchenError> {
        Ok(self.store.get_item(id).await?)
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, KitchenError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn list_orders_by_status(
        &self,
        status: OrderStatus,
    ) -> Result<Vec<Order>, KitchenError> {
        Ok(self.store.list_by_status(status).await?)
    }

    pub async fn list_orders_by_requester(
        &self,
        ordered_by: &str,
    ) -> Result<Vec<Order>, KitchenError> {
        Ok(self.store.list(&OrderFilter::by_requester(ordered_by)).await?)
    }

    /// Filtered listing, optionally windowed by `page`. No filter and no
    /// page is the same as [`Self::list_orders`].
    pub async fn list_orders_filtered(
        &self,
        filter: &OrderFilter,
        page: Option<Page>,
    ) -> Result<Vec<Order>, KitchenError> {
        let rows = self.store.list(filter).await?;
        Ok(match page {
            Some(page) => page.apply(rows),
            None => rows,
        })
    }
}
