//! In-process [`OrderStore`].
//!
//! Each order lives in its own slot with two independent locks:
//!
//! - `claimed`: an atomic flag a claimer CASes before touching the row. A
//!   failed CAS means "locked by another claim": the claimer skips the row,
//!   exactly like `FOR UPDATE SKIP LOCKED`.
//! - `data`: a mutex over the aggregate. Held only for the duration of a
//!   read or a single mutation, never across an `.await`.
//!
//! Listing and point reads only take `data`, so they never make a claimer
//! skip work.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use hdk_domain::lifecycle::{self, StatusChange};
use hdk_domain::query::{claim_queue_cmp, listing_cmp};
use hdk_domain::{Item, ItemId, Order, OrderFilter, OrderId, OrderStatus};
use tracing::debug;

use crate::store::{OrderStore, StoreError};

struct Row {
    order: Order,
    /// Set when the order is deleted while a claimer still holds the slot.
    deleted: bool,
}

struct Slot {
    claimed: AtomicBool,
    data: Mutex<Row>,
}

impl Slot {
    fn new(order: Order) -> Self {
        Self {
            claimed: AtomicBool::new(false),
            data: Mutex::new(Row {
                order,
                deleted: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Row> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Non-blocking claim-lock attempt.
    fn try_claim(&self) -> Option<ClaimGuard<'_>> {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ClaimGuard { slot: self })
    }
}

/// Releases the claim flag on drop.
struct ClaimGuard<'a> {
    slot: &'a Slot,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.slot.claimed.store(false, Ordering::Release);
    }
}

pub struct MemOrderStore {
    slots: RwLock<BTreeMap<i64, Arc<Slot>>>,
    next_order_id: AtomicI64,
    next_item_id: AtomicI64,
    tz: Tz,
}

impl Default for MemOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemOrderStore {
    pub fn new() -> Self {
        Self::with_time_zone(Tz::UTC)
    }

    pub fn with_time_zone(tz: Tz) -> Self {
        Self {
            slots: RwLock::new(BTreeMap::new()),
            next_order_id: AtomicI64::new(1),
            next_item_id: AtomicI64::new(1),
            tz,
        }
    }

    pub fn len(&self) -> usize {
        self.read_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_slots(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<i64, Arc<Slot>>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<i64, Arc<Slot>>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, id: OrderId) -> Option<Arc<Slot>> {
        self.read_slots().get(&id.0).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<Slot>> {
        self.read_slots().values().cloned().collect()
    }

    /// Fresh item ids on every save, matching the Postgres store which
    /// rewrites the item rows.
    fn assign_item_ids(&self, order: &mut Order) {
        for item in &mut order.items {
            item.id = Some(ItemId(self.next_item_id.fetch_add(1, Ordering::Relaxed)));
        }
        order.adopt_items();
    }
}

#[async_trait]
impl OrderStore for MemOrderStore {
    async fn save(&self, mut order: Order) -> Result<Order, StoreError> {
        lifecycle::reprice(&mut order)?;
        match order.id {
            None => {
                let id = OrderId(self.next_order_id.fetch_add(1, Ordering::Relaxed));
                order.id = Some(id);
                self.assign_item_ids(&mut order);
                self.write_slots()
                    .insert(id.0, Arc::new(Slot::new(order.clone())));
                Ok(order)
            }
            Some(id) => {
                let slot = self.slot(id).ok_or(StoreError::UnknownOrder(id))?;
                let mut row = slot.lock();
                if row.deleted {
                    return Err(StoreError::UnknownOrder(id));
                }
                self.assign_item_ids(&mut order);
                row.order = order.clone();
                Ok(order)
            }
        }
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.slot(id).and_then(|slot| {
            let row = slot.lock();
            (!row.deleted).then(|| row.order.clone())
        }))
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        for slot in self.snapshot() {
            let row = slot.lock();
            if row.deleted {
                continue;
            }
            if let Some(item) = row.order.items.iter().find(|i| i.id == Some(id)) {
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut out: Vec<Order> = self
            .snapshot()
            .iter()
            .filter_map(|slot| {
                let row = slot.lock();
                (!row.deleted && filter.matches(&row.order, self.tz)).then(|| row.order.clone())
            })
            .collect();
        out.sort_by(listing_cmp);
        Ok(out)
    }

    async fn claim_next_ordered(
        &self,
        preparer: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError> {
        let mut queue: Vec<(Order, Arc<Slot>)> = self
            .snapshot()
            .into_iter()
            .filter_map(|slot| {
                let head = {
                    let row = slot.lock();
                    if row.deleted || row.order.status != OrderStatus::Ordered {
                        return None;
                    }
                    // ordering keys only; items are not needed to sort
                    Order {
                        items: Vec::new(),
                        ..row.order.clone()
                    }
                };
                Some((head, slot))
            })
            .collect();
        queue.sort_by(|a, b| claim_queue_cmp(&a.0, &b.0));

        for (head, slot) in &queue {
            let Some(_guard) = slot.try_claim() else {
                debug!(order_id = ?head.id, "skipping order locked by another claim");
                continue;
            };
            let mut row = slot.lock();
            // re-check under the lock: the snapshot may be stale
            if row.deleted || row.order.status != OrderStatus::Ordered {
                continue;
            }
            lifecycle::claim(&mut row.order, preparer, now)?;
            return Ok(Some(row.order.clone()));
        }

        Ok(None)
    }

    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<(Order, StatusChange)>, StoreError> {
        let Some(slot) = self.slot(id) else {
            return Ok(None);
        };
        let mut row = slot.lock();
        if row.deleted {
            return Ok(None);
        }
        let change = lifecycle::apply_status(&mut row.order, status, now);
        Ok(Some((row.order.clone(), change)))
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let removed = self.write_slots().remove(&id.0);
        match removed {
            Some(slot) => {
                slot.lock().deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
