use std::sync::Arc;

use chrono::{DateTime, Utc};
use hdk_db::OrderStore;
use hdk_domain::{Order, ValidationError};
use tracing::{debug, info};

use crate::error::KitchenError;

/// Hands `Ordered` orders to preparers, one order per successful claim.
///
/// The exclusivity guarantee comes from the store's skip-locked claim; this
/// layer validates the preparer identity and records the outcome.
#[derive(Clone)]
pub struct ClaimEngine {
    store: Arc<dyn OrderStore>,
}

impl ClaimEngine {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Claim the next order for `preparer`.
    ///
    /// `Ok(None)` when nothing is waiting or every waiting order is being
    /// claimed by someone else right now. Never blocks behind another claim.
    pub async fn claim_next(
        &self,
        preparer: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, KitchenError> {
        let preparer = preparer.trim();
        if preparer.is_empty() {
            return Err(ValidationError::MissingPreparer.into());
        }

        match self.store.claim_next_ordered(preparer, now).await? {
            Some(order) => {
                info!(
                    order_id = ?order.id,
                    preparer,
                    backend = self.store.backend(),
                    "order claimed"
                );
                Ok(Some(order))
            }
            None => {
                debug!(preparer, "no order available to claim");
                Ok(None)
            }
        }
    }
}
