use hdk_domain::{OrderId, OrderStatus};
use serde::{Deserialize, Serialize};

/// Order change notifications published by the service after each
/// committed mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created {
        order_id: OrderId,
        ordered_by: String,
    },
    Claimed {
        order_id: OrderId,
        preparer: String,
    },
    StatusChanged {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
    Deleted {
        order_id: OrderId,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::Created { order_id, .. }
            | OrderEvent::Claimed { order_id, .. }
            | OrderEvent::StatusChanged { order_id, .. }
            | OrderEvent::Deleted { order_id } => *order_id,
        }
    }
}
