//! hdk-kitchen: the order service consumed by the daemon and the CLI.
//!
//! [`OrderService`] is the upward interface: create, list, look up, claim,
//! update and delete orders. It owns no state of its own beyond an event
//! channel; persistence and locking live behind [`hdk_db::OrderStore`].

mod claim;
mod error;
mod events;
mod service;

pub use claim::ClaimEngine;
pub use error::KitchenError;
pub use events::OrderEvent;
pub use service::{Clock, OrderService};
