//! hdk-domain: pure kitchen order domain.
//!
//! Deterministic logic only: no IO, no database, no async. The wall clock is
//! always passed in by the caller so every transition is reproducible in
//! tests.
//!
//! - [`order`]: the `Order` aggregate root and its owned `Item` children.
//! - [`status`]: closed enumerations (`OrderStatus`, `ItemKind`, `PaymentType`).
//! - [`pricing`]: fixed-point [`Price`] and the static unit price table.
//! - [`lifecycle`]: the order status state machine.
//! - [`query`]: listing filters, pagination and the two canonical orderings.

pub mod error;
pub mod lifecycle;
pub mod order;
pub mod pricing;
pub mod query;
pub mod status;

pub use error::{LifecycleError, ValidationError};
pub use order::{Item, ItemId, NewItem, NewOrder, Order, OrderId, Toppings};
pub use pricing::{Price, PricingCalculator};
pub use query::{OrderFilter, Page};
pub use status::{ItemKind, OrderStatus, PaymentType};
