use crate::status::OrderStatus;

/// Malformed input, rejected before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("orderedBy must not be empty")]
    MissingOrderedBy,

    #[error("preparer identifier must not be empty")]
    MissingPreparer,

    #[error("unknown item kind: {0}")]
    UnknownItemKind(String),

    #[error("unknown order status: {0}")]
    UnknownStatus(String),

    #[error("unknown payment type: {0}")]
    UnknownPaymentType(String),

    #[error("order total overflows the price range")]
    PriceOverflow,

    #[error("invalid order date {0:?}: expected DDMMYYYY")]
    InvalidDate(String),

    /// Request payload that does not decode into the expected shape.
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// A transition the state machine cannot perform.
///
/// The explicit status update path is permissive and never produces this;
/// only the claim path has a precondition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("order is not claimable from status {from}")]
    NotClaimable { from: OrderStatus },
}
