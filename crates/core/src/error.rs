//! Domain error model.

use thiserror::Error;

use crate::id::OrderId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant here is an *expected* business outcome and carries enough
/// context to render a precise message to the caller. Infrastructure failures
/// (unreachable blob store, etc.) are a separate type and must never be
/// folded into `NotFound`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, empty comment).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level; names the entity).
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// A concurrency race was lost (stale version, duplicate version_no).
    /// Callers may safely retry with freshly read state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor lacks the capability required for the attempted action.
    /// Distinct from `InvalidTransition` so callers can tell "wrong role"
    /// from "wrong state".
    #[error("forbidden: missing capability '{capability}'")]
    Forbidden { capability: String },

    /// The requested workflow event is not legal from the report's current
    /// state. Names both so the caller can render a precise rejection.
    #[error("cannot {event} a report in state {current}")]
    InvalidTransition { current: String, event: String },

    /// PDF access is blocked while the order's invoices remain unpaid.
    /// Surfaced distinctly from `NotFound` so clients render "payment
    /// pending" rather than "does not exist".
    #[error("order {order_id} is locked pending payment")]
    PaymentRequired { order_id: OrderId },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn forbidden(capability: impl Into<String>) -> Self {
        Self::Forbidden {
            capability: capability.into(),
        }
    }

    pub fn invalid_transition(current: impl Into<String>, event: impl Into<String>) -> Self {
        Self::InvalidTransition {
            current: current.into(),
            event: event.into(),
        }
    }

    pub fn payment_required(order_id: OrderId) -> Self {
        Self::PaymentRequired { order_id }
    }
}
