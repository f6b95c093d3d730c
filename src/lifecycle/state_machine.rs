//! Order lifecycle state machine.
//!
//! ```text
//!   add ──► Pending ──Promote──► Processing ──Complete──► Completed ──► (freed)
//!              │                     │
//!              ├───Complete──────────┼─────────────────────────────────► (freed)
//!              │                     │
//!              └───Remove────────────┴──Remove──► Removed ─────────────► (freed)
//! ```
//!
//! `Completed` and `Removed` are terminal and momentary: the store frees the order
//! in the same operation that enters them. A `Pending` order may complete without
//! ever being focused, which is how the bounded display finishes orders.

use crate::model::{Order, OrderStatus};
use thiserror::Error;
use tracing::info;

/// Events that drive an [`Order`] between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order became the focus.
    Promote,
    /// The order is ready.
    Complete,
    /// The order was deleted or evicted.
    Remove,
}

/// An event that is not legal in the order's current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal order transition: {from:?} + {event:?}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub event: Transition,
}

/// Pure transition table.
pub fn next_status(from: OrderStatus, event: Transition) -> Result<OrderStatus, TransitionError> {
    use OrderStatus::*;
    use Transition::*;

    match (from, event) {
        (Pending, Promote) => Ok(Processing),
        (Pending | Processing, Complete) => Ok(Completed),
        (Pending | Processing, Remove) => Ok(Removed),
        _ => Err(TransitionError { from, event }),
    }
}

/// Applies `event` to `order`, leaving it untouched on error.
pub fn apply(order: &mut Order, event: Transition) -> Result<OrderStatus, TransitionError> {
    let from = order.status;
    let to = next_status(from, event)?;
    order.status = to;
    info!(order_id = %order.id, ?from, ?to, "Transition");
    Ok(to)
}
