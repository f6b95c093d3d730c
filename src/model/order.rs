//! One customer ticket tracked from arrival to completion or removal.
//!
//! Orders are owned by the [`OrderStore`](crate::store::OrderStore). The rendering
//! side only ever receives clones and an opaque [`PresentationHandle`] it issued
//! itself.
use crate::lifecycle::TransitionError;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::TryReserveError;
use std::fmt::Display;
use thiserror::Error;

/// Identity key for every lookup. Unique among live orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for OrderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable slot handle inside the store, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderHandle(pub u64);

/// Opaque reference issued by the rendering collaborator for an on-screen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresentationHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    /// Tombstone between removal and deallocation.
    Removed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Removed)
    }
}

/// The only ways a store operation can fail. Either way the store is left as it
/// was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Memory for a new or replaced order field could not be reserved.
    #[error("allocation failed while building order {0}")]
    Allocation(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    /// Short display number. Not unique, never used for lookups.
    pub number: u32,
    pub dish_summary: String,
    pub status: OrderStatus,
    pub presentation: Option<PresentationHandle>,
}

impl Order {
    /// Builds a `Pending` order, deep-copying both strings.
    ///
    /// Fails without side effects if either copy cannot be allocated; nothing
    /// partially built escapes.
    pub fn try_new(id: &str, number: u32, dish_summary: &str) -> Result<Self, StoreError> {
        let owned_id = copy_str(id).map_err(|_| StoreError::Allocation(id.to_string()))?;
        let dishes = copy_str(dish_summary).map_err(|_| StoreError::Allocation(id.to_string()))?;
        Ok(Self {
            id: OrderId(owned_id),
            number,
            dish_summary: dishes,
            status: OrderStatus::Pending,
            presentation: None,
        })
    }

    /// Creates an order directly. Intended for tests and fixtures.
    pub fn new(id: impl Into<OrderId>, number: u32, dish_summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            number,
            dish_summary: dish_summary.into(),
            status: OrderStatus::Pending,
            presentation: None,
        }
    }
}

/// Copies `source` into a freshly reserved buffer, reporting allocation failure.
pub(crate) fn copy_str(source: &str) -> Result<String, TryReserveError> {
    let mut owned = String::new();
    owned.try_reserve_exact(source.len())?;
    owned.push_str(source);
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_new_starts_pending_without_handle() {
        let order = Order::try_new("order_0005", 5, "Rice、Soup").unwrap();
        assert_eq!(order.id, OrderId::from("order_0005"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.presentation.is_none());
        assert_eq!(order.dish_summary, "Rice、Soup");
    }

    #[test]
    fn terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Removed.is_terminal());
    }
}
