//! Owning order container.
//!
//! Orders live by value in a `BTreeMap` keyed by a monotonically increasing
//! [`OrderHandle`], so iteration order is arrival order. A side index maps ids to
//! handles. Handles are never reused, which makes a stale handle miss instead of
//! silently hitting a newer order.

use crate::model::{Order, OrderHandle, OrderId, OrderStatus, StoreError};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct OrderQueue {
    slots: BTreeMap<OrderHandle, Order>,
    index: HashMap<OrderId, OrderHandle>,
    next_handle: u64,
    focus: Option<OrderHandle>,
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn handle_of(&self, id: &str) -> Option<OrderHandle> {
        self.index.get(id).copied()
    }

    pub fn get(&self, handle: OrderHandle) -> Option<&Order> {
        self.slots.get(&handle)
    }

    pub fn get_mut(&mut self, handle: OrderHandle) -> Option<&mut Order> {
        self.slots.get_mut(&handle)
    }

    pub fn find(&self, id: &str) -> Option<&Order> {
        self.handle_of(id).and_then(|handle| self.get(handle))
    }

    /// Appends `order` at the tail.
    pub fn insert(&mut self, order: Order) -> Result<OrderHandle, StoreError> {
        self.index
            .try_reserve(1)
            .map_err(|_| StoreError::Allocation(order.id.to_string()))?;
        self.next_handle += 1;
        let handle = OrderHandle(self.next_handle);
        self.index.insert(order.id.clone(), handle);
        self.slots.insert(handle, order);
        Ok(handle)
    }

    /// Unlinks and returns the order behind `handle`, clearing the focus if it
    /// pointed there.
    pub fn take(&mut self, handle: OrderHandle) -> Option<Order> {
        let order = self.slots.remove(&handle)?;
        self.index.remove(order.id.as_str());
        if self.focus == Some(handle) {
            self.focus = None;
        }
        Some(order)
    }

    /// Orders in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (OrderHandle, &Order)> {
        self.slots.iter().map(|(handle, order)| (*handle, order))
    }

    pub fn oldest(&self) -> Option<OrderHandle> {
        self.slots.keys().next().copied()
    }

    /// Earliest-arrived order still waiting.
    pub fn first_pending(&self) -> Option<OrderHandle> {
        self.iter()
            .find(|(_, order)| order.status == OrderStatus::Pending)
            .map(|(handle, _)| handle)
    }

    pub fn count(&self, status: OrderStatus) -> usize {
        self.slots.values().filter(|order| order.status == status).count()
    }

    pub fn focus(&self) -> Option<OrderHandle> {
        self.focus
    }

    pub(crate) fn set_focus(&mut self, focus: Option<OrderHandle>) {
        self.focus = focus;
    }
}
