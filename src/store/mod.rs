//! # Order Store
//!
//! The single authoritative collection of live orders. Owns the [`OrderQueue`],
//! the selected [`QueuePolicy`] and the [`Presenter`] it reports to, so every
//! mutation and the presenter calls it causes happen under one `&mut self`.
//!
//! ## Total operations
//!
//! Wireless delivery may repeat or reorder messages, so `add`, `update` and
//! `remove` never fail on unknown or duplicate ids. They report what happened
//! through [`Outcome`] and log. The only error is [`StoreError`], returned when an
//! order could not be allocated; the store is then exactly as it was.

pub mod queue;

pub use queue::OrderQueue;

use crate::config::EngineConfig;
use crate::lifecycle::{policy_for, QueuePolicy};
use crate::model::order::copy_str;
use crate::model::{Order, OrderId, OrderStatus, StoreError};
use crate::presentation::Presenter;
use std::collections::TryReserveError;
use tracing::{debug, info, warn};

/// What a store operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Order appended. Lists orders evicted to stay within capacity.
    Added { evicted: Vec<OrderId> },
    /// An order with this id was already live; nothing changed.
    AlreadyPresent,
    Updated,
    /// Order completed and freed. Its id must be announced to the sender.
    Completed(OrderId),
    Removed,
    NotFound,
}

impl Outcome {
    /// Whether the store changed.
    pub fn changed(&self) -> bool {
        !matches!(self, Self::AlreadyPresent | Self::NotFound)
    }
}

pub struct OrderStore {
    queue: OrderQueue,
    policy: Box<dyn QueuePolicy>,
    presenter: Box<dyn Presenter>,
    placeholder: String,
    published_waiting: Option<usize>,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore")
            .field("queue", &self.queue)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl OrderStore {
    pub fn new(config: &EngineConfig, presenter: Box<dyn Presenter>) -> Self {
        let mut store = Self {
            queue: OrderQueue::new(),
            policy: policy_for(config.policy, config.capacity),
            presenter,
            placeholder: config.empty_dishes_placeholder.clone(),
            published_waiting: None,
        };
        store.presenter.idle();
        store.publish_waiting_count();
        info!(policy = ?config.policy, capacity = config.capacity, "Order store ready");
        store
    }

    pub fn presenter(&mut self) -> &mut dyn Presenter {
        self.presenter.as_mut()
    }

    /// Appends a new `Pending` order. A live duplicate id is ignored.
    pub fn add(&mut self, id: &OrderId, number: u32, dishes: Option<&str>) -> Result<Outcome, StoreError> {
        if self.queue.contains(id.as_str()) {
            info!(order_id = %id, "Duplicate add ignored");
            return Ok(Outcome::AlreadyPresent);
        }

        let dishes = dishes.filter(|d| !d.is_empty()).unwrap_or(self.placeholder.as_str());
        let order = Order::try_new(id.as_str(), number, dishes)?;
        let handle = self.queue.insert(order)?;
        let evicted = match self.policy.on_add(&mut self.queue, handle, self.presenter.as_mut()) {
            Ok(evicted) => evicted,
            Err(e) => {
                self.queue.take(handle);
                return Err(e.into());
            }
        };

        info!(order_id = %id, number, size = self.queue.len(), "Added");
        self.publish_waiting_count();
        Ok(Outcome::Added {
            evicted: evicted.into_iter().map(|order| order.id).collect(),
        })
    }

    /// Refreshes number and dishes, then completes the order if `completed`.
    ///
    /// Absent or empty `dishes` keeps the current summary.
    pub fn update(
        &mut self,
        id: &OrderId,
        number: u32,
        dishes: Option<&str>,
        completed: bool,
    ) -> Result<Outcome, StoreError> {
        self.update_with(id, number, dishes, completed, copy_str)
    }

    fn update_with<F>(
        &mut self,
        id: &OrderId,
        number: u32,
        dishes: Option<&str>,
        completed: bool,
        copy: F,
    ) -> Result<Outcome, StoreError>
    where
        F: Fn(&str) -> Result<String, TryReserveError>,
    {
        let Some(handle) = self.queue.handle_of(id.as_str()) else {
            warn!(order_id = %id, "Update for unknown order ignored");
            return Ok(Outcome::NotFound);
        };

        // Every fallible step runs before the order is touched.
        let summary = match dishes.filter(|d| !d.is_empty()) {
            Some(d) => Some(copy(d).map_err(|_| StoreError::Allocation(id.to_string()))?),
            None => None,
        };
        if let Some(order) = self.queue.get_mut(handle) {
            order.number = number;
            if let Some(summary) = summary {
                order.dish_summary = summary;
            }
        }

        if completed {
            let order = self.policy.on_complete(&mut self.queue, handle, self.presenter.as_mut())?;
            info!(order_id = %order.id, size = self.queue.len(), "Completed");
            self.publish_waiting_count();
            return Ok(Outcome::Completed(order.id));
        }

        self.policy.on_update(&self.queue, handle, self.presenter.as_mut());
        debug!(order_id = %id, number, "Updated");
        Ok(Outcome::Updated)
    }

    /// Completes `id` without touching its data. Used by operator buttons.
    pub fn complete(&mut self, id: &OrderId) -> Result<Outcome, StoreError> {
        let Some(handle) = self.queue.handle_of(id.as_str()) else {
            warn!(order_id = %id, "Completion for unknown order ignored");
            return Ok(Outcome::NotFound);
        };
        let order = self.policy.on_complete(&mut self.queue, handle, self.presenter.as_mut())?;
        info!(order_id = %order.id, size = self.queue.len(), "Completed");
        self.publish_waiting_count();
        Ok(Outcome::Completed(order.id))
    }

    /// Completes the focused order, if any.
    pub fn complete_focused(&mut self) -> Result<Outcome, StoreError> {
        match self.current_focus().map(|order| order.id.clone()) {
            Some(id) => self.complete(&id),
            None => {
                debug!("No focused order to complete");
                Ok(Outcome::NotFound)
            }
        }
    }

    pub fn remove(&mut self, id: &OrderId) -> Result<Outcome, StoreError> {
        let Some(handle) = self.queue.handle_of(id.as_str()) else {
            warn!(order_id = %id, "Remove for unknown order ignored");
            return Ok(Outcome::NotFound);
        };
        self.policy.on_remove(&mut self.queue, handle, self.presenter.as_mut())?;
        info!(order_id = %id, size = self.queue.len(), "Removed");
        self.publish_waiting_count();
        Ok(Outcome::Removed)
    }

    pub fn lookup(&self, id: &OrderId) -> Option<&Order> {
        self.queue.find(id.as_str())
    }

    /// Orders still waiting for the focus.
    pub fn waiting_count(&self) -> usize {
        self.queue.count(OrderStatus::Pending)
    }

    /// The order being prepared. Always `None` under the bounded policy.
    pub fn current_focus(&self) -> Option<&Order> {
        self.queue.focus().and_then(|handle| self.queue.get(handle))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Clones of all live orders in arrival order.
    pub fn snapshot(&self) -> Vec<Order> {
        self.queue.iter().map(|(_, order)| order.clone()).collect()
    }

    fn publish_waiting_count(&mut self) {
        let waiting = self.waiting_count();
        if self.published_waiting != Some(waiting) {
            self.published_waiting = Some(waiting);
            self.presenter.waiting_count_changed(waiting);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyKind;
    use crate::presentation::mock::RecordingPresenter;

    fn store(policy: PolicyKind) -> (OrderStore, RecordingPresenter) {
        let presenter = RecordingPresenter::new();
        let config = EngineConfig::default().with_policy(policy);
        (OrderStore::new(&config, Box::new(presenter.clone())), presenter)
    }

    fn id(s: &str) -> OrderId {
        OrderId::from(s)
    }

    #[test]
    fn add_is_idempotent() {
        let (mut store, _) = store(PolicyKind::SingleFocus);
        assert!(matches!(store.add(&id("A"), 1, Some("Tea")).unwrap(), Outcome::Added { .. }));
        assert_eq!(store.add(&id("A"), 1, Some("Tea")).unwrap(), Outcome::AlreadyPresent);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_without_dishes_uses_placeholder() {
        let (mut store, _) = store(PolicyKind::SingleFocus);
        store.add(&id("A"), 1, None).unwrap();
        store.add(&id("B"), 2, Some("")).unwrap();
        assert_eq!(store.lookup(&id("A")).unwrap().dish_summary, "No items");
        assert_eq!(store.lookup(&id("B")).unwrap().dish_summary, "No items");
    }

    #[test]
    fn update_keeps_summary_when_dishes_absent() {
        let (mut store, presenter) = store(PolicyKind::SingleFocus);
        store.add(&id("A"), 1, Some("Tea")).unwrap();

        assert_eq!(store.update(&id("A"), 7, None, false).unwrap(), Outcome::Updated);
        let order = store.lookup(&id("A")).unwrap();
        assert_eq!(order.number, 7);
        assert_eq!(order.dish_summary, "Tea");

        store.update(&id("A"), 7, Some("Coffee"), false).unwrap();
        assert_eq!(store.lookup(&id("A")).unwrap().dish_summary, "Coffee");
        assert!(presenter
            .events()
            .iter()
            .any(|e| matches!(e, crate::presentation::LifecycleEvent::OrderUpdated(o) if o.dish_summary == "Coffee")));
    }

    #[test]
    fn waiting_order_update_is_not_redrawn() {
        let (mut store, presenter) = store(PolicyKind::SingleFocus);
        store.add(&id("A"), 1, Some("Tea")).unwrap();
        store.add(&id("B"), 2, Some("Tea")).unwrap();
        presenter.take_events();

        store.update(&id("B"), 2, Some("Soup"), false).unwrap();
        assert!(presenter.events().is_empty());
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let (mut store, _) = store(PolicyKind::SingleFocus);
        assert_eq!(store.update(&id("X"), 1, None, true).unwrap(), Outcome::NotFound);
        assert_eq!(store.remove(&id("X")).unwrap(), Outcome::NotFound);
        assert_eq!(store.complete(&id("X")).unwrap(), Outcome::NotFound);
        assert_eq!(store.complete_focused().unwrap(), Outcome::NotFound);
    }

    #[test]
    fn fifo_focus_and_waiting_count() {
        let (mut store, presenter) = store(PolicyKind::SingleFocus);
        for name in ["A", "B", "C"] {
            store.add(&id(name), 1, Some("x")).unwrap();
        }
        assert_eq!(store.current_focus().unwrap().id, id("A"));
        assert_eq!(store.waiting_count(), 2);
        assert_eq!(presenter.last_waiting_count(), Some(2));

        assert_eq!(store.update(&id("A"), 1, None, true).unwrap(), Outcome::Completed(id("A")));
        assert_eq!(store.current_focus().unwrap().id, id("B"));
        assert_eq!(store.waiting_count(), 1);
        assert_eq!(presenter.last_waiting_count(), Some(1));
    }

    #[test]
    fn removing_focus_advances_queue() {
        let (mut store, _) = store(PolicyKind::SingleFocus);
        store.add(&id("A"), 1, Some("x")).unwrap();
        store.add(&id("B"), 2, Some("x")).unwrap();

        assert_eq!(store.remove(&id("A")).unwrap(), Outcome::Removed);
        assert_eq!(store.current_focus().unwrap().id, id("B"));
        assert_eq!(store.remove(&id("A")).unwrap(), Outcome::NotFound);
    }

    #[test]
    fn complete_focused_walks_the_queue() {
        let (mut store, presenter) = store(PolicyKind::SingleFocus);
        store.add(&id("A"), 1, Some("x")).unwrap();
        store.add(&id("B"), 2, Some("x")).unwrap();

        assert_eq!(store.complete_focused().unwrap(), Outcome::Completed(id("A")));
        assert_eq!(store.complete_focused().unwrap(), Outcome::Completed(id("B")));
        assert!(store.is_empty());
        assert!(store.current_focus().is_none());
        assert!(presenter.live_handles().is_empty());
    }

    #[test]
    fn bounded_store_caps_live_orders() {
        let (mut store, presenter) = store(PolicyKind::Bounded);
        for n in 0..31 {
            store.add(&id(&format!("order_{n:04}")), n, Some("x")).unwrap();
        }
        assert_eq!(store.len(), 30);
        assert!(store.lookup(&id("order_0000")).is_none());
        assert!(store.lookup(&id("order_0030")).is_some());
        assert!(store.current_focus().is_none());
        assert_eq!(presenter.live_handles().len(), 30);
    }

    #[test]
    fn failed_summary_copy_leaves_order_untouched() {
        let (mut store, presenter) = store(PolicyKind::SingleFocus);
        store.add(&id("A"), 1, Some("Tea")).unwrap();
        let before = store.snapshot();
        let events = presenter.events().len();

        let out_of_memory = |_: &str| String::new().try_reserve_exact(usize::MAX).map(|()| String::new());
        let result = store.update_with(&id("A"), 9, Some("Rice"), true, out_of_memory);

        assert_eq!(result, Err(StoreError::Allocation("A".to_string())));
        assert_eq!(store.snapshot(), before);
        assert_eq!(presenter.events().len(), events);
        assert_eq!(store.current_focus().map(|o| o.id.clone()), Some(id("A")));
    }

    #[test]
    fn bounded_eviction_is_reported() {
        let presenter = RecordingPresenter::new();
        let mut config = EngineConfig::default().with_policy(PolicyKind::Bounded);
        config.capacity = 1;
        let mut store = OrderStore::new(&config, Box::new(presenter));

        store.add(&id("A"), 1, Some("x")).unwrap();
        assert_eq!(
            store.add(&id("B"), 2, Some("x")).unwrap(),
            Outcome::Added { evicted: vec![id("A")] }
        );
    }
}
