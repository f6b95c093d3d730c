//! # Mock Presenter
//!
//! [`RecordingPresenter`] stands in for the rendering side in tests. Clones share
//! one log, so a test keeps a clone while the engine owns the original:
//!
//! ```ignore
//! let presenter = RecordingPresenter::new();
//! let coordinator = Coordinator::new(&config, Box::new(presenter.clone()), notifier, clock);
//! // ... drive the coordinator ...
//! assert_eq!(presenter.live_handles().len(), 1);
//! ```
//!
//! Besides the raw event log it tracks which handles are currently on screen, so
//! tests can assert that nothing was deleted twice or left behind.

use super::{LifecycleEvent, Presenter};
use crate::model::{Order, OrderId, PresentationHandle};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Recorded {
    events: Vec<LifecycleEvent>,
    next_handle: u64,
    live: BTreeSet<u64>,
    /// Handles passed to `order_removed` that were not live at the time.
    dangling: Vec<PresentationHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue(&self) -> PresentationHandle {
        let mut state = self.state();
        state.next_handle += 1;
        let id = state.next_handle;
        state.live.insert(id);
        PresentationHandle(id)
    }

    fn push(&self, event: LifecycleEvent) {
        self.state().events.push(event);
    }

    /// Snapshot of every call so far.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.state().events.clone()
    }

    /// Returns and clears the log.
    pub fn take_events(&self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.state().events)
    }

    /// Texts of all transient messages, in order.
    pub fn messages(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                LifecycleEvent::TransientMessage { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids passed to `order_removed`, in order.
    pub fn removed_ids(&self) -> Vec<OrderId> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                LifecycleEvent::OrderRemoved { order_id, .. } => Some(order_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recent focus, as reported to the presenter.
    pub fn last_focus(&self) -> Option<Option<OrderId>> {
        self.state().events.iter().rev().find_map(|event| match event {
            LifecycleEvent::FocusChanged { focus, .. } => Some(focus.as_ref().map(|o| o.id.clone())),
            _ => None,
        })
    }

    pub fn last_waiting_count(&self) -> Option<usize> {
        self.state().events.iter().rev().find_map(|event| match event {
            LifecycleEvent::WaitingCountChanged(count) => Some(*count),
            _ => None,
        })
    }

    /// Handles issued and not yet removed.
    pub fn live_handles(&self) -> Vec<PresentationHandle> {
        self.state().live.iter().copied().map(PresentationHandle).collect()
    }

    /// Handles that were removed while not live (double delete or never issued).
    pub fn dangling_removals(&self) -> Vec<PresentationHandle> {
        self.state().dangling.clone()
    }
}

impl Presenter for RecordingPresenter {
    fn order_added(&mut self, order: &Order) -> Option<PresentationHandle> {
        let handle = self.issue();
        self.push(LifecycleEvent::OrderAdded {
            order: order.clone(),
            handle: Some(handle),
        });
        Some(handle)
    }

    fn order_updated(&mut self, order: &Order) {
        self.push(LifecycleEvent::OrderUpdated(order.clone()));
    }

    fn order_focus_changed(&mut self, focus: Option<&Order>) -> Option<PresentationHandle> {
        let handle = focus.map(|_| self.issue());
        self.push(LifecycleEvent::FocusChanged {
            focus: focus.cloned(),
            handle,
        });
        handle
    }

    fn order_removed(&mut self, order_id: &OrderId, handle: Option<PresentationHandle>) {
        let mut state = self.state();
        if let Some(handle) = handle {
            if !state.live.remove(&handle.0) {
                state.dangling.push(handle);
            }
        }
        state.events.push(LifecycleEvent::OrderRemoved {
            order_id: order_id.clone(),
            handle,
        });
    }

    fn waiting_count_changed(&mut self, count: usize) {
        self.push(LifecycleEvent::WaitingCountChanged(count));
    }

    fn show_transient_message(&mut self, text: &str, duration: Duration) {
        self.push(LifecycleEvent::TransientMessage {
            text: text.to_string(),
            duration,
        });
    }

    fn idle(&mut self) {
        self.push(LifecycleEvent::Idle);
    }

    fn time_synced(&mut self, millis: i64, text: &str) {
        self.push(LifecycleEvent::TimeSynced {
            millis,
            text: text.to_string(),
        });
    }

    fn connection_changed(&mut self, connected: bool) {
        self.push(LifecycleEvent::ConnectionChanged(connected));
    }
}
