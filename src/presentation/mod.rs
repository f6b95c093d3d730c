//! # Presentation Events
//!
//! The engine never draws anything. It tells a rendering collaborator what changed
//! through the [`Presenter`] observer, and the collaborator answers with opaque
//! [`PresentationHandle`]s the engine keeps only to ask for deletion later.
//!
//! ## Atomicity
//!
//! Presenter methods are synchronous and are always called while the coordinator
//! holds the presentation section. A multi-step sequence such as "remove the
//! finished order, promote the next one, show it" therefore reaches the presenter
//! as one uninterrupted burst of calls.
//!
//! ## Implementations
//!
//! - [`ChannelPresenter`]: forwards every call as a [`LifecycleEvent`] to a
//!   rendering task over a Tokio channel.
//! - [`mock::RecordingPresenter`]: records calls for assertions in tests.

pub mod mock;

use crate::model::{Order, OrderId, PresentationHandle};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

pub const ORDER_RECEIVED: &str = "Order received";
pub const ORDER_UPDATED: &str = "Order updated";
pub const ORDER_COMPLETED: &str = "Order completed";
pub const ORDER_DELETED: &str = "Order deleted";

/// Observer interface implemented by the rendering side.
pub trait Presenter: Send {
    /// A new order should appear on screen. Returns the handle of the created view,
    /// if the presenter created one.
    fn order_added(&mut self, order: &Order) -> Option<PresentationHandle>;

    /// Data of an order that is already on screen changed.
    fn order_updated(&mut self, order: &Order);

    /// The focused order changed. `None` means nothing is being prepared.
    fn order_focus_changed(&mut self, focus: Option<&Order>) -> Option<PresentationHandle>;

    /// The view behind `handle` must be deleted.
    fn order_removed(&mut self, order_id: &OrderId, handle: Option<PresentationHandle>);

    fn waiting_count_changed(&mut self, count: usize);

    fn show_transient_message(&mut self, text: &str, duration: Duration);

    /// No orders left, show the placeholder.
    fn idle(&mut self);

    /// Clock was synced (or restored); `text` is the status-bar rendering.
    fn time_synced(&mut self, millis: i64, text: &str);

    fn connection_changed(&mut self, connected: bool);
}

/// One presenter call, as data.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    OrderAdded {
        order: Order,
        handle: Option<PresentationHandle>,
    },
    OrderUpdated(Order),
    FocusChanged {
        focus: Option<Order>,
        handle: Option<PresentationHandle>,
    },
    OrderRemoved {
        order_id: OrderId,
        handle: Option<PresentationHandle>,
    },
    WaitingCountChanged(usize),
    TransientMessage {
        text: String,
        duration: Duration,
    },
    Idle,
    TimeSynced {
        millis: i64,
        text: String,
    },
    ConnectionChanged(bool),
}

/// Presenter that streams [`LifecycleEvent`]s to a rendering task.
///
/// Handles are allocated here, in call order, so the rendering task can key its
/// widgets by them.
#[derive(Debug)]
pub struct ChannelPresenter {
    sender: mpsc::UnboundedSender<LifecycleEvent>,
    next_handle: u64,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                next_handle: 1,
            },
            receiver,
        )
    }

    fn allocate(&mut self) -> PresentationHandle {
        let handle = PresentationHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn emit(&self, event: LifecycleEvent) {
        if self.sender.send(event).is_err() {
            warn!("rendering task gone, dropping lifecycle event");
        }
    }
}

impl Presenter for ChannelPresenter {
    fn order_added(&mut self, order: &Order) -> Option<PresentationHandle> {
        let handle = self.allocate();
        self.emit(LifecycleEvent::OrderAdded {
            order: order.clone(),
            handle: Some(handle),
        });
        Some(handle)
    }

    fn order_updated(&mut self, order: &Order) {
        self.emit(LifecycleEvent::OrderUpdated(order.clone()));
    }

    fn order_focus_changed(&mut self, focus: Option<&Order>) -> Option<PresentationHandle> {
        let handle = focus.map(|_| self.allocate());
        self.emit(LifecycleEvent::FocusChanged {
            focus: focus.cloned(),
            handle,
        });
        handle
    }

    fn order_removed(&mut self, order_id: &OrderId, handle: Option<PresentationHandle>) {
        self.emit(LifecycleEvent::OrderRemoved {
            order_id: order_id.clone(),
            handle,
        });
    }

    fn waiting_count_changed(&mut self, count: usize) {
        self.emit(LifecycleEvent::WaitingCountChanged(count));
    }

    fn show_transient_message(&mut self, text: &str, duration: Duration) {
        self.emit(LifecycleEvent::TransientMessage {
            text: text.to_string(),
            duration,
        });
    }

    fn idle(&mut self) {
        self.emit(LifecycleEvent::Idle);
    }

    fn time_synced(&mut self, millis: i64, text: &str) {
        self.emit(LifecycleEvent::TimeSynced {
            millis,
            text: text.to_string(),
        });
    }

    fn connection_changed(&mut self, connected: bool) {
        self.emit(LifecycleEvent::ConnectionChanged(connected));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_presenter_forwards_events_in_order() {
        let (mut presenter, mut events) = ChannelPresenter::new();
        let order = Order::new("A", 1, "Tea");

        let added = presenter.order_added(&order);
        let focused = presenter.order_focus_changed(Some(&order));
        presenter.order_removed(&order.id, focused);
        assert_eq!(presenter.order_focus_changed(None), None);

        assert_eq!(added, Some(PresentationHandle(1)));
        assert_eq!(focused, Some(PresentationHandle(2)));
        assert!(matches!(events.recv().await, Some(LifecycleEvent::OrderAdded { .. })));
        assert!(matches!(events.recv().await, Some(LifecycleEvent::FocusChanged { focus: Some(_), .. })));
        assert_eq!(
            events.recv().await,
            Some(LifecycleEvent::OrderRemoved {
                order_id: OrderId::from("A"),
                handle: Some(PresentationHandle(2)),
            })
        );
        assert_eq!(
            events.recv().await,
            Some(LifecycleEvent::FocusChanged { focus: None, handle: None })
        );
    }

    #[test]
    fn closed_receiver_is_not_fatal() {
        let (mut presenter, events) = ChannelPresenter::new();
        drop(events);
        presenter.idle();
        presenter.waiting_count_changed(3);
    }
}
