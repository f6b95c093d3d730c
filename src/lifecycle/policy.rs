//! # Queue Policies
//!
//! A [`QueuePolicy`] decides what the display does when orders arrive, finish or
//! disappear. The engine picks one at construction time from
//! [`PolicyKind`](crate::config::PolicyKind):
//!
//! - [`SingleFocus`]: one order is "being prepared" (`Processing`), the rest wait
//!   in arrival order. Finishing or removing the focus promotes the oldest waiting
//!   order in the same call.
//! - [`Bounded`]: every order is shown at once as its own row, up to a capacity.
//!   Overflow evicts the oldest row.
//!
//! Each hook validates its first transition before touching the queue, so an
//! error leaves both the queue and the presenter untouched.

use super::state_machine::{apply, next_status, Transition, TransitionError};
use crate::config::PolicyKind;
use crate::model::{Order, OrderHandle, OrderStatus};
use crate::presentation::Presenter;
use crate::store::OrderQueue;
use std::fmt::Debug;
use tracing::{debug, info, warn};

pub trait QueuePolicy: Debug + Send + Sync {
    /// `handle` was just appended as `Pending`. Returns orders evicted to make room.
    fn on_add(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Vec<Order>, TransitionError>;

    /// Completes and frees `handle`, returning the completed order.
    fn on_complete(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Order, TransitionError>;

    /// Deletes `handle` without completing it.
    fn on_remove(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Order, TransitionError>;

    /// Data of `handle` changed. Redraws it if it is on screen.
    fn on_update(&self, queue: &OrderQueue, handle: OrderHandle, presenter: &mut dyn Presenter) {
        if let Some(order) = queue.get(handle).filter(|o| o.presentation.is_some()) {
            presenter.order_updated(order);
        }
    }
}

pub fn policy_for(kind: PolicyKind, capacity: usize) -> Box<dyn QueuePolicy> {
    match kind {
        PolicyKind::SingleFocus => Box::new(SingleFocus),
        PolicyKind::Bounded => Box::new(Bounded { capacity }),
    }
}

/// Moves `handle` into a terminal status and unlinks it from the queue.
fn retire(
    queue: &mut OrderQueue,
    handle: OrderHandle,
    event: Transition,
    presenter: &mut dyn Presenter,
) -> Result<Order, TransitionError> {
    let Some(from) = queue.get(handle).map(|order| order.status) else {
        // Already unlinked.
        return Err(TransitionError { from: OrderStatus::Removed, event });
    };
    if !next_status(from, event)?.is_terminal() {
        return Err(TransitionError { from, event });
    }

    let Some(mut order) = queue.take(handle) else {
        return Err(TransitionError { from, event });
    };
    apply(&mut order, event)?;
    presenter.order_removed(&order.id, order.presentation.take());
    Ok(order)
}

// =============================================================================
// SINGLE FOCUS
// =============================================================================

#[derive(Debug, Default)]
pub struct SingleFocus;

impl SingleFocus {
    /// Promotes the oldest waiting order, or reports idle when there is none.
    fn advance(queue: &mut OrderQueue, presenter: &mut dyn Presenter) -> Result<(), TransitionError> {
        let Some(next) = queue.first_pending() else {
            queue.set_focus(None);
            presenter.order_focus_changed(None);
            presenter.idle();
            info!("Queue idle");
            return Ok(());
        };
        Self::promote(queue, next, presenter)
    }

    fn promote(
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<(), TransitionError> {
        let Some(order) = queue.get_mut(handle) else {
            return Ok(());
        };
        apply(order, Transition::Promote)?;
        order.presentation = presenter.order_focus_changed(Some(&*order));
        queue.set_focus(Some(handle));
        Ok(())
    }

    fn leave(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        event: Transition,
        presenter: &mut dyn Presenter,
    ) -> Result<Order, TransitionError> {
        let was_focus = queue.focus() == Some(handle);
        let order = retire(queue, handle, event, presenter)?;
        if was_focus {
            Self::advance(queue, presenter)?;
        }
        Ok(order)
    }
}

impl QueuePolicy for SingleFocus {
    fn on_add(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Vec<Order>, TransitionError> {
        match queue.focus() {
            None => Self::promote(queue, handle, presenter)?,
            Some(focus) => debug!(?focus, ?handle, "focus held, order waits"),
        }
        Ok(Vec::new())
    }

    fn on_complete(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Order, TransitionError> {
        self.leave(queue, handle, Transition::Complete, presenter)
    }

    fn on_remove(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Order, TransitionError> {
        self.leave(queue, handle, Transition::Remove, presenter)
    }
}

// =============================================================================
// BOUNDED
// =============================================================================

#[derive(Debug)]
pub struct Bounded {
    pub capacity: usize,
}

impl Bounded {
    fn settle(queue: &OrderQueue, presenter: &mut dyn Presenter) {
        if queue.is_empty() {
            presenter.idle();
        }
    }
}

impl QueuePolicy for Bounded {
    fn on_add(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Vec<Order>, TransitionError> {
        if let Some(order) = queue.get_mut(handle) {
            order.presentation = presenter.order_added(order);
        }

        let mut evicted = Vec::new();
        while queue.len() > self.capacity {
            let Some(oldest) = queue.oldest() else { break };
            let order = retire(queue, oldest, Transition::Remove, presenter)?;
            warn!(order_id = %order.id, capacity = self.capacity, "Evicted oldest order");
            evicted.push(order);
        }
        Ok(evicted)
    }

    fn on_complete(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Order, TransitionError> {
        let order = retire(queue, handle, Transition::Complete, presenter)?;
        Self::settle(queue, presenter);
        Ok(order)
    }

    fn on_remove(
        &self,
        queue: &mut OrderQueue,
        handle: OrderHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<Order, TransitionError> {
        let order = retire(queue, handle, Transition::Remove, presenter)?;
        Self::settle(queue, presenter);
        Ok(order)
    }
}
