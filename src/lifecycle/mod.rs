//! Order lifecycle: the status state machine and the queue policies built on it.

pub mod policy;
pub mod state_machine;

pub use policy::{policy_for, Bounded, QueuePolicy, SingleFocus};
pub use state_machine::{apply, next_status, Transition, TransitionError};
