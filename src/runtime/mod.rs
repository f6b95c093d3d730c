//! Runtime orchestration.
//!
//! - [`KitchenSystem`]: builds the engine from its collaborators, starts the
//!   ingress actor and shuts it down again.
//! - [`setup_tracing`]: installs the log subscriber.

pub mod kitchen_system;
pub mod tracing;

pub use self::kitchen_system::{KitchenSystem, SystemError};
pub use self::tracing::setup_tracing;
