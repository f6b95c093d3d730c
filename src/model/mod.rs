//! Domain model types.

pub mod order;

pub use order::*;
