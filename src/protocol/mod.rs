//! Inbound wire protocol: raw characteristic writes to typed [`Command`]s.

pub mod command;
pub mod decoder;
pub mod error;
pub mod order_number;
pub mod timestamp;

pub use command::{Command, CommandKind};
pub use decoder::{Decoder, DISH_SEPARATOR, DISPLAY_TEST};
pub use error::DecodeError;
pub use order_number::derive_order_number;
pub use timestamp::{parse_display_timestamp, TimestampError};
