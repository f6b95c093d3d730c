//! Errors for inbound message handling.
//!
//! Every variant is local to one message: the message is dropped, the transport
//! still acknowledges the write, and nothing in the store changes.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not JSON (and no recoverable `"content"`), or rejected by the size guard.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// An order command without an order identifier.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A lock could not be acquired within the bound.
    #[error("engine busy, message dropped")]
    Busy,
}
