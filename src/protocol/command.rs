//! Typed commands produced by the [`Decoder`](super::Decoder).

use crate::model::OrderId;

/// One decoded inbound message. Consumed immediately, never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add {
        order_id: OrderId,
        number: u32,
        /// Joined item names; `None` when the message carried no usable items.
        dishes: Option<String>,
    },
    Update {
        order_id: OrderId,
        number: u32,
        dishes: Option<String>,
        /// `true` marks the order ready; `false` edits it in place.
        completed: bool,
    },
    Remove {
        order_id: OrderId,
    },
    Info {
        command: Option<String>,
        /// Milliseconds since the Unix epoch, present only for a valid `display_test`.
        timestamp: Option<i64>,
        free_text: Option<String>,
    },
    /// A discriminator this engine does not act on (or none at all). A no-op.
    Unknown {
        discriminator: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Add,
    Update,
    Remove,
    Info,
    Unknown,
}

impl CommandKind {
    /// Maps a terse or verbose discriminator value.
    pub fn from_discriminator(value: &str) -> Self {
        match value {
            "a" | "add" => Self::Add,
            "u" | "update" => Self::Update,
            "r" | "remove" => Self::Remove,
            "i" | "info" => Self::Info,
            _ => Self::Unknown,
        }
    }
}
