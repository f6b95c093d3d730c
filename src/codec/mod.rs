//! Text codecs used by the wire protocol.

pub mod hex;

pub use self::hex::{decode_hex, decode_hex_or_plain, encode_hex, ITEM_NAME_CAP, MESSAGE_TEXT_CAP};
