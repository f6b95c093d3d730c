//! # Message Decoder
//!
//! Turns one raw write on the command characteristic into a [`Command`].
//!
//! ## Wire generations
//!
//! Two generations of field names are on the air and both stay supported for good:
//!
//! | Meaning | Terse | Verbose |
//! |---------|-------|---------|
//! | discriminator | `t` | `type` |
//! | order id | `o` | `orderId` |
//! | items | `c` | `items` |
//!
//! The terse key wins whenever it is present, whatever its value.
//!
//! ## Recovery
//!
//! Some senders emit broken JSON for info popups. When structured parsing fails the
//! decoder looks for a literal `"content"` key followed by a quoted hex value and,
//! if that decodes, surfaces it as an [`Command::Info`] carrying the text.

use super::command::{Command, CommandKind};
use super::error::DecodeError;
use super::order_number::derive_order_number;
use super::timestamp::parse_display_timestamp;
use crate::codec::{decode_hex, decode_hex_or_plain};
use crate::config::EngineConfig;
use crate::model::OrderId;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Separator placed between item names in a dish summary.
pub const DISH_SEPARATOR: &str = "、";

/// `command` value that carries a clock sync.
pub const DISPLAY_TEST: &str = "display_test";

const TYPE_KEYS: (&str, &str) = ("t", "type");
const ORDER_ID_KEYS: (&str, &str) = ("o", "orderId");
const ITEMS_KEYS: (&str, &str) = ("c", "items");
const CONTENT_KEY: &str = "\"content\"";

/// Stateful decoder. The summary scratch buffer is reused across messages, which
/// is why decoding runs inside the coordinator's decode section.
#[derive(Debug)]
pub struct Decoder {
    max_items: usize,
    message_text_cap: usize,
    item_name_cap: usize,
    max_message_len: usize,
    scratch: String,
}

impl Decoder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_items: config.max_items,
            message_text_cap: config.message_text_cap,
            item_name_cap: config.item_name_cap,
            max_message_len: config.max_message_len,
            scratch: String::with_capacity(512),
        }
    }

    pub fn decode(&mut self, raw: &[u8]) -> Result<Command, DecodeError> {
        if raw.is_empty() || raw.len() >= self.max_message_len {
            return Err(DecodeError::MalformedPayload(format!(
                "invalid message length {}",
                raw.len()
            )));
        }
        debug!(len = raw.len(), payload = %String::from_utf8_lossy(raw), "decoding message");

        let root = match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(root)) => root,
            Ok(_) => return self.recover(raw, "top-level value is not an object".to_string()),
            Err(e) => return self.recover(raw, e.to_string()),
        };

        let discriminator = match field(&root, TYPE_KEYS) {
            Some(Value::String(value)) => value.clone(),
            _ => {
                warn!("missing or invalid type field");
                return Ok(Command::Unknown { discriminator: None });
            }
        };

        match CommandKind::from_discriminator(&discriminator) {
            CommandKind::Info => Ok(self.decode_info(&root)),
            CommandKind::Add => {
                let order_id = order_id(&root)?;
                Ok(Command::Add {
                    number: derive_order_number(order_id.as_str()),
                    dishes: self.dish_summary(&root),
                    order_id,
                })
            }
            CommandKind::Update => {
                let order_id = order_id(&root)?;
                let completed = match root.get("status") {
                    Some(Value::Bool(status)) => *status,
                    Some(other) => {
                        warn!(%order_id, status = %other, "status is not a boolean, treating as edit");
                        false
                    }
                    None => false,
                };
                Ok(Command::Update {
                    number: derive_order_number(order_id.as_str()),
                    dishes: self.dish_summary(&root),
                    completed,
                    order_id,
                })
            }
            CommandKind::Remove => Ok(Command::Remove {
                order_id: order_id(&root)?,
            }),
            CommandKind::Unknown => {
                warn!(discriminator = %discriminator, "unknown message type");
                Ok(Command::Unknown {
                    discriminator: Some(discriminator),
                })
            }
        }
    }

    fn recover(&self, raw: &[u8], reason: String) -> Result<Command, DecodeError> {
        warn!(%reason, "structured parse failed, trying content recovery");
        let text = String::from_utf8_lossy(raw);
        match recover_content(&text, self.message_text_cap) {
            Some(free_text) => {
                debug!(%free_text, "recovered content from malformed payload");
                Ok(Command::Info {
                    command: None,
                    timestamp: None,
                    free_text: Some(free_text),
                })
            }
            None => Err(DecodeError::MalformedPayload(reason)),
        }
    }

    fn decode_info(&self, root: &Map<String, Value>) -> Command {
        let command = root.get("command").and_then(Value::as_str).map(str::to_string);

        let timestamp = match (command.as_deref(), root.get("timestamp")) {
            (Some(DISPLAY_TEST), Some(value)) => timestamp_value(value),
            _ => None,
        };

        let free_text = root
            .get("content")
            .and_then(Value::as_str)
            .map(|content| decode_hex_or_plain(content, self.message_text_cap));

        Command::Info {
            command,
            timestamp,
            free_text,
        }
    }

    /// Joins the decodable item names, or `None` when there are none.
    fn dish_summary(&mut self, root: &Map<String, Value>) -> Option<String> {
        let items = field(root, ITEMS_KEYS)?.as_array()?;

        self.scratch.clear();
        let mut count = 0;
        for item in items {
            if count >= self.max_items {
                warn!(max_items = self.max_items, total = items.len(), "too many items, truncating");
                break;
            }
            let name = match item {
                Value::Object(object) => match object.get("name") {
                    Some(Value::String(name)) => name,
                    _ => continue,
                },
                Value::String(name) => name,
                _ => continue,
            };
            if count > 0 {
                self.scratch.push_str(DISH_SEPARATOR);
            }
            self.scratch.push_str(&decode_hex_or_plain(name, self.item_name_cap));
            count += 1;
        }

        if count == 0 {
            return None;
        }
        debug!(count, "built dish summary");
        Some(self.scratch.clone())
    }
}

/// Looks up the terse key, falling back to the verbose one only when it is absent.
fn field<'a>(root: &'a Map<String, Value>, (terse, verbose): (&str, &str)) -> Option<&'a Value> {
    root.get(terse).or_else(|| root.get(verbose))
}

fn order_id(root: &Map<String, Value>) -> Result<OrderId, DecodeError> {
    match field(root, ORDER_ID_KEYS) {
        Some(Value::String(id)) if !id.is_empty() => Ok(OrderId(id.clone())),
        _ => Err(DecodeError::MissingField("orderId")),
    }
}

fn timestamp_value(value: &Value) -> Option<i64> {
    let millis = match value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|f| f as i64)),
        Value::String(text) => match parse_display_timestamp(text) {
            Ok(millis) => Some(millis),
            Err(e) => {
                warn!(error = %e, "discarding display_test timestamp");
                None
            }
        },
        other => {
            warn!(timestamp = %other, "timestamp is neither number nor string");
            None
        }
    };
    millis.filter(|&ms| {
        let valid = ms > 0;
        if !valid {
            warn!(ms, "discarding non-positive timestamp");
        }
        valid
    })
}

/// Finds `"content"` followed by `:` and a quoted value, and hex-decodes the value.
fn recover_content(text: &str, cap: usize) -> Option<String> {
    let key_end = text.find(CONTENT_KEY)? + CONTENT_KEY.len();
    let rest = &text[key_end..];
    let open = rest.find('"')?;
    if !rest[..open].chars().all(|c| c == ':' || c.is_whitespace()) {
        return None;
    }
    let value = &rest[open + 1..];
    let close = value.find('"')?;
    decode_hex(&value[..close], cap)
}
