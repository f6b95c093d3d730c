//! # Hex Payload Codec
//!
//! Senders may hex-encode any free-text field (dish names, info content) so that
//! multi-byte text survives transports that mangle non-ASCII bytes. Whether a
//! field is encoded is never signalled on the wire, so decoding is opportunistic:
//! [`decode_hex`] answers `None` for anything that is not a clean hex string and
//! the caller keeps the text as it arrived.
//!
//! Decoded output is capped at a caller-supplied byte budget. Overlong payloads are
//! cut silently rather than rejected.

/// Byte budget for decoded message text (info popups, recovered content).
pub const MESSAGE_TEXT_CAP: usize = 256;

/// Byte budget for a single decoded item name.
pub const ITEM_NAME_CAP: usize = 128;

/// Decodes `text` as hex into UTF-8 text of at most `max_len` bytes.
///
/// Returns `None` when the input is empty, has odd length, contains a non-hex
/// character, or decodes to bytes that are not UTF-8 text. A multi-byte character
/// split by the `max_len` cut is dropped whole.
pub fn decode_hex(text: &str, max_len: usize) -> Option<String> {
    if text.is_empty() || text.len() % 2 != 0 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let mut bytes = hex::decode(text).ok()?;
    let truncated = bytes.len() > max_len;
    bytes.truncate(max_len);

    let decoded = match String::from_utf8(bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            let utf8 = err.utf8_error();
            // Only a sequence left incomplete by our own cut is recoverable.
            if !truncated || utf8.error_len().is_some() {
                return None;
            }
            let valid = utf8.valid_up_to();
            let mut bytes = err.into_bytes();
            bytes.truncate(valid);
            String::from_utf8(bytes).ok()?
        }
    };

    (!decoded.is_empty()).then_some(decoded)
}

/// Decodes `text` when it is hex, otherwise returns it unchanged.
pub fn decode_hex_or_plain(text: &str, max_len: usize) -> String {
    decode_hex(text, max_len).unwrap_or_else(|| text.to_string())
}

/// Lowercase hex encoding of the UTF-8 bytes of `text`.
pub fn encode_hex(text: &str) -> String {
    hex::encode(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_upper_and_lower_case() {
        assert_eq!(decode_hex("48656c6c6f", 256).as_deref(), Some("Hello"));
        assert_eq!(decode_hex("48656C6C6F", 256).as_deref(), Some("Hello"));
    }

    #[test]
    fn decodes_multibyte_text() {
        // "宫保鸡丁"
        let encoded = encode_hex("宫保鸡丁");
        assert_eq!(decode_hex(&encoded, ITEM_NAME_CAP).as_deref(), Some("宫保鸡丁"));
    }

    #[test]
    fn rejects_non_hex_input() {
        assert_eq!(decode_hex("", 256), None);
        assert_eq!(decode_hex("abc", 256), None);
        assert_eq!(decode_hex("zz", 256), None);
        assert_eq!(decode_hex("Fried rice", 256), None);
    }

    #[test]
    fn rejects_bytes_that_are_not_text() {
        // 0xCA 0xFE is not valid UTF-8; the caller should keep "cafe" as typed.
        assert_eq!(decode_hex("cafe", 256), None);
        assert_eq!(decode_hex_or_plain("cafe", 256), "cafe");
    }

    #[test]
    fn truncates_to_budget() {
        let encoded = encode_hex("abcdefgh");
        assert_eq!(decode_hex(&encoded, 3).as_deref(), Some("abc"));
    }

    #[test]
    fn truncation_drops_split_character() {
        // "a" + "宫" (3 bytes); a 2-byte budget keeps only "a".
        let encoded = encode_hex("a宫");
        assert_eq!(decode_hex(&encoded, 2).as_deref(), Some("a"));
    }

    #[test]
    fn plain_fallback_keeps_text() {
        assert_eq!(decode_hex_or_plain("Noodles", 128), "Noodles");
        assert_eq!(decode_hex_or_plain("4e6f6f646c6573", 128), "Noodles");
    }

    proptest! {
        #[test]
        fn round_trips_text_within_budget(s in "\\PC{1,60}") {
            let encoded = encode_hex(&s);
            prop_assert_eq!(decode_hex(&encoded, MESSAGE_TEXT_CAP), Some(s));
        }
    }
}
