//! Display-number derivation.
//!
//! The number shown on the ticket is squeezed out of the order identifier. The
//! mapping is lossy and collisions are expected, so it must never be used to find
//! an order.

use tracing::warn;

pub const DEFAULT_ORDER_NUMBER: u32 = 1;
pub const MAX_ORDER_NUMBER: u32 = 999_999;

/// Derives the display number for `order_id`.
///
/// Tries the last four characters first (ids usually end in a zero-padded
/// counter), then the whole id. Parsing is prefix-based: leading digits count,
/// the first non-digit stops the scan. Anything outside `1..=999_999` becomes
/// [`DEFAULT_ORDER_NUMBER`].
pub fn derive_order_number(order_id: &str) -> u32 {
    let chars: Vec<char> = order_id.chars().collect();
    if chars.is_empty() {
        warn!("empty order id, using default order number");
        return DEFAULT_ORDER_NUMBER;
    }

    let parsed = if chars.len() > 4 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        match leading_integer(&tail) {
            n if n > 0 => n,
            _ => leading_integer(order_id),
        }
    } else {
        leading_integer(order_id)
    };

    match u32::try_from(parsed) {
        Ok(n) if (1..=MAX_ORDER_NUMBER).contains(&n) => n,
        _ => {
            warn!(order_id, parsed, "order number out of range, using default");
            DEFAULT_ORDER_NUMBER
        }
    }
}

/// Parses an optionally signed run of leading decimal digits, 0 if there is none.
fn leading_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_trailing_counter() {
        assert_eq!(derive_order_number("order_0005"), 5);
        assert_eq!(derive_order_number("ORD12345"), 2345);
    }

    #[test]
    fn short_ids_parse_whole() {
        assert_eq!(derive_order_number("42"), 42);
        assert_eq!(derive_order_number("7"), 7);
    }

    #[test]
    fn non_numeric_falls_back_to_default() {
        assert_eq!(derive_order_number("xyz"), 1);
        assert_eq!(derive_order_number(""), 1);
        assert_eq!(derive_order_number("A-0000"), 1);
    }

    #[test]
    fn zero_tail_retries_whole_id() {
        // "0000" parses to 0, the whole id "120000" parses to 120000.
        assert_eq!(derive_order_number("120000"), 120_000);
    }

    #[test]
    fn out_of_range_is_clamped_to_default() {
        assert_eq!(derive_order_number("1000000"), 1);
        assert_eq!(derive_order_number("-5"), 1);
    }

    #[test]
    fn tail_is_counted_in_characters() {
        assert_eq!(derive_order_number("订单0012"), 12);
    }
}
