//! Price normalization: strip the rupee display prefix, then require a plain
//! decimal amount.

use super::schema::StructuredEvent;
use super::ValidationErrorKind;
use crate::event::ValidatedEvent;

/// Display prefix the feed puts in front of prices.
pub const CURRENCY_PREFIX: &str = "₹ ";

/// Remove every leading occurrence of [`CURRENCY_PREFIX`]. Idempotent.
pub fn strip_currency_prefix(price: &str) -> &str {
    price.trim_start_matches(CURRENCY_PREFIX)
}

/// `digits` or `digits.digits`, nothing else.
pub fn is_well_formed_amount(s: &str) -> bool {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (s, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && frac.map_or(true, all_digits)
}

fn clean_price(field: &'static str, raw: String) -> Result<String, ValidationErrorKind> {
    let cleaned = strip_currency_prefix(&raw);
    if is_well_formed_amount(cleaned) {
        Ok(cleaned.to_string())
    } else {
        Err(ValidationErrorKind::MalformedPrice { field, value: raw })
    }
}

/// Clean both price fields of a structurally valid record.
pub fn normalize(structured: StructuredEvent) -> Result<ValidatedEvent, ValidationErrorKind> {
    let mut event = structured.0;
    event.yes_price = clean_price("yes_price", event.yes_price)?;
    event.no_price = clean_price("no_price", event.no_price)?;
    Ok(event)
}
