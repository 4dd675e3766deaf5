//! Identifier normalization.
//!
//! Identifiers arrive from URL path segments and from remote JSON with
//! inconsistent casing and whitespace. Both sides pass through this module
//! before they are ever compared.

use serde_json::Value;

/// Canonicalizes a raw identifier: surrounding whitespace is trimmed and every
/// character is lowercased.
///
/// # Examples
///
/// ```
/// use qr_catalog::catalog::normalize;
///
/// assert_eq!(normalize("  A1B2-C3 \n"), "a1b2-c3");
/// assert_eq!(normalize(&normalize(" X ")), normalize(" X "));
/// ```
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalizes an identifier taken from a JSON document.
///
/// Anything other than a JSON string (including `null` and numbers) yields
/// the empty string.
pub fn normalize_value(raw: &Value) -> String {
    match raw {
        Value::String(s) => normalize(s),
        _ => String::new(),
    }
}
