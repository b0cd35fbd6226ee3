//! Currency Normalizer - Brazilian money notation
//!
//! Turns free-form amounts into `1.234,56` form. Input that already carries a
//! comma is trusted as-is; input that cannot be read is returned untouched.

/// Format a raw amount as dot-grouped thousands with a two-digit comma decimal.
///
/// `"1500"` becomes `"1.500,00"`, `"1500.5"` becomes `"1.500,50"`. Anything
/// containing a comma after stripping is returned stripped but otherwise
/// unchanged; unreadable input comes back verbatim.
pub fn format_currency(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    // Already comma-decimal. Not validated further.
    if clean.contains(',') {
        return clean;
    }

    if clean.contains('.') {
        let parts: Vec<&str> = clean.split('.').collect();
        if let [integer, fraction] = parts.as_slice() {
            if fraction.len() <= 2 {
                return format!("{},{:0<2}", group_thousands(integer), fraction);
            }
        }
    }

    if !clean.is_empty() && clean.chars().all(|c| c.is_ascii_digit()) {
        return format!("{},00", group_thousands(&clean));
    }

    raw.to_string()
}

/// Insert a dot every three digits from the right. Leading zeros are dropped,
/// an empty or all-zero input yields `"0"`.
fn group_thousands(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };

    let len = trimmed.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in trimmed.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
