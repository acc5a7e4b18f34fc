//! Human-readable number rendering for balances, rates and costs.

use crate::types::Amount;

const SUFFIXES: [&str; 11] = ["K", "M", "B", "T", "Q", "Qt", "Sx", "Sp", "Oc", "No", "Dc"];

/// Abbreviate a magnitude: `999`, `1.5K`, `2.0M`, ...
///
/// Below 1000 the value is truncated toward zero. Above, it is divided by
/// 1000 per suffix tier and shown with one decimal. Values past the last
/// tier keep the last suffix. Non-finite input is rendered as-is.
pub fn format_number(value: Amount) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.abs() < 1000.0 {
        return truncated(value);
    }

    let mut scaled = value;
    let mut tier = 0;
    while scaled.abs() >= 1000.0 && tier < SUFFIXES.len() {
        scaled /= 1000.0;
        tier += 1;
    }
    format!("{scaled:.1}{}", SUFFIXES[tier - 1])
}

/// Full integer with thousands separators: `1,234,567`.
pub fn format_exact(value: Amount) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let digits = truncated(value);
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

fn truncated(value: Amount) -> String {
    let t = value.trunc();
    // trunc(-0.4) is -0.0; show it as plain zero.
    if t == 0.0 {
        return "0".to_string();
    }
    format!("{t:.0}")
}
