//! Stateless value converters shared by the loader, combiner and matcher.
//!
//! None of these functions fail: malformed input either passes through
//! unchanged (season codes) or becomes `None` (money, ages). Scraped data is
//! heterogeneous by default, so a bad cell is never an error here.

use crate::value::Value;

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// Parse a market value string such as `"€1.5m"`, `"€900k"` or `"250,000"`
/// into euros. Returns `None` for empty or non-numeric input (`"free"`, `"-"`).
pub fn parse_monetary_value(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '£' | ','))
        .collect::<String>()
        .trim()
        .to_lowercase();

    let (number, multiplier) = if let Some(n) = cleaned.strip_suffix("bn") {
        (n, 1_000_000_000.0)
    } else if let Some(n) = cleaned.strip_suffix('m') {
        (n, 1_000_000.0)
    } else if let Some(n) = cleaned.strip_suffix('k') {
        (n, 1_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };

    let number = number.trim();
    if number.is_empty() {
        return None;
    }
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n * multiplier)
}

/// Cell-level wrapper: numbers pass through, text is parsed, anything else is null.
pub fn monetary_cell(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(*n),
        Value::Text(s) => parse_monetary_value(s).into(),
        Value::Null => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Seasons
// ---------------------------------------------------------------------------

/// Convert a calendar season (`"2023"`) to compact encoding (`"2324"`).
///
/// Four digits not starting with `20` are taken to be compact already and are
/// returned unchanged, as is anything that is not four ASCII digits.
pub fn convert_season_format(text: &str) -> String {
    if !is_four_digits(text) || !text.starts_with("20") {
        return text.to_string();
    }
    let start: u32 = text[2..4].parse().unwrap_or_default();
    format!("{:02}{:02}", start, (start + 1) % 100)
}

/// Compact season code from any label the sources use: compact (`"2324"`),
/// calendar (`"2023"`) or a range (`"2023-2024"`, `"2023/24"`).
pub fn season_code(label: &str) -> String {
    let label = label.trim();
    if let Some((start, end)) = label.split_once(['-', '/']) {
        let (start, end) = (start.trim(), end.trim());
        if is_four_digits(start) && (is_four_digits(end) || is_two_digits(end)) {
            return format!("{}{}", &start[2..4], &end[end.len() - 2..]);
        }
    }
    convert_season_format(label)
}

fn is_four_digits(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_two_digits(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Join-key form of a player name: lower-cased, trimmed, inner whitespace
/// collapsed to single spaces, full stops removed (`"J. Smith"` and
/// `"j  smith"` both become `"j smith"`).
pub fn normalize_name(text: &str) -> String {
    text.to_lowercase()
        .replace('.', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Statistics exports use padded, space-separated headers; columns are
/// addressed as `Per_90_Minutes` style identifiers downstream.
pub fn clean_header(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

// ---------------------------------------------------------------------------
// Ages
// ---------------------------------------------------------------------------

/// Whole years from `"24"`, `"24.0"` or the statistics site's `"24-123"`
/// (years-days) format.
pub fn parse_age(text: &str) -> Option<i64> {
    let text = text.trim();
    let years = text.split_once('-').map(|(y, _)| y).unwrap_or(text).trim();
    years
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.trunc() as i64)
}

// ---------------------------------------------------------------------------
// Literal cells
// ---------------------------------------------------------------------------

/// Parse a tuple or list literal of quoted strings, as the valuation scraper
/// writes them: `('Javi Guerra', 'Central Midfield')`, `['Spain', 'Morocco']`.
/// Returns `None` for anything else.
pub fn parse_string_literals(text: &str) -> Option<Vec<String>> {
    let s = text.trim();
    let inner = s
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .or_else(|| s.strip_prefix('[').and_then(|s| s.strip_suffix(']')))?;

    let mut out = Vec::new();
    let mut chars = inner.chars();
    loop {
        let quote = loop {
            match chars.next() {
                None => return Some(out),
                Some(c) if c.is_whitespace() || c == ',' => continue,
                Some(c @ ('\'' | '"')) => break c,
                Some(_) => return None,
            }
        };
        let mut item = String::new();
        loop {
            match chars.next() {
                None => return None,
                Some('\\') => item.push(chars.next()?),
                Some(c) if c == quote => break,
                Some(c) => item.push(c),
            }
        }
        out.push(item);
    }
}
