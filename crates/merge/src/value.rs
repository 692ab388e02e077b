use std::fmt;

use serde::Serialize;

/// A single table cell. Scraped inputs arrive as text; the engine only
/// produces numbers for fields it parses itself (market value, age).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    /// Build a cell from raw CSV text. Empty (or whitespace-only) cells are null.
    pub fn from_field(field: &str) -> Self {
        if field.trim().is_empty() {
            Self::Null
        } else {
            Self::Text(field.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text used for keys, sorting and output. Null renders as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Whole numbers print without a fractional part (`1500000`, not `1500000.0`).
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_null() {
        assert_eq!(Value::from_field(""), Value::Null);
        assert_eq!(Value::from_field("   "), Value::Null);
        assert_eq!(Value::from_field("Pedri"), Value::Text("Pedri".into()));
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(Value::Number(1_500_000.0).to_text(), "1500000");
        assert_eq!(Value::Number(0.25).to_text(), "0.25");
        assert_eq!(Value::Null.to_text(), "");
    }

    #[test]
    fn serializes_untagged() {
        let cells = vec![Value::Null, Value::from("x"), Value::Number(2.0)];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"[null,"x",2.0]"#);
    }
}
