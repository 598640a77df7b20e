use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// A single cell as handed over by a file adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
}

impl CellValue {
    /// Converts adapter text into a value. Whitespace-only text becomes `Empty`;
    /// anything else is kept verbatim.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// Empty cells, whitespace-only text and placeholder tokens such as `N/A`.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                trimmed.is_empty() || is_placeholder_token(&trimmed.to_lowercase())
            }
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(d) => canonical_decimal(*d),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Canonical comparison form, `None` for empty values. Numeric-looking
    /// text compares equal to the matching number.
    pub fn canonical(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let canonical = match self {
            CellValue::Empty => return None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                match parse_numeric_text(trimmed) {
                    Some(number) => canonical_decimal(number),
                    None => trimmed.to_string(),
                }
            }
            CellValue::Number(d) => canonical_decimal(*d),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        };
        Some(canonical)
    }

    pub fn same_value(&self, other: &CellValue) -> bool {
        self.canonical() == other.canonical()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Text(_) => "text",
            CellValue::Number(_) => "number",
            CellValue::Date(_) => "date",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::from_raw(value)
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

/// Declared storage type of a dataset column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Any,
    Text,
    Number,
    Date,
}

impl ColumnType {
    /// Converts `value` so it can be stored in a column of this type.
    pub fn coerce(self, value: &CellValue) -> Result<CellValue> {
        if *value == CellValue::Empty {
            return Ok(CellValue::Empty);
        }
        match (self, value) {
            (ColumnType::Any, v) => Ok(v.clone()),
            (ColumnType::Text, v) => Ok(CellValue::Text(v.as_display())),
            (ColumnType::Number, CellValue::Number(d)) => Ok(CellValue::Number(*d)),
            (ColumnType::Number, CellValue::Text(s)) => {
                if value.is_empty() {
                    return Ok(CellValue::Empty);
                }
                let trimmed = s.trim();
                Decimal::from_str(trimmed)
                    .map(CellValue::Number)
                    .map_err(|_| anyhow!("Failed to parse '{trimmed}' as number"))
            }
            (ColumnType::Date, CellValue::Date(d)) => Ok(CellValue::Date(*d)),
            (ColumnType::Date, CellValue::Text(s)) => {
                if value.is_empty() {
                    return Ok(CellValue::Empty);
                }
                parse_naive_date(s.trim()).map(CellValue::Date)
            }
            (expected, other) => Err(anyhow!(
                "Cannot store {} value '{}' in a {} column",
                other.kind(),
                other,
                expected
            )),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::Any => "any",
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
        };
        f.write_str(label)
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(ColumnType::Any),
            "text" | "string" => Ok(ColumnType::Text),
            "number" | "decimal" | "float" | "integer" => Ok(ColumnType::Number),
            "date" => Ok(ColumnType::Date),
            other => Err(anyhow!("Unknown column type '{other}'")),
        }
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

/// Shortest decimal rendering: trailing fractional zeros removed, `-0` as `0`.
pub fn canonical_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Parses plain decimal text (`-12`, `12.50`). Text with a significant leading
/// zero such as `0123` is an identifier code and yields `None`.
pub fn parse_numeric_text(value: &str) -> Option<Decimal> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if int_part.len() > 1 && int_part.starts_with('0') {
        return None;
    }
    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    Decimal::from_str(value).ok()
}

pub(crate) fn is_placeholder_token(lowered: &str) -> bool {
    let stripped = lowered.trim_start_matches('#');
    matches!(
        stripped,
        "na" | "n/a" | "null" | "none" | "nan" | "brak"
    ) || (!stripped.is_empty() && stripped.chars().all(|c| c == '-'))
}
