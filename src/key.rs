//! Business key normalization.
//!
//! Raw key cells are canonicalized before any equality test so that `"A1"`,
//! `" a1 "`, `123`, `"123"` and `"123.0"` land on the same [`Key`] where they
//! should. Missing values collapse into [`EMPTY_KEY`], which never matches
//! anything, itself included.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{CellValue, canonical_decimal, is_placeholder_token, parse_numeric_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyOptions {
    pub case_insensitive: bool,
    pub strip_leading_zeros: bool,
    pub treat_placeholders_as_empty: bool,
}

impl Default for KeyOptions {
    fn default() -> Self {
        KeyOptions {
            case_insensitive: true,
            strip_leading_zeros: false,
            treat_placeholders_as_empty: true,
        }
    }
}

/// Normalized, comparable key tuple.
///
/// `Key::Empty == Key::Empty` holds structurally so keys can be compared and
/// sorted, but [`Key::matches`] is the only test used for row correspondence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    Empty,
    Value(Vec<String>),
}

pub const EMPTY_KEY: Key = Key::Empty;

impl Key {
    pub fn is_empty(&self) -> bool {
        matches!(self, Key::Empty)
    }

    pub fn matches(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Value(left), Key::Value(right)) => left == right,
            _ => false,
        }
    }

    pub fn parts(&self) -> &[String] {
        match self {
            Key::Empty => &[],
            Key::Value(parts) => parts,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Empty => f.write_str("<empty>"),
            Key::Value(parts) => f.write_str(&parts.join(" | ")),
        }
    }
}

/// Canonical text for one key cell; `None` stands for a missing value.
pub fn normalize_text(value: &CellValue, options: &KeyOptions) -> Option<String> {
    let raw = match value {
        CellValue::Empty => return None,
        CellValue::Number(number) => return Some(canonical_decimal(*number)),
        CellValue::Date(date) => return Some(date.format("%Y-%m-%d").to_string()),
        CellValue::Text(raw) => raw,
    };

    let mut text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    if options.strip_leading_zeros {
        // Zero-only leading tokens go too, so "00 0 5" and "5" agree.
        let stripped = text.trim_start_matches(|c: char| c == '0' || c == ' ');
        text = if stripped.is_empty() || stripped.starts_with('.') {
            format!("0{stripped}")
        } else {
            stripped.to_string()
        };
    }

    if options.treat_placeholders_as_empty && is_placeholder_token(&text.to_lowercase()) {
        return None;
    }
    if let Some(number) = parse_numeric_text(&text) {
        return Some(canonical_decimal(number));
    }
    if options.case_insensitive {
        text = text.to_lowercase();
    }
    Some(text)
}

/// Builds the key for a row from its key cells. A composite key with any
/// missing part is [`EMPTY_KEY`].
pub fn normalize(raw_values: &[CellValue], options: &KeyOptions) -> Key {
    if raw_values.is_empty() {
        return EMPTY_KEY;
    }
    let mut parts = Vec::with_capacity(raw_values.len());
    for value in raw_values {
        match normalize_text(value, options) {
            Some(part) => parts.push(part),
            None => return EMPTY_KEY,
        }
    }
    Key::Value(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn key(values: &[&str]) -> Key {
        let cells = values.iter().map(|v| CellValue::from_raw(v)).collect::<Vec<_>>();
        normalize(&cells, &KeyOptions::default())
    }

    #[test]
    fn numeric_spellings_collapse_to_one_key() {
        let from_number = normalize(&[CellValue::Number(Decimal::new(123, 0))], &KeyOptions::default());
        assert_eq!(key(&["123"]), from_number);
        assert_eq!(key(&["123.0"]), from_number);
        assert_eq!(key(&[" 123.00 "]), from_number);
    }

    #[test]
    fn text_keys_are_trimmed_and_case_folded() {
        assert!(key(&["A1"]).matches(&key(&["a1 "])));
        assert!(key(&["Blue  Shirt"]).matches(&key(&["blue shirt"])));
    }

    #[test]
    fn case_sensitive_option_keeps_case() {
        let options = KeyOptions {
            case_insensitive: false,
            ..KeyOptions::default()
        };
        let upper = normalize(&[CellValue::text("A1")], &options);
        let lower = normalize(&[CellValue::text("a1")], &options);
        assert!(!upper.matches(&lower));
    }

    #[test]
    fn leading_zero_codes_stay_distinct_unless_stripped() {
        assert!(!key(&["00123"]).matches(&key(&["123"])));
        let options = KeyOptions {
            strip_leading_zeros: true,
            ..KeyOptions::default()
        };
        let padded = normalize(&[CellValue::text("00123")], &options);
        let plain = normalize(&[CellValue::text("123")], &options);
        assert!(padded.matches(&plain));
        assert_eq!(
            normalize_text(&CellValue::text("000"), &options).as_deref(),
            Some("0")
        );
    }

    #[test]
    fn zero_tokens_are_stripped_with_the_leading_zeros() {
        let options = KeyOptions {
            strip_leading_zeros: true,
            ..KeyOptions::default()
        };
        let once = normalize_text(&CellValue::text("00 0 5"), &options);
        assert_eq!(once.as_deref(), Some("5"));
        let twice = normalize_text(&CellValue::text(once.unwrap_or_default()), &options);
        assert_eq!(twice.as_deref(), Some("5"));
        assert_eq!(
            normalize_text(&CellValue::text(" 0  0 ab "), &options).as_deref(),
            Some("ab")
        );
    }

    #[test]
    fn empty_and_placeholder_keys_never_match() {
        assert_eq!(key(&[""]), EMPTY_KEY);
        assert_eq!(key(&["N/A"]), EMPTY_KEY);
        assert!(!key(&[""]).matches(&key(&[""])));
        assert!(!EMPTY_KEY.matches(&EMPTY_KEY));
    }

    #[test]
    fn placeholders_can_be_kept_as_values() {
        let options = KeyOptions {
            treat_placeholders_as_empty: false,
            ..KeyOptions::default()
        };
        assert_eq!(
            normalize_text(&CellValue::text("N/A"), &options).as_deref(),
            Some("n/a")
        );
    }

    #[test]
    fn composite_key_with_missing_part_is_empty() {
        assert_eq!(key(&["A1", ""]), EMPTY_KEY);
        assert_eq!(
            key(&["A1", "Warsaw"]),
            Key::Value(vec!["a1".to_string(), "warsaw".to_string()])
        );
    }

    fn raw_key_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[ ]{0,2}[A-Za-z0-9]{1,6}( [A-Za-z]{1,3})?[ ]{0,2}",
            "-?[1-9][0-9]{0,5}(\\.[0-9]{1,3})?",
            "0{0,3}[0-9]{1,4}",
            "0{1,3}( 0{0,2}){0,2} [0-9a-z.]{1,3}",
            Just(String::new()),
            Just("N/A".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in raw_key_strategy(), strip in any::<bool>(), fold in any::<bool>()) {
            let options = KeyOptions {
                case_insensitive: fold,
                strip_leading_zeros: strip,
                treat_placeholders_as_empty: true,
            };
            let value = CellValue::from_raw(&raw);
            let once = normalize(std::slice::from_ref(&value), &options);
            let renormalized = match normalize_text(&value, &options) {
                Some(text) => normalize(&[CellValue::Text(text)], &options),
                None => normalize(&[CellValue::Empty], &options),
            };
            prop_assert_eq!(once, renormalized);
        }

        #[test]
        fn equal_keys_match_symmetrically(left in raw_key_strategy(), right in raw_key_strategy()) {
            let a = key(&[left.as_str()]);
            let b = key(&[right.as_str()]);
            if !a.is_empty() && a == b {
                prop_assert!(a.matches(&b));
                prop_assert!(b.matches(&a));
            }
            prop_assert_eq!(a.matches(&b), b.matches(&a));
        }
    }
}
