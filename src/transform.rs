//! Value transformations applied to a source cell before it is diffed
//! against the target.

use std::{borrow::Cow, str::FromStr, sync::OnceLock};

use anyhow::{Result, anyhow};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Trim,
    Upper,
    Lower,
    Title,
    NormalizeSpaces,
    RemoveNewlines,
    RemoveHtml,
    ExtractDigits,
    ExtractDecimal,
    /// Round to the given number of decimal places.
    Round(u32),
    /// Keep at most this many characters.
    Truncate(usize),
}

static HTML_TAG: OnceLock<Regex> = OnceLock::new();

fn html_tag() -> &'static Regex {
    HTML_TAG.get_or_init(|| Regex::new(r"<[^<]+?>").expect("static HTML tag pattern"))
}

impl Transform {
    pub fn apply(self, value: &CellValue) -> Result<CellValue> {
        if value.is_empty() {
            return Ok(value.clone());
        }
        if let Transform::Round(places) = self {
            let number = match value {
                CellValue::Number(number) => *number,
                other => {
                    let display = other.as_display();
                    let candidate = display.trim().replace(',', ".");
                    Decimal::from_str(&candidate)
                        .map_err(|_| anyhow!("Cannot round non-numeric value '{display}'"))?
                }
            };
            return Ok(CellValue::Number(number.round_dp(places)));
        }

        let display = value.as_display();
        let transformed: Cow<'_, str> = match self {
            Transform::Trim => Cow::Borrowed(display.trim()),
            Transform::Upper => Cow::Owned(display.to_uppercase()),
            Transform::Lower => Cow::Owned(display.to_lowercase()),
            Transform::Title => Cow::Owned(title_case(&display)),
            Transform::NormalizeSpaces => {
                Cow::Owned(display.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            Transform::RemoveNewlines => Cow::Owned(display.replace('\n', " ").replace('\r', "")),
            Transform::RemoveHtml => html_tag().replace_all(&display, ""),
            Transform::ExtractDigits => {
                Cow::Owned(display.chars().filter(char::is_ascii_digit).collect())
            }
            Transform::ExtractDecimal => Cow::Owned(
                display
                    .chars()
                    .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
                    .map(|c| if c == ',' { '.' } else { c })
                    .collect(),
            ),
            Transform::Truncate(limit) => match display.char_indices().nth(limit) {
                Some((byte_idx, _)) => Cow::Borrowed(&display[..byte_idx]),
                None => Cow::Borrowed(display.as_str()),
            },
            Transform::Round(_) => unreachable!("handled above"),
        };
        Ok(CellValue::from_raw(&transformed))
    }
}

fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                output.extend(ch.to_uppercase());
            } else {
                output.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            output.push(ch);
            at_word_start = true;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(transform: Transform, raw: &str) -> CellValue {
        transform.apply(&CellValue::text(raw)).expect("transform")
    }

    #[test]
    fn text_transforms_rewrite_values() {
        assert_eq!(apply(Transform::Trim, "  a b "), CellValue::text("a b"));
        assert_eq!(apply(Transform::Upper, "abc"), CellValue::text("ABC"));
        assert_eq!(apply(Transform::Title, "blue SHIRT-xl"), CellValue::text("Blue Shirt-Xl"));
        assert_eq!(
            apply(Transform::NormalizeSpaces, "a   b\tc"),
            CellValue::text("a b c")
        );
        assert_eq!(
            apply(Transform::RemoveNewlines, "line1\r\nline2"),
            CellValue::text("line1 line2")
        );
    }

    #[test]
    fn remove_html_strips_tags() {
        assert_eq!(
            apply(Transform::RemoveHtml, "<p>Soft <b>cotton</b></p>"),
            CellValue::text("Soft cotton")
        );
    }

    #[test]
    fn extract_transforms_keep_numeric_characters() {
        assert_eq!(apply(Transform::ExtractDigits, "EAN: 590-123"), CellValue::text("590123"));
        assert_eq!(apply(Transform::ExtractDecimal, "12,50 zł"), CellValue::text("12.50"));
        assert_eq!(apply(Transform::ExtractDigits, "no digits"), CellValue::Empty);
    }

    #[test]
    fn round_produces_numbers() {
        assert_eq!(
            apply(Transform::Round(1), "12,46"),
            CellValue::Number(Decimal::new(125, 1))
        );
        assert!(Transform::Round(2).apply(&CellValue::text("abc")).is_err());
    }

    #[test]
    fn truncate_respects_character_boundaries() {
        assert_eq!(apply(Transform::Truncate(3), "żółw!"), CellValue::text("żół"));
        assert_eq!(apply(Transform::Truncate(10), "short"), CellValue::text("short"));
    }

    #[test]
    fn empty_values_pass_through() {
        assert_eq!(Transform::Upper.apply(&CellValue::Empty).unwrap(), CellValue::Empty);
    }

    #[test]
    fn transforms_serialize_as_stable_names() {
        assert_eq!(serde_yaml::to_string(&Transform::Trim).unwrap().trim(), "trim");
        let parsed: Transform = serde_yaml::from_str("round: 2").unwrap();
        assert_eq!(parsed, Transform::Round(2));
    }
}
