//! Field decoders for payloads coming straight from browser forms, where
//! numbers routinely arrive as strings and untouched inputs as `""`.

use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Identifier {
    Text(String),
    Number(serde_json::Number),
}

fn parse_number<E: serde::de::Error>(text: &str) -> Result<Option<f64>, E> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| E::custom(format!("invalid number {text:?}")))
}

/// A number or a numeric string. Blank text reads as zero.
pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => Ok(parse_number::<D::Error>(&text)?.unwrap_or(0.0)),
    }
}

/// Like [`number`], but `null` and blank text read as absent.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(text)) => parse_number::<D::Error>(&text),
    }
}

/// Text that may have been sent as a bare number (phone numbers, mostly).
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Identifier>::deserialize(deserializer)?.map(|value| match value {
        Identifier::Text(text) => text,
        Identifier::Number(number) => number.to_string(),
    }))
}

/// String or integer identifier, kept as text.
pub fn identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_text(deserializer)?.unwrap_or_default())
}

/// `YYYY-MM-DD`; an unset date input (`""`) reads as absent.
pub fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(Some)
        .map_err(|err| D::Error::custom(format!("invalid date {text:?}: {err}")))
}
