//! Lenient field decoders for content-store JSON.
//!
//! The store writes `false`, `null`, `""` or a number where a text field or an
//! image is unset, and repeaters come back as `false` when empty. These
//! helpers accept any JSON value and map what they cannot use to "absent",
//! so a sloppy field never fails the whole post.

use super::model::ImageRef;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Text field: strings as-is, numbers stringified, anything else absent.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_from_value(Value::deserialize(deserializer)?))
}

fn text_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Optional image: anything that is not a usable image reference is absent.
pub(crate) fn image<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ImageRef::from_value(Value::deserialize(deserializer)?))
}

/// Repeater field: non-arrays are empty, undecodable rows are skipped.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(rows) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping undecodable repeater row");
                None
            }
        })
        .collect())
}
