//! Element-reference keys and image-element detection.

use serde_json::{Map, Value};

use crate::dialect::Dialect;

/// Element-reference key used by the JSON Wire Protocol.
pub const JWP_ELEMENT_KEY: &str = "ELEMENT";

/// Element-reference key mandated by W3C WebDriver.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Prefix of element ids minted by the image-matching subsystem.
pub const IMAGE_ELEMENT_PREFIX: &str = "appium-image-element-";

/// Returns a copy of `value` with every object key `from` renamed to `to`.
///
/// The walk is recursive through objects and arrays. When an object already
/// holds `to`, the existing entry is kept and `from` is dropped.
#[must_use]
pub fn rename_key(value: &Value, from: &str, to: &str) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rename_key(item, from, to))
                .collect(),
        ),
        Value::Object(map) => {
            let mut renamed = Map::with_capacity(map.len());
            for (key, item) in map {
                let item = rename_key(item, from, to);
                if key == from {
                    if !map.contains_key(to) {
                        renamed.insert(to.to_owned(), item);
                    }
                } else {
                    renamed.insert(key.clone(), item);
                }
            }
            Value::Object(renamed)
        }
        other => other.clone(),
    }
}

/// Rewrites element references in `value` to `dialect`'s key.
///
/// The output never carries both keys.
#[must_use]
pub fn to_dialect(value: &Value, dialect: Dialect) -> Value {
    match dialect {
        Dialect::Jwp => rename_key(value, W3C_ELEMENT_KEY, JWP_ELEMENT_KEY),
        Dialect::W3c => rename_key(value, JWP_ELEMENT_KEY, W3C_ELEMENT_KEY),
    }
}

fn is_image_element_id(id: &str) -> bool {
    id.len() > IMAGE_ELEMENT_PREFIX.len() && id.starts_with(IMAGE_ELEMENT_PREFIX)
}

/// Whether a request path addresses an image element.
///
/// Matches an `element` or `screenshot` segment followed by an image element id.
#[must_use]
pub fn path_has_image_element(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    segments.windows(2).any(|pair| {
        matches!(pair[0], "element" | "screenshot") && is_image_element_id(pair[1])
    })
}

/// Whether any element reference in `body` is an image element.
#[must_use]
pub fn body_has_image_element(body: &Value) -> bool {
    match body {
        Value::Array(items) => items.iter().any(body_has_image_element),
        Value::Object(map) => map.iter().any(|(key, item)| {
            let is_reference = (key == JWP_ELEMENT_KEY || key == W3C_ELEMENT_KEY)
                && item.as_str().is_some_and(is_image_element_id);
            is_reference || body_has_image_element(item)
        }),
        _ => false,
    }
}
