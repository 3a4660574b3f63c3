//! Payload and URL translation for proxied commands.
//!
//! The client speaks one dialect and the backend may speak the other. Most
//! commands only need element references renamed; a handful changed shape or
//! URL between the two protocols and are rewritten here. A conversion may fan
//! one inbound command out into several downstream calls.

use serde_json::{Map, Value, json};
use wdrelay_protocol::params::prepare_body;
use wdrelay_protocol::{Dialect, RouteTable, element};

const W3C_TIMEOUT_KEYS: [(&str, &str); 3] = [
    ("script", "script"),
    ("pageLoad", "page load"),
    ("implicit", "implicit"),
];

/// One request to send downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamCall {
    /// Inbound-relative or absolute URL, before session rewriting.
    pub url: String,
    /// Body to send.
    pub body: Option<Value>,
}

/// Ordered downstream calls for one inbound command.
///
/// Calls run in order and the sequence stops at the first response with an
/// HTTP status of 400 or above; the last response received is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    calls: Vec<DownstreamCall>,
}

impl ConversionPlan {
    /// A plan forwarding one call.
    pub fn single(url: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            calls: vec![DownstreamCall {
                url: url.into(),
                body,
            }],
        }
    }

    /// Planned calls in order.
    #[must_use]
    pub fn calls(&self) -> &[DownstreamCall] {
        &self.calls
    }

    /// Number of planned calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Whether the plan issues no calls.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

impl IntoIterator for ConversionPlan {
    type Item = DownstreamCall;
    type IntoIter = std::vec::IntoIter<DownstreamCall>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.into_iter()
    }
}

/// Translates commands into the backend's dialect.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolConverter {
    downstream: Option<Dialect>,
    routes: RouteTable,
}

impl ProtocolConverter {
    /// Converter targeting a backend that speaks `downstream`.
    ///
    /// With no known dialect only wrap/unwrap rules apply.
    #[must_use]
    pub const fn new(downstream: Option<Dialect>) -> Self {
        Self {
            downstream,
            routes: RouteTable::standard(),
        }
    }

    /// Uses `routes` to find each command's body schema.
    #[must_use]
    pub const fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Backend dialect.
    #[must_use]
    pub const fn downstream(&self) -> Option<Dialect> {
        self.downstream
    }

    /// Plans the downstream calls for `command` sent to `url` with `body`.
    #[must_use]
    pub fn plan(&self, command: &str, url: &str, body: Option<Value>) -> ConversionPlan {
        let body = body.map(|body| match self.routes.spec_for(command) {
            Some(spec) => prepare_body(&spec.payload, body),
            None => body,
        });
        let Some(dialect) = self.downstream else {
            return ConversionPlan::single(url, body);
        };
        let body = body.map(|body| element::to_dialect(&body, dialect));
        match (command, body) {
            ("timeouts", Some(body)) => timeouts_plan(url, body, dialect),
            ("setWindow", Some(body)) => ConversionPlan::single(url, Some(set_window_body(body))),
            ("setValue", Some(body)) => ConversionPlan::single(url, Some(set_value_body(body))),
            (_, body) => ConversionPlan::single(rewrite_url(command, url, dialect), body),
        }
    }
}

fn timeouts_plan(url: &str, body: Value, dialect: Dialect) -> ConversionPlan {
    let Value::Object(map) = body else {
        return ConversionPlan::single(url, Some(body));
    };
    match dialect {
        Dialect::W3c => {
            let kind = map.get("type").and_then(Value::as_str);
            let ms = map.get("ms").filter(|ms| !ms.is_null());
            let (Some(kind), Some(ms)) = (kind, ms) else {
                return ConversionPlan::single(url, Some(Value::Object(map)));
            };
            let key = if kind == "page load" { "pageLoad" } else { kind };
            ConversionPlan::single(url, Some(json!({ key: ms })))
        }
        Dialect::Jwp => {
            let calls: Vec<DownstreamCall> = W3C_TIMEOUT_KEYS
                .iter()
                .filter_map(|(key, kind)| {
                    let ms = map.get(*key).filter(|ms| ms.is_number())?;
                    Some(DownstreamCall {
                        url: url.to_owned(),
                        body: Some(json!({ "type": kind, "ms": ms })),
                    })
                })
                .collect();
            if calls.is_empty() {
                ConversionPlan::single(url, Some(Value::Object(map)))
            } else {
                ConversionPlan { calls }
            }
        }
    }
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !value.is_null())
}

fn set_window_body(body: Value) -> Value {
    let Value::Object(mut map) = body else {
        return body;
    };
    if let Some(handle) = present(&map, "handle").or_else(|| present(&map, "name")).cloned() {
        map.entry("handle").or_insert_with(|| handle.clone());
        map.entry("name").or_insert(handle);
    }
    Value::Object(map)
}

fn set_value_body(body: Value) -> Value {
    let Value::Object(mut map) = body else {
        return body;
    };
    let text = match (present(&map, "text"), present(&map, "value")) {
        (Some(_), _) | (None, None) => None,
        (None, Some(Value::Array(keys))) => Some(
            keys.iter()
                .map(|key| match key {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<String>(),
        ),
        (None, Some(Value::String(text))) => Some(text.clone()),
        (None, Some(other)) => Some(other.to_string()),
    };
    if let Some(text) = text {
        map.insert("text".to_owned(), Value::String(text));
    }
    let value = match (present(&map, "value"), present(&map, "text")) {
        (None, Some(Value::String(text))) => Some(
            text.chars()
                .map(|character| Value::String(character.to_string()))
                .collect::<Vec<_>>(),
        ),
        _ => None,
    };
    if let Some(value) = value {
        map.insert("value".to_owned(), Value::Array(value));
    }
    Value::Object(map)
}

fn rewrite_url(command: &str, url: &str, dialect: Dialect) -> String {
    let rewritten = match command {
        "execute" | "executeAsync" => rewrite_execute(url, dialect),
        "getElementScreenshot" => rewrite_element_screenshot(url, dialect),
        "getWindowHandle" | "getWindowHandles" => rewrite_window_handles(url, dialect),
        _ => None,
    };
    rewritten.unwrap_or_else(|| url.to_owned())
}

fn rewrite_execute(url: &str, dialect: Dialect) -> Option<String> {
    let position = url.find("/execute")?;
    let (prefix, endpoint) = url.split_at(position);
    let is_async = endpoint.contains("async");
    let target = match (dialect, is_async) {
        (Dialect::Jwp, false) => "/execute",
        (Dialect::Jwp, true) => "/execute_async",
        (Dialect::W3c, false) => "/execute/sync",
        (Dialect::W3c, true) => "/execute/async",
    };
    Some(format!("{prefix}{target}"))
}

fn rewrite_element_screenshot(url: &str, dialect: Dialect) -> Option<String> {
    match dialect {
        Dialect::Jwp => {
            let (rest, id) = url.strip_suffix("/screenshot")?.rsplit_once('/')?;
            let prefix = rest.strip_suffix("/element")?;
            Some(format!("{prefix}/screenshot/{id}"))
        }
        Dialect::W3c => {
            let (rest, id) = url.rsplit_once('/')?;
            let prefix = rest.strip_suffix("/screenshot")?;
            Some(format!("{prefix}/element/{id}/screenshot"))
        }
    }
}

fn rewrite_window_handles(url: &str, dialect: Dialect) -> Option<String> {
    let renames: &[(&str, &str)] = match dialect {
        Dialect::Jwp => &[
            ("/window", "/window_handle"),
            ("/window/handle", "/window_handle"),
            ("/window/handles", "/window_handles"),
        ],
        Dialect::W3c => &[
            ("/window_handle", "/window"),
            ("/window_handles", "/window/handles"),
        ],
    };
    renames.iter().find_map(|(from, to)| {
        url.strip_suffix(from)
            .map(|prefix| format!("{prefix}{to}"))
    })
}
