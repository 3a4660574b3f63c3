//! The standard endpoint table shared by both dialects.

use serde_json::{Map, Value};

use super::{CommandSpec, HttpMethod};
use crate::dialect::Dialect;
use crate::params::PayloadSpec;
use crate::validators::{validate_new_session, validate_timeouts};

const FIND: PayloadSpec = PayloadSpec::required(&[&["using", "value"]]);
const SCRIPT: PayloadSpec = PayloadSpec::required(&[&["script", "args"]]);
const ACTIONS: PayloadSpec = PayloadSpec::required(&[&["actions"]]);

const NEW_SESSION: PayloadSpec = PayloadSpec::optional(&[
    "desiredCapabilities",
    "requiredCapabilities",
    "capabilities",
])
.with_validator(validate_new_session);

const TIMEOUTS: PayloadSpec =
    PayloadSpec::optional(&["type", "ms", "script", "pageLoad", "implicit"])
        .with_validator(validate_timeouts);

const SET_WINDOW: PayloadSpec =
    PayloadSpec::required(&[&["name"], &["handle"], &["name", "handle"]]).with_args(window_args);

const SET_VALUE: PayloadSpec =
    PayloadSpec::required(&[&["value"], &["text"], &["value", "text"]]).with_args(value_args);

const NETWORK_CONNECTION: PayloadSpec =
    PayloadSpec::required(&[&["type"]]).unwrapped("parameters");

fn present<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    body.get(key).filter(|value| !value.is_null())
}

/// `setWindow` takes the window handle; JWP clients call it `name`.
fn window_args(body: &Map<String, Value>, _dialect: Option<Dialect>) -> Vec<Value> {
    let handle = present(body, "handle").or_else(|| present(body, "name"));
    vec![handle.cloned().unwrap_or(Value::Null)]
}

/// `setValue` takes the key sequence; W3C clients send it as `text`.
fn value_args(body: &Map<String, Value>, _dialect: Option<Dialect>) -> Vec<Value> {
    let keys = present(body, "value").or_else(|| present(body, "text"));
    vec![keys.cloned().unwrap_or(Value::Null)]
}

/// Every endpoint the core routes, in lookup order.
pub const STANDARD_ROUTES: &[CommandSpec] = &[
    CommandSpec::get("/status", "getStatus"),
    CommandSpec::post("/session", "createSession", NEW_SESSION),
    CommandSpec::get("/sessions", "getSessions"),
    CommandSpec::get("/session/:sessionId", "getSession"),
    CommandSpec::delete("/session/:sessionId", "deleteSession"),
    // timeouts
    CommandSpec::get("/session/:sessionId/timeouts", "getTimeouts"),
    CommandSpec::post("/session/:sessionId/timeouts", "timeouts", TIMEOUTS),
    CommandSpec::post(
        "/session/:sessionId/timeouts/async_script",
        "asyncScriptTimeout",
        PayloadSpec::required(&[&["ms"]]),
    ),
    CommandSpec::post(
        "/session/:sessionId/timeouts/implicit_wait",
        "implicitWait",
        PayloadSpec::required(&[&["ms"]]),
    ),
    // navigation
    CommandSpec::get("/session/:sessionId/url", "getUrl"),
    CommandSpec::post(
        "/session/:sessionId/url",
        "setUrl",
        PayloadSpec::required(&[&["url"]]),
    ),
    CommandSpec::post("/session/:sessionId/forward", "forward", PayloadSpec::NONE),
    CommandSpec::post("/session/:sessionId/back", "back", PayloadSpec::NONE),
    CommandSpec::post("/session/:sessionId/refresh", "refresh", PayloadSpec::NONE),
    CommandSpec::get("/session/:sessionId/title", "title"),
    CommandSpec::get("/session/:sessionId/source", "getPageSource"),
    // windows and frames
    CommandSpec::get("/session/:sessionId/window_handle", "getWindowHandle"),
    CommandSpec::get("/session/:sessionId/window", "getWindowHandle"),
    CommandSpec::post("/session/:sessionId/window", "setWindow", SET_WINDOW),
    CommandSpec::delete("/session/:sessionId/window", "closeWindow"),
    CommandSpec::get("/session/:sessionId/window_handles", "getWindowHandles"),
    CommandSpec::get("/session/:sessionId/window/handles", "getWindowHandles"),
    CommandSpec::get("/session/:sessionId/window/rect", "getWindowRect"),
    CommandSpec::post(
        "/session/:sessionId/window/rect",
        "setWindowRect",
        PayloadSpec::optional(&["x", "y", "width", "height"]),
    ),
    CommandSpec::post(
        "/session/:sessionId/window/maximize",
        "maximizeWindow",
        PayloadSpec::NONE,
    ),
    CommandSpec::post(
        "/session/:sessionId/frame",
        "setFrame",
        PayloadSpec::required(&[&["id"]]),
    ),
    CommandSpec::post(
        "/session/:sessionId/frame/parent",
        "switchToParentFrame",
        PayloadSpec::NONE,
    ),
    // scripts
    CommandSpec::post("/session/:sessionId/execute", "execute", SCRIPT),
    CommandSpec::post("/session/:sessionId/execute/sync", "execute", SCRIPT),
    CommandSpec::post("/session/:sessionId/execute_async", "executeAsync", SCRIPT),
    CommandSpec::post("/session/:sessionId/execute/async", "executeAsync", SCRIPT),
    // screenshots
    CommandSpec::get("/session/:sessionId/screenshot", "getScreenshot"),
    CommandSpec::get(
        "/session/:sessionId/screenshot/:elementId",
        "getElementScreenshot",
    ),
    // elements
    CommandSpec::post("/session/:sessionId/element", "findElement", FIND),
    CommandSpec::post("/session/:sessionId/elements", "findElements", FIND),
    CommandSpec::get("/session/:sessionId/element/active", "active"),
    CommandSpec::post("/session/:sessionId/element/active", "active", PayloadSpec::NONE),
    CommandSpec::post(
        "/session/:sessionId/element/:elementId/element",
        "findElementFromElement",
        FIND,
    ),
    CommandSpec::post(
        "/session/:sessionId/element/:elementId/elements",
        "findElementsFromElement",
        FIND,
    ),
    CommandSpec::post(
        "/session/:sessionId/element/:elementId/click",
        "click",
        PayloadSpec::NONE,
    ),
    CommandSpec::post(
        "/session/:sessionId/element/:elementId/submit",
        "submit",
        PayloadSpec::NONE,
    ),
    CommandSpec::get("/session/:sessionId/element/:elementId/text", "getText"),
    CommandSpec::post(
        "/session/:sessionId/element/:elementId/value",
        "setValue",
        SET_VALUE,
    ),
    CommandSpec::post(
        "/session/:sessionId/element/:elementId/clear",
        "clear",
        PayloadSpec::NONE,
    ),
    CommandSpec::get("/session/:sessionId/element/:elementId/name", "getName"),
    CommandSpec::get(
        "/session/:sessionId/element/:elementId/attribute/:name",
        "getAttribute",
    ),
    CommandSpec::get(
        "/session/:sessionId/element/:elementId/property/:name",
        "getProperty",
    ),
    CommandSpec::get(
        "/session/:sessionId/element/:elementId/displayed",
        "elementDisplayed",
    ),
    CommandSpec::get(
        "/session/:sessionId/element/:elementId/enabled",
        "elementEnabled",
    ),
    CommandSpec::get(
        "/session/:sessionId/element/:elementId/selected",
        "elementSelected",
    ),
    CommandSpec::get("/session/:sessionId/element/:elementId/rect", "getElementRect"),
    CommandSpec::get("/session/:sessionId/element/:elementId/location", "getLocation"),
    CommandSpec::get("/session/:sessionId/element/:elementId/size", "getSize"),
    CommandSpec::get(
        "/session/:sessionId/element/:elementId/screenshot",
        "getElementScreenshot",
    ),
    CommandSpec::post(
        "/session/:sessionId/keys",
        "keys",
        PayloadSpec::required(&[&["value"]]),
    ),
    // cookies
    CommandSpec::get("/session/:sessionId/cookie", "getCookies"),
    CommandSpec::post(
        "/session/:sessionId/cookie",
        "setCookie",
        PayloadSpec::required(&[&["cookie"]]),
    ),
    CommandSpec::delete("/session/:sessionId/cookie", "deleteCookies"),
    CommandSpec::get("/session/:sessionId/cookie/:name", "getCookie"),
    CommandSpec::delete("/session/:sessionId/cookie/:name", "deleteCookie"),
    // alerts
    CommandSpec::get("/session/:sessionId/alert_text", "getAlertText"),
    CommandSpec::post(
        "/session/:sessionId/alert_text",
        "setAlertText",
        PayloadSpec::required(&[&["text"]]),
    ),
    CommandSpec::post(
        "/session/:sessionId/accept_alert",
        "postAcceptAlert",
        PayloadSpec::NONE,
    ),
    CommandSpec::post(
        "/session/:sessionId/dismiss_alert",
        "postDismissAlert",
        PayloadSpec::NONE,
    ),
    CommandSpec::get("/session/:sessionId/alert/text", "getAlertText"),
    CommandSpec::post(
        "/session/:sessionId/alert/text",
        "setAlertText",
        PayloadSpec::required(&[&["text"]]),
    ),
    CommandSpec::post(
        "/session/:sessionId/alert/accept",
        "postAcceptAlert",
        PayloadSpec::NONE,
    ),
    CommandSpec::post(
        "/session/:sessionId/alert/dismiss",
        "postDismissAlert",
        PayloadSpec::NONE,
    ),
    // device
    CommandSpec::get("/session/:sessionId/orientation", "getOrientation"),
    CommandSpec::post(
        "/session/:sessionId/orientation",
        "setOrientation",
        PayloadSpec::required(&[&["orientation"]]),
    ),
    CommandSpec::get(
        "/session/:sessionId/network_connection",
        "getNetworkConnection",
    ),
    CommandSpec::post(
        "/session/:sessionId/network_connection",
        "setNetworkConnection",
        NETWORK_CONNECTION,
    ),
    CommandSpec::post(
        "/session/:sessionId/appium/device/lock",
        "lock",
        PayloadSpec::optional(&["seconds"]),
    ),
    CommandSpec::get("/session/:sessionId/appium/settings", "getSettings"),
    CommandSpec::post(
        "/session/:sessionId/appium/settings",
        "updateSettings",
        PayloadSpec::required(&[&["settings"]]),
    ),
    // input
    CommandSpec::post("/session/:sessionId/actions", "performActions", ACTIONS),
    CommandSpec::delete("/session/:sessionId/actions", "releaseActions"),
    CommandSpec::post(
        "/session/:sessionId/touch/perform",
        "performTouch",
        ACTIONS.wrapped("actions"),
    ),
    CommandSpec::post(
        "/session/:sessionId/touch/multi/perform",
        "performMultiAction",
        ACTIONS.with_optional(&["elementId"]),
    ),
    CommandSpec::post(
        "/session/:sessionId/click",
        "clickCurrent",
        PayloadSpec::optional(&["button"]),
    ),
    CommandSpec::post(
        "/session/:sessionId/moveto",
        "moveTo",
        PayloadSpec::optional(&["element", "xoffset", "yoffset"]),
    ),
    // logs
    CommandSpec::get("/session/:sessionId/log/types", "getLogTypes"),
    CommandSpec::post(
        "/session/:sessionId/log",
        "getLog",
        PayloadSpec::required(&[&["type"]]),
    ),
    // never implemented
    CommandSpec::unsupported(HttpMethod::Get, "/session/:sessionId/ime/available_engines"),
    CommandSpec::unsupported(HttpMethod::Get, "/session/:sessionId/local_storage"),
    CommandSpec::unsupported(HttpMethod::Post, "/session/:sessionId/local_storage"),
    CommandSpec::unsupported(HttpMethod::Delete, "/session/:sessionId/local_storage"),
];
