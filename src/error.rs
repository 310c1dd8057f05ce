//! Crate-wide error type.
//!
//! Every fallible operation returns [`ParallaxError`]. Browser calls surface
//! `JsValue` exceptions, which are flattened into [`ParallaxError::Js`] so they
//! can travel through `?` and end up as a single log line at the boundary.

use wasm_bindgen::JsValue;

/// Errors raised while building the scene or negotiating sensor access.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParallaxError {
    /// A required DOM element was not found on the host page.
    #[error("missing element #{0}")]
    MissingElement(String),
    /// A browser API threw or returned an unexpected value.
    #[error("browser call failed: {0}")]
    Js(String),
    /// The user or platform refused orientation access.
    #[error("orientation permission denied ({0})")]
    PermissionDenied(String),
    /// The explicit permission request itself failed.
    #[error("permission request failed: {0}")]
    PermissionRequest(String),
    /// The generic permissions query is unsupported or errored.
    #[error("permission query failed: {0}")]
    PermissionQuery(String),
    /// The orientation sensor could not be constructed or started.
    #[error("sensor failure: {0}")]
    Sensor(String),
    /// Neither orientation source exists on this platform.
    #[error("no orientation sensor available")]
    NoOrientationSource,
    /// A layer image could not be drawn (typically a broken image).
    #[error("drawing layer {layer} failed: {reason}")]
    Draw { layer: String, reason: String },
    /// The host page supplied an invalid configuration.
    #[error("invalid config: {0}")]
    Config(String),
}

impl From<JsValue> for ParallaxError {
    fn from(value: JsValue) -> Self {
        Self::Js(describe_js(&value))
    }
}

impl From<ParallaxError> for JsValue {
    fn from(err: ParallaxError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Render a thrown JS value as text, preferring `Error.name: message`.
#[must_use]
pub fn describe_js(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    let name = js_sys::Reflect::get(value, &JsValue::from_str("name"))
        .map(|v| v.as_string())
        .unwrap_or_default();
    let message = js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .map(|v| v.as_string())
        .unwrap_or_default();
    match (name, message) {
        (Some(name), Some(message)) => format!("{name}: {message}"),
        (Some(name), None) => name,
        (None, Some(message)) => message,
        (None, None) => format!("{value:?}"),
    }
}
