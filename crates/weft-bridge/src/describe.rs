//! Human-readable messages for thrown values
//!
//! Page handlers and transport layers throw anything from plain strings to
//! HTTP client errors with validation bodies. [`describe`] flattens them into
//! the single line an `error` reply carries.

use serde_json::{Map, Value};

use crate::fill::js_string;

/// Message for a thrown value, `None` when it carries nothing useful
pub fn describe(error: &Value) -> Option<String> {
    match error {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(object) => Some(describe_object(object)),
        Value::Array(_) => Some(error.to_string()),
        _ => None,
    }
}

fn describe_object(object: &Map<String, Value>) -> String {
    if let Some(body) = object.get("body") {
        return describe_body(body);
    }
    match object.get("code").and_then(Value::as_str) {
        Some("ETIMEDOUT") => return "Timed out".to_string(),
        Some("ECONNABORTED") => return "Connection aborted".to_string(),
        _ => {}
    }
    if let Some(response) = object.get("response").filter(|r| r.is_object()) {
        let error = response.pointer("/data/error").and_then(Value::as_str);
        let status = response.get("statusText").and_then(Value::as_str);
        return error.or(status).map_or_else(|| response.to_string(), str::to_string);
    }
    if let Some(message) = object.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    Value::Object(object.clone()).to_string()
}

/// A validation-style response body
fn describe_body(body: &Value) -> String {
    if let Some(text) = body.as_str() {
        return text.to_string();
    }
    match body.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Array(items)) if !items.is_empty() => {
            items.iter().map(describe_detail).collect::<Vec<_>>().join(", ")
        }
        _ => body.to_string(),
    }
}

/// `{msg, loc}` as `"msg (a.b.c)"`
fn describe_detail(item: &Value) -> String {
    let Value::Object(item) = item else {
        return js_string(item);
    };
    let msg = item
        .get("msg")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("No error message");
    match item.get("loc").and_then(Value::as_array).filter(|loc| !loc.is_empty()) {
        Some(loc) => {
            let path = loc.iter().map(js_string).collect::<Vec<_>>().join(".");
            format!("{msg} ({path})")
        }
        None => msg.to_string(),
    }
}
