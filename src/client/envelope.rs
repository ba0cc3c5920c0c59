//! Response envelope handling shared by every backend call.
//!
//! The backend answers either `{ "ok": bool, ... }` or a bare array/object.
//! A non-2xx status or `ok: false` is a failure; its message comes from
//! `message`, then `error`, then the status line.

use serde_json::Value;

use crate::domain::first_str;
use crate::error::{AppError, Result};

pub fn unwrap_envelope(status: u16, body: &[u8]) -> Result<Value> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) if (200..300).contains(&status) => return Err(e.into()),
            // Error pages are often HTML; keep the status as the message.
            Err(_) => Value::Null,
        }
    };

    if !(200..300).contains(&status) {
        return Err(AppError::Backend {
            status,
            message: failure_message(&value).unwrap_or_else(|| default_message(status)),
        });
    }

    if value.get("ok").and_then(Value::as_bool) == Some(false) {
        return Err(AppError::Backend {
            status,
            message: failure_message(&value).unwrap_or_else(|| "Request was rejected".to_string()),
        });
    }

    Ok(value)
}

fn failure_message(value: &Value) -> Option<String> {
    first_str(value, &["message", "error"]).or_else(|| {
        value
            .get("error")
            .and_then(|e| first_str(e, &["message"]))
    })
}

fn default_message(status: u16) -> String {
    match status {
        401 => "Your session has expired. Please sign in again.".to_string(),
        403 => "You are not allowed to do that.".to_string(),
        404 => "Not found".to_string(),
        _ => format!("Server responded with status {}", status),
    }
}

/// The list inside a response: the value itself if it is an array, else
/// the first of `keys` holding an array.
pub fn extract_list(value: &Value, keys: &[&str]) -> Vec<Value> {
    if let Value::Array(items) = value {
        return items.clone();
    }
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

/// The record inside a response: the first of `keys` holding an object,
/// else the value itself.
pub fn extract_object<'a>(value: &'a Value, keys: &[&str]) -> &'a Value {
    keys.iter()
        .find_map(|key| value.get(*key).filter(|v| v.is_object()))
        .unwrap_or(value)
}
