use serde_json::{json, Value};

use crate::domain::first_str;

/// What a portal QR code carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrPayload {
    Document(String),
    Resident(String),
    Employee(String),
}

impl QrPayload {
    pub fn encode(&self) -> String {
        let value = match self {
            QrPayload::Document(id) => json!({ "documentId": id }),
            QrPayload::Resident(id) => json!({ "residentId": id }),
            QrPayload::Employee(id) => json!({ "employeeId": id }),
        };
        value.to_string()
    }

    /// `None` unless `raw` is a JSON object carrying one of the known keys.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        if !value.is_object() {
            return None;
        }
        if let Some(id) = first_str(&value, &["documentId", "documentCode"]) {
            return Some(QrPayload::Document(id));
        }
        if let Some(id) = first_str(&value, &["residentId"]) {
            return Some(QrPayload::Resident(id));
        }
        first_str(&value, &["employeeId"]).map(QrPayload::Employee)
    }
}

/// The lookup code inside a scanned payload.
///
/// JSON objects yield `documentId`, then `documentCode`, then `code`;
/// anything else (plain text, JSON without those keys) is used as typed,
/// minus surrounding whitespace.
pub fn document_code_from_scan(raw: &str) -> String {
    let trimmed = raw.trim();
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(Value::is_object)
        .and_then(|value| first_str(&value, &["documentId", "documentCode", "code"]))
        .map(|code| code.trim().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
