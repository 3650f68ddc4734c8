//! Request input assembly.
//!
//! Builds the per-request [`ParamStore`] from the raw request parts.
//! A parseable JSON object body seeds the store (and the form map)
//! first; the method-specific source then merges over it — query
//! string for GET, form body for POST, url-encoded body for PUT and
//! DELETE. Handlers therefore see consistent values no matter which
//! source a field arrived through.

use std::collections::HashMap;

use axum::http::Method;
use serde_json::Value;

use crate::params::ParamStore;

/// Assembles the parameter store for one request.
pub fn gather(method: &Method, query: Option<&str>, body: &[u8]) -> ParamStore {
    let mut store = ParamStore::new();
    let mut form: HashMap<String, String> = HashMap::new();
    let mut body_was_json = false;

    if !body.is_empty() {
        if let Ok(Value::Object(fields)) = serde_json::from_slice(body) {
            body_was_json = true;
            for (key, value) in fields {
                let text = field_to_string(&value);
                store.set(key.clone(), text.clone());
                form.insert(key, text);
            }
        }
    }

    match method.as_str() {
        "GET" => {
            if let Some(qs) = query {
                for (key, value) in parse_urlencoded(qs.as_bytes()) {
                    store.set(key, value);
                }
            }
        }
        "POST" => {
            if !body_was_json {
                for (key, value) in parse_urlencoded(body) {
                    form.insert(key, value);
                }
            }
            for (key, value) in form {
                store.set(key, value);
            }
        }
        "PUT" | "DELETE" => {
            if !body_was_json {
                for (key, value) in parse_urlencoded(body) {
                    store.set(key, value);
                }
            }
        }
        _ => {}
    }

    store
}

fn parse_urlencoded(bytes: &[u8]) -> Vec<(String, String)> {
    serde_urlencoded::from_bytes(bytes).unwrap_or_default()
}

/// Scalar JSON fields flatten to their plain text; structured fields
/// keep their JSON encoding so nothing is lost in the string map.
fn field_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
