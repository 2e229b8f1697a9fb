//! Session cookies injected into every scrape context.
//!
//! The value is a JSON array of cookies as exported by a browser extension.
//! Export formats carry fields CDP rejects, so each cookie is normalized
//! before it is handed to `Storage.setCookies`.

use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use serde_json::Value;
use tracing::{debug, warn};

/// Parse and normalize a cookie export. Malformed input yields no cookies.
pub fn parse_auth_cookies(raw: &str) -> Vec<CookieParam> {
    let cookies = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(cookies)) => cookies,
        Ok(_) => {
            warn!("Auth cookie value is not a JSON array, ignoring it");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "Error parsing auth cookie JSON");
            return Vec::new();
        }
    };

    let params: Vec<CookieParam> = cookies
        .into_iter()
        .map(normalize_cookie)
        .filter_map(|cookie| match serde_json::from_value::<CookieParam>(cookie) {
            Ok(param) => Some(param),
            Err(e) => {
                warn!(error = %e, "Skipping unusable auth cookie");
                None
            }
        })
        .collect();

    debug!(count = params.len(), "Loaded auth cookies");
    params
}

/// Drop `partitionKey` and coerce `sameSite` to `Strict`, `Lax` or `None`,
/// removing any other value.
fn normalize_cookie(mut cookie: Value) -> Value {
    let Some(fields) = cookie.as_object_mut() else {
        return cookie;
    };
    fields.remove("partitionKey");

    if let Some(same_site) = fields.remove("sameSite") {
        let lower = match &same_site {
            Value::String(s) => s.to_ascii_lowercase(),
            other => other.to_string().to_ascii_lowercase(),
        };
        let normalized = match lower.as_str() {
            "strict" => Some("Strict"),
            "lax" => Some("Lax"),
            "none" => Some("None"),
            _ => None,
        };
        if let Some(value) = normalized {
            fields.insert("sameSite".to_string(), Value::from(value));
        }
    }
    cookie
}
