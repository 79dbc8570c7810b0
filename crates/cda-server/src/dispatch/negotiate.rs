//! `Accept` header negotiation
//!
//! Every resource answers in JSON. A request is served if its `Accept`
//! header is absent or names at least one range covering JSON with a
//! non-zero quality.

use axum::http::{header, HeaderMap};

use crate::error::{AppError, AppResult};

/// Media type of every reply body
pub const JSON: &str = "application/json";

/// Check that the caller accepts JSON
pub fn negotiate(headers: &HeaderMap) -> AppResult<()> {
    let values: Vec<&str> = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    let ranges: Vec<&str> = values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|range| !range.is_empty())
        .collect();

    if ranges.is_empty() || ranges.iter().any(|range| accepts_json(range)) {
        return Ok(());
    }

    Err(AppError::UnsupportedFormat {
        requested: values.join(", "),
    })
}

fn accepts_json(range: &str) -> bool {
    let mut parts = range.split(';').map(str::trim);
    let media = parts.next().unwrap_or_default().to_ascii_lowercase();

    let refused = parts
        .filter_map(|param| param.split_once('='))
        .any(|(name, value)| name.trim().eq_ignore_ascii_case("q") && is_zero(value.trim()));
    if refused {
        return false;
    }

    match media.split_once('/') {
        Some(("*", "*")) => true,
        Some(("application", subtype)) => {
            subtype == "*" || subtype == "json" || subtype.ends_with("+json")
        },
        _ => false,
    }
}

fn is_zero(q: &str) -> bool {
    q.parse::<f32>().map(|q| q <= 0.0).unwrap_or(false)
}
