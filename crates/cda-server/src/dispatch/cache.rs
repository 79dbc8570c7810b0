//! Default `Cache-Control` for successful reads

use axum::http::{header, HeaderValue, Method, Response, StatusCode};
use std::str::FromStr;
use std::time::Duration;

use cda_common::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(self) -> u64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 60 * 60,
            TimeUnit::Days => 24 * 60 * 60,
        }
    }
}

/// How long read responses may be cached by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheRule {
    duration: u64,
    unit: TimeUnit,
}

impl CacheRule {
    pub const fn new(duration: u64, unit: TimeUnit) -> Self {
        Self { duration, unit }
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.duration.saturating_mul(self.unit.seconds()))
    }

    /// The header value this rule injects
    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("max-age={}", self.max_age().as_secs()))
            .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }
}

impl Default for CacheRule {
    fn default() -> Self {
        Self::new(5, TimeUnit::Minutes)
    }
}

/// Parses `300`, `300s`, `5m`, `1h` or `1d`
impl FromStr for CacheRule {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, suffix) = s.split_at(split);

        let duration = digits
            .parse::<u64>()
            .map_err(|_| ConfigurationError::InvalidCacheDuration(s.to_string()))?;
        let unit = match suffix.trim() {
            "" | "s" => TimeUnit::Seconds,
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            "d" => TimeUnit::Days,
            _ => return Err(ConfigurationError::InvalidCacheDuration(s.to_string())),
        };

        Ok(Self::new(duration, unit))
    }
}

/// Set `Cache-Control` on a response to a read, if nothing set it already
///
/// Only `GET` and `HEAD` requests answered with exactly `200` qualify.
/// `HEAD` is served by the `GET` route, so both carry the same headers.
/// Returns whether the header was injected.
pub fn apply_default_cache<B>(method: &Method, response: &mut Response<B>, rule: &CacheRule) -> bool {
    if !(*method == Method::GET || *method == Method::HEAD)
        || response.status() != StatusCode::OK
        || response.headers().contains_key(header::CACHE_CONTROL)
    {
        return false;
    }

    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, rule.header_value());
    true
}
