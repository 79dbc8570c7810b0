//! Typed request inputs handed to resource handlers
//!
//! Every accessor reports malformed input as an [`AppError`] from the
//! client-input group, so handlers can use `?` and get a `400` back.

use axum::body::Bytes;
use axum::extract::Query;
use axum::http::Uri;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Query-string filters of a collection read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(BTreeMap<String, String>);

impl Filters {
    /// Parse the query string of a request URI
    pub fn from_uri(uri: &Uri) -> AppResult<Self> {
        let Query(params) = Query::<BTreeMap<String, String>>::try_from_uri(uri).map_err(
            |rejection| AppError::BadQueryParameter {
                name: "query".to_string(),
                reason: rejection.body_text(),
            },
        )?;
        Ok(Self(params))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// A parameter that must be present and non-empty
    pub fn required(&self, name: &str) -> AppResult<&str> {
        match self.get(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(AppError::MissingParameter(name.to_string())),
        }
    }

    /// Parse an optional parameter into `T`
    pub fn parse<T>(&self, name: &str) -> AppResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| AppError::BadQueryParameter {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Parse an optional RFC 3339 date/time parameter
    pub fn datetime(&self, name: &str) -> AppResult<Option<DateTime<FixedOffset>>> {
        self.get(name)
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw).map_err(|source| AppError::BadDateTime {
                    name: name.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Request body of a create or update
#[derive(Debug, Clone)]
pub struct Payload {
    content_type: Option<String>,
    body: Bytes,
}

impl Payload {
    pub fn new(content_type: Option<String>, body: Bytes) -> Self {
        Self { content_type, body }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize a JSON body
    ///
    /// A body declared as anything other than JSON is rejected.
    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        if let Some(content_type) = self.content_type() {
            let essence = content_type.split(';').next().unwrap_or_default().trim();
            if !(essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")) {
                return Err(AppError::bad_body(format!(
                    "unsupported content type '{}'",
                    content_type
                )));
            }
        }
        if self.body.is_empty() {
            return Err(AppError::bad_body("request body is empty"));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}
