use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Successful outcome of a resource operation
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Value>,
}

impl Reply {
    /// A reply carrying `body` as JSON
    ///
    /// Serialization failures surface as [`AppError::Formatting`].
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> AppResult<Self> {
        let body = serde_json::to_value(body).map_err(|e| AppError::Formatting(e.to_string()))?;
        Ok(Self {
            status,
            headers: HeaderMap::new(),
            body: Some(body),
        })
    }

    /// `200 OK` with a JSON body
    pub fn ok<T: Serialize>(body: &T) -> AppResult<Self> {
        Self::json(StatusCode::OK, body)
    }

    /// `201 Created` with no body
    pub fn created() -> Self {
        Self::empty(StatusCode::CREATED)
    }

    /// `204 No Content`
    pub fn no_content() -> Self {
        Self::empty(StatusCode::NO_CONTENT)
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set a response header, replacing any previous value
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set an explicit `Cache-Control`; the default cache policy never
    /// overrides it
    pub fn cache_control(self, value: &'static str) -> Self {
        self.with_header(header::CACHE_CONTROL, HeaderValue::from_static(value))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        };
        response.headers_mut().extend(self.headers);
        response
    }
}
