//! Caller identity from a fronting auth proxy
//!
//! The proxy authenticates the request and forwards the result as
//! `x-cda-user` and `x-cda-roles` (comma separated). Only mounted when the
//! deployment trusts those headers; otherwise anything upstream may insert a
//! [`Caller`] into the request extensions itself.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::dispatch::Caller;
use crate::error::{AppError, AppResult};

pub const USER_HEADER: HeaderName = HeaderName::from_static("x-cda-user");
pub const ROLES_HEADER: HeaderName = HeaderName::from_static("x-cda-roles");

/// Read the caller forwarded by the proxy
///
/// No user header means an anonymous request. A header that is present
/// but unreadable is rejected.
pub fn caller_from_headers(headers: &HeaderMap) -> AppResult<Option<Caller>> {
    let Some(user) = headers.get(USER_HEADER) else {
        return Ok(None);
    };
    let name = user
        .to_str()
        .map_err(|_| AppError::unauthenticated("user header is not valid text"))?
        .trim();
    if name.is_empty() {
        return Err(AppError::unauthenticated("user header is empty"));
    }

    let mut roles = Vec::new();
    for value in headers.get_all(ROLES_HEADER) {
        let value = value
            .to_str()
            .map_err(|_| AppError::unauthenticated("roles header is not valid text"))?;
        roles.extend(
            value
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_string),
        );
    }

    Ok(Some(Caller::new(name, roles)))
}

/// Attach the forwarded caller to the request
pub async fn trusted_identity(mut request: Request, next: Next) -> Response {
    match caller_from_headers(request.headers()) {
        Ok(Some(caller)) => {
            tracing::debug!(user = %caller.name, roles = caller.roles.len(), "caller identified");
            request.extensions_mut().insert(caller);
            next.run(request).await
        },
        Ok(None) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
