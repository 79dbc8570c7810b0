//! Default `Cache-Control` for successful reads
//!
//! Wraps the resource routes. Runs after the handler, so a header the
//! handler set is already on the response and is left alone.

use axum::{extract::Request, response::Response};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use crate::dispatch::cache::{apply_default_cache, CacheRule};

/// Default cache layer
#[derive(Debug, Clone)]
pub struct DefaultCacheLayer {
    rule: CacheRule,
}

impl DefaultCacheLayer {
    pub fn new(rule: CacheRule) -> Self {
        Self { rule }
    }
}

impl<S> Layer<S> for DefaultCacheLayer {
    type Service = DefaultCache<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultCache {
            inner,
            rule: self.rule,
        }
    }
}

/// Default cache middleware service
#[derive(Debug, Clone)]
pub struct DefaultCache<S> {
    inner: S,
    rule: CacheRule,
}

impl<S> Service<Request> for DefaultCache<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let rule = self.rule;
        let method = request.method().clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            if apply_default_cache(&method, &mut response, &rule) {
                tracing::trace!(max_age = rule.max_age().as_secs(), "default cache applied");
            }
            Ok(response)
        })
    }
}
