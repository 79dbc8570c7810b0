//! Resource handlers
//!
//! A [`ResourceHandler`] is the set of operations one resource implements.
//! Each operation is optional; the binder routes the ones left out to an
//! implementation that answers "not implemented".
//!
//! ```ignore
//! let handler = ResourceHandler::new()
//!     .fetch_one(|mut ctx, id| async move {
//!         let row = queries::find(ctx.connection(), &id).await?;
//!         Reply::ok(&row)
//!     })
//!     .delete(|mut ctx, id| async move {
//!         queries::delete(ctx.connection(), &id).await?;
//!         Ok(Reply::no_content())
//!     });
//! ```

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

use super::context::{ConnectionSource, RequestContext};
use super::input::{Filters, Payload};
use super::reply::Reply;
use super::Operation;
use crate::error::{AppError, AppResult};

pub type ItemFn<S> =
    Arc<dyn Fn(RequestContext<S>, String) -> BoxFuture<'static, AppResult<Reply>> + Send + Sync>;
pub type FiltersFn<S> =
    Arc<dyn Fn(RequestContext<S>, Filters) -> BoxFuture<'static, AppResult<Reply>> + Send + Sync>;
pub type PayloadFn<S> =
    Arc<dyn Fn(RequestContext<S>, Payload) -> BoxFuture<'static, AppResult<Reply>> + Send + Sync>;
pub type ItemPayloadFn<S> = Arc<
    dyn Fn(RequestContext<S>, String, Payload) -> BoxFuture<'static, AppResult<Reply>>
        + Send
        + Sync,
>;

/// How a bound operation is called, by the inputs it takes
pub enum Invocation<S: ConnectionSource> {
    /// `fetch-one` and `delete`: the identifier value
    Item(ItemFn<S>),
    /// `fetch-all`: the query filters
    Filters(FiltersFn<S>),
    /// `create`: the request body
    Payload(PayloadFn<S>),
    /// `update`: identifier value and request body
    ItemPayload(ItemPayloadFn<S>),
}

impl<S: ConnectionSource> Clone for Invocation<S> {
    fn clone(&self) -> Self {
        match self {
            Invocation::Item(f) => Invocation::Item(f.clone()),
            Invocation::Filters(f) => Invocation::Filters(f.clone()),
            Invocation::Payload(f) => Invocation::Payload(f.clone()),
            Invocation::ItemPayload(f) => Invocation::ItemPayload(f.clone()),
        }
    }
}

impl<S: ConnectionSource> Invocation<S> {
    /// An invocation that fails with [`AppError::NotImplemented`]
    ///
    /// The context is dropped straight away, releasing its connection.
    pub fn not_implemented(operation: Operation, resource: &str) -> Self {
        let resource = resource.to_string();
        let fail = move || -> BoxFuture<'static, AppResult<Reply>> {
            futures::future::ready(Err(AppError::NotImplemented {
                operation,
                resource: resource.clone(),
            }))
            .boxed()
        };

        match operation {
            Operation::FetchOne | Operation::Delete => {
                Invocation::Item(Arc::new(move |_: RequestContext<S>, _: String| fail()))
            },
            Operation::FetchAll => {
                Invocation::Filters(Arc::new(move |_: RequestContext<S>, _: Filters| fail()))
            },
            Operation::Create => {
                Invocation::Payload(Arc::new(move |_: RequestContext<S>, _: Payload| fail()))
            },
            Operation::Update => Invocation::ItemPayload(Arc::new(
                move |_: RequestContext<S>, _: String, _: Payload| fail(),
            )),
        }
    }
}

/// The operations one resource implements
pub struct ResourceHandler<S: ConnectionSource> {
    fetch_one: Option<ItemFn<S>>,
    fetch_all: Option<FiltersFn<S>>,
    create: Option<PayloadFn<S>>,
    update: Option<ItemPayloadFn<S>>,
    delete: Option<ItemFn<S>>,
}

impl<S: ConnectionSource> Default for ResourceHandler<S> {
    fn default() -> Self {
        Self {
            fetch_one: None,
            fetch_all: None,
            create: None,
            update: None,
            delete: None,
        }
    }
}

impl<S: ConnectionSource> ResourceHandler<S> {
    /// A handler implementing nothing
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_one<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext<S>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Reply>> + Send + 'static,
    {
        self.fetch_one = Some(Arc::new(move |ctx: RequestContext<S>, id: String| {
            f(ctx, id).boxed()
        }));
        self
    }

    pub fn fetch_all<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext<S>, Filters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Reply>> + Send + 'static,
    {
        self.fetch_all = Some(Arc::new(move |ctx: RequestContext<S>, filters: Filters| {
            f(ctx, filters).boxed()
        }));
        self
    }

    pub fn create<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext<S>, Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Reply>> + Send + 'static,
    {
        self.create = Some(Arc::new(move |ctx: RequestContext<S>, payload: Payload| {
            f(ctx, payload).boxed()
        }));
        self
    }

    pub fn update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext<S>, String, Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Reply>> + Send + 'static,
    {
        self.update = Some(Arc::new(
            move |ctx: RequestContext<S>, id: String, payload: Payload| f(ctx, id, payload).boxed(),
        ));
        self
    }

    pub fn delete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext<S>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Reply>> + Send + 'static,
    {
        self.delete = Some(Arc::new(move |ctx: RequestContext<S>, id: String| {
            f(ctx, id).boxed()
        }));
        self
    }

    pub fn implements(&self, operation: Operation) -> bool {
        self.invocation(operation).is_some()
    }

    /// The implementation of `operation`, if the handler provides one
    pub fn invocation(&self, operation: Operation) -> Option<Invocation<S>> {
        match operation {
            Operation::FetchOne => self.fetch_one.clone().map(Invocation::Item),
            Operation::FetchAll => self.fetch_all.clone().map(Invocation::Filters),
            Operation::Create => self.create.clone().map(Invocation::Payload),
            Operation::Update => self.update.clone().map(Invocation::ItemPayload),
            Operation::Delete => self.delete.clone().map(Invocation::Item),
        }
    }
}
