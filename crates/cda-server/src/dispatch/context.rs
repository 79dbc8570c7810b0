//! Per-request context
//!
//! A [`RequestContext`] is created when a request is dispatched and moved
//! into the resource handler. It carries the office the request is scoped
//! to, the caller (if any) and one database connection lease. Dropping the
//! context releases the lease, so the connection goes back to its source on
//! every path out of the handler, including errors and panics.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::AppResult;

/// Office used when the base path does not name one
pub const DEFAULT_OFFICE: &str = "HQ";

/// Base-path prefix that never names an office
const RESERVED_PREFIX: &str = "CWMS";

/// Identity of an authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub name: String,
    pub roles: BTreeSet<String>,
}

impl Caller {
    pub fn new<I, R>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Source of per-request database connections
///
/// The returned connection is released when it is dropped.
#[async_trait]
pub trait ConnectionSource: Clone + Send + Sync + 'static {
    type Connection: Send + 'static;

    async fn acquire(&self) -> AppResult<Self::Connection>;

    /// Whether the source can currently serve connections
    async fn check(&self) -> AppResult<()> {
        self.acquire().await.map(drop)
    }
}

/// Resolves the office a request is scoped to
#[derive(Debug, Clone, Default)]
pub struct OfficeResolver {
    override_office: Option<String>,
}

impl OfficeResolver {
    /// Derive offices from the base path only
    pub fn derived() -> Self {
        Self::default()
    }

    /// Always answer `office`, whatever the base path says
    pub fn with_override(office: impl Into<String>) -> Self {
        Self {
            override_office: Some(office.into().to_uppercase()),
        }
    }

    pub fn override_office(&self) -> Option<&str> {
        self.override_office.as_deref()
    }

    /// Office for a request served under `base_path`
    pub fn resolve(&self, base_path: &str) -> String {
        match self.override_office {
            Some(ref office) => office.clone(),
            None => office_from_base_path(base_path),
        }
    }
}

/// `/spk-data` -> `SPK`; `/cwms-data`, `/` and `` -> `HQ`
pub fn office_from_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_start_matches('/');
    let prefix = trimmed.split('-').next().unwrap_or_default();
    let office = prefix.to_uppercase();

    if office.is_empty() || office == RESERVED_PREFIX {
        DEFAULT_OFFICE.to_string()
    } else {
        office
    }
}

/// State owned by a single request
pub struct RequestContext<S: ConnectionSource> {
    office: String,
    caller: Option<Caller>,
    connection: S::Connection,
}

impl<S: ConnectionSource> RequestContext<S> {
    /// Resolve the office and take one connection from `source`
    pub async fn seed(
        source: &S,
        offices: &OfficeResolver,
        base_path: &str,
        caller: Option<Caller>,
    ) -> AppResult<Self> {
        let office = offices.resolve(base_path);
        let connection = source.acquire().await?;
        tracing::trace!(office = %office, caller = ?caller.as_ref().map(|c| &c.name), "request context seeded");
        Ok(Self {
            office,
            caller,
            connection,
        })
    }

    pub fn office(&self) -> &str {
        &self.office
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    /// Roles of the caller; empty for anonymous requests
    pub fn roles(&self) -> BTreeSet<String> {
        self.caller
            .as_ref()
            .map(|caller| caller.roles.clone())
            .unwrap_or_default()
    }

    pub fn connection(&mut self) -> &mut S::Connection {
        &mut self.connection
    }
}

impl<S: ConnectionSource> std::fmt::Debug for RequestContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("office", &self.office)
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}
