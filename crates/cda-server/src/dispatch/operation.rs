use axum::http::Method;
use serde::Serialize;
use std::fmt;

/// The five operations every resource exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    FetchOne,
    FetchAll,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// All operations in binding order
    pub const ALL: [Operation; 5] = [
        Operation::FetchAll,
        Operation::FetchOne,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    /// HTTP method the operation is bound to
    pub fn method(self) -> Method {
        match self {
            Operation::FetchOne | Operation::FetchAll => Method::GET,
            Operation::Create => Method::POST,
            Operation::Update => Method::PATCH,
            Operation::Delete => Method::DELETE,
        }
    }

    /// Whether the operation addresses a single item (full template)
    /// rather than the collection path
    pub fn targets_item(self) -> bool {
        matches!(self, Operation::FetchOne | Operation::Update | Operation::Delete)
    }

    pub fn is_read(self) -> bool {
        matches!(self, Operation::FetchOne | Operation::FetchAll)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::FetchOne => "fetch-one",
            Operation::FetchAll => "fetch-all",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
