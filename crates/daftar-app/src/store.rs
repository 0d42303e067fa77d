// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Row, SortDirection, TableKind};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport or decode failure while reading.
    Fetch(String),
    /// The store rejected a write; the reason is user-facing.
    Write(String),
    /// The identifier does not exist server-side.
    NotFound,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(reason) => write!(f, "fetch failed: {reason}"),
            Self::Write(reason) => write!(f, "write rejected: {reason}"),
            Self::NotFound => f.write_str("record not found"),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Query parameters for a table load; maps one-to-one onto the proxy's
/// query string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<SortDirection>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted(sort: &str, order: SortDirection) -> Self {
        Self {
            sort: Some(sort.to_owned()),
            order: Some(order),
            ..Self::default()
        }
    }
}

/// The remote CRUD service behind the grid. Implementations own
/// transport, caching, and timeouts; the editor core only sees per-call
/// success or a `StoreError`.
pub trait RemoteStore {
    fn list(&mut self, table: TableKind, query: &ListQuery) -> StoreResult<Vec<Row>>;

    /// Server assigns the identifier; the created row is returned.
    fn create(&mut self, table: TableKind, fields: &BTreeMap<String, String>) -> StoreResult<Row>;

    /// Returns the updated row as stored.
    fn update(
        &mut self,
        table: TableKind,
        id: i64,
        fields: &BTreeMap<String, String>,
    ) -> StoreResult<Row>;

    fn delete(&mut self, table: TableKind, id: i64) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    fn error_display_is_user_facing() {
        assert_eq!(
            StoreError::Fetch("connection refused".to_owned()).to_string(),
            "fetch failed: connection refused"
        );
        assert_eq!(
            StoreError::Write("duplicate email".to_owned()).to_string(),
            "write rejected: duplicate email"
        );
        assert_eq!(StoreError::NotFound.to_string(), "record not found");
    }
}
