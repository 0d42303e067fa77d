// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Row, RowId};
use std::collections::BTreeSet;

/// Ordered in-memory copy of one table's rows. Replaced wholesale on
/// load, spliced in place after successful writes. Assigned ids are
/// unique; at most one `Pending` placeholder row exists at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableMirror {
    rows: Vec<Row>,
}

impl TableMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Install a full reload. Duplicate assigned ids keep their first
    /// occurrence; placeholder rows in the input are dropped (a reload
    /// reflects server state, which has no placeholders).
    pub fn replace_all(&mut self, rows: Vec<Row>) {
        let mut seen = BTreeSet::new();
        self.rows = rows
            .into_iter()
            .filter(|row| match row.id {
                RowId::Assigned(id) => seen.insert(id),
                RowId::Pending => false,
            })
            .collect();
    }

    pub fn contains(&self, id: i64) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.id == RowId::Assigned(id))
    }

    pub fn get(&self, id: i64) -> Option<&Row> {
        self.position(id).map(|index| &self.rows[index])
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut Row> {
        let index = self.position(id)?;
        Some(&mut self.rows[index])
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        match id {
            RowId::Assigned(id) => self.get(id),
            RowId::Pending => self.pending(),
        }
    }

    pub fn pending(&self) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == RowId::Pending)
    }

    pub fn has_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Append the placeholder; refused while one already exists.
    pub fn push_pending(&mut self, row: Row) -> bool {
        if self.has_pending() || row.id != RowId::Pending {
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn remove_pending(&mut self) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != RowId::Pending);
        self.rows.len() != before
    }

    pub fn remove(&mut self, id: i64) -> bool {
        match self.position(id) {
            Some(index) => {
                self.rows.remove(index);
                true
            }
            None => false,
        }
    }

    /// Install the server-returned record for `target`: in place if the
    /// target row is still present, appended otherwise (a write whose
    /// session was abandoned still lands).
    pub fn install(&mut self, target: RowId, row: Row) {
        let index = match target {
            RowId::Assigned(id) => self.position(id),
            RowId::Pending => self.rows.iter().position(|r| r.id == RowId::Pending),
        };
        match index {
            Some(index) => self.rows[index] = row,
            None => self.rows.push(row),
        }
    }

    /// Pure search projection: rows whose identifier or any field value
    /// contains `term` case-insensitively, in mirror order. An empty or
    /// whitespace term yields every row.
    pub fn filtered(&self, term: &str) -> Vec<&Row> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.rows.iter().collect();
        }
        self.rows
            .iter()
            .filter(|row| {
                row.id.display().to_lowercase().contains(&needle)
                    || row
                        .fields
                        .values()
                        .any(|value| value.to_lowercase().contains(&needle))
            })
            .collect()
    }
}
