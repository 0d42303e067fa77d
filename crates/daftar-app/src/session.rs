// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FieldPolicy, Row, RowId, TableKind};
use std::collections::{BTreeMap, BTreeSet};

/// Ticket identifying one dispatched write. Resolution is matched by
/// ticket so a result arriving after its session was abandoned can
/// still be applied to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WriteTicket(pub u64);

/// The single inline-edit transaction. Holds the field snapshot taken
/// at activation (cancel restores from here, never from the mirror) and
/// the input buffer for policy-editable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    table: TableKind,
    row: RowId,
    snapshot: BTreeMap<String, String>,
    inputs: BTreeMap<String, String>,
    flagged: BTreeSet<String>,
    in_flight: Option<WriteTicket>,
}

impl EditSession {
    pub fn open(table: TableKind, row: &Row) -> Self {
        let policy = FieldPolicy::for_table(table);
        let inputs = policy
            .editable_fields()
            .iter()
            .map(|field| ((*field).to_owned(), row.field(field).to_owned()))
            .collect();
        Self {
            table,
            row: row.id,
            snapshot: row.fields.clone(),
            inputs,
            flagged: BTreeSet::new(),
            in_flight: None,
        }
    }

    pub fn table(&self) -> TableKind {
        self.table
    }

    pub fn row_id(&self) -> RowId {
        self.row
    }

    pub fn snapshot(&self) -> &BTreeMap<String, String> {
        &self.snapshot
    }

    pub fn inputs(&self) -> &BTreeMap<String, String> {
        &self.inputs
    }

    pub fn input(&self, field: &str) -> Option<&str> {
        self.inputs.get(field).map(String::as_str)
    }

    /// Ignores fields the policy does not allow editing. Editing a
    /// field clears its validation flag.
    pub fn set_input(&mut self, field: &str, value: impl Into<String>) -> bool {
        if !self.inputs.contains_key(field) {
            return false;
        }
        self.inputs.insert(field.to_owned(), value.into());
        self.flagged.remove(field);
        true
    }

    pub fn flagged(&self) -> &BTreeSet<String> {
        &self.flagged
    }

    pub fn is_flagged(&self, field: &str) -> bool {
        self.flagged.contains(field)
    }

    pub fn flag_fields(&mut self, fields: &[String]) {
        self.flagged.extend(fields.iter().cloned());
    }

    pub fn ticket(&self) -> Option<WriteTicket> {
        self.in_flight
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn mark_saving(&mut self, ticket: WriteTicket) {
        self.in_flight = Some(ticket);
    }

    pub fn clear_saving(&mut self) {
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::EditSession;
    use crate::{Row, RowId, TableKind};
    use std::collections::BTreeMap;

    fn professor_row() -> Row {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_owned(), "Ali".to_owned());
        fields.insert("Family".to_owned(), "Ahmadi".to_owned());
        fields.insert("Email".to_owned(), "ali@uni.example".to_owned());
        Row::new(RowId::Assigned(4), fields)
    }

    #[test]
    fn open_seeds_inputs_from_policy_editable_fields() {
        let session = EditSession::open(TableKind::Professors, &professor_row());
        assert_eq!(session.input("Name"), Some("Ali"));
        assert_eq!(session.input("Phone"), Some(""));
        assert_eq!(session.input("id"), None);
        assert_eq!(session.snapshot().get("Name").map(String::as_str), Some("Ali"));
    }

    #[test]
    fn set_input_rejects_non_editable_fields_and_clears_flags() {
        let mut session = EditSession::open(TableKind::Professors, &professor_row());
        assert!(!session.set_input("id", "99"));

        session.flag_fields(&["Name".to_owned()]);
        assert!(session.is_flagged("Name"));
        assert!(session.set_input("Name", "Reza"));
        assert!(!session.is_flagged("Name"));
        assert_eq!(session.input("Name"), Some("Reza"));
    }

    #[test]
    fn snapshot_is_immune_to_input_edits() {
        let mut session = EditSession::open(TableKind::Professors, &professor_row());
        session.set_input("Name", "Reza");
        assert_eq!(session.snapshot().get("Name").map(String::as_str), Some("Ali"));
    }
}
