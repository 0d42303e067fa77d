// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    EditSession, FieldPolicy, Row, RowId, SelectionSet, StoreError, TableKind, TableMirror,
    WriteTicket,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TableState {
    mirror: TableMirror,
    selection: SelectionSet,
    edit_mode: bool,
    search: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingWrite {
    table: TableKind,
    target: RowId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Saved,
    Cancelled,
    /// Closed by something other than the operator's save/cancel: mode
    /// exit, wholesale reload, or the edited row vanishing.
    ForcedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridEvent {
    ModeChanged(TableKind, bool),
    SessionOpened(TableKind, RowId),
    SessionClosed(TableKind, RowId, CloseReason),
    RowsReplaced(TableKind, usize),
    RowAdded(TableKind),
    RowPatched(TableKind, RowId),
    RowRemoved(TableKind, i64),
    SelectionChanged(TableKind, usize),
    WriteFailed(TableKind, String),
    DeleteFailed(TableKind, i64, String),
    Status(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Create { fields: BTreeMap<String, String> },
    Update { id: i64, fields: BTreeMap<String, String> },
}

/// One dispatched write, handed to the caller for delivery to the
/// remote store. The result comes back through `resolve_write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub ticket: WriteTicket,
    pub table: TableKind,
    pub op: WriteOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    NoSession,
    /// A write for this session is already in flight.
    AlreadySaving,
    /// Required fields were blank; they are flagged and the session
    /// stays open. The store is never contacted.
    Invalid { missing: Vec<String> },
    Dispatched(WriteRequest),
}

/// Owns every table's mirror, selection, and mode flag, plus the single
/// editor-wide edit session. All mutation goes through methods here;
/// mutators report what happened as `GridEvent`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridController {
    tables: BTreeMap<TableKind, TableState>,
    session: Option<EditSession>,
    pending: BTreeMap<WriteTicket, PendingWrite>,
    next_ticket: u64,
}

impl Default for GridController {
    fn default() -> Self {
        Self::new()
    }
}

impl GridController {
    pub fn new() -> Self {
        let tables = TableKind::ALL
            .into_iter()
            .map(|table| (table, TableState::default()))
            .collect();
        Self {
            tables,
            session: None,
            pending: BTreeMap::new(),
            next_ticket: 1,
        }
    }

    fn state(&self, table: TableKind) -> &TableState {
        self.tables.get(&table).expect("every table is registered")
    }

    fn state_mut(&mut self, table: TableKind) -> &mut TableState {
        self.tables
            .get_mut(&table)
            .expect("every table is registered")
    }

    pub fn mirror(&self, table: TableKind) -> &TableMirror {
        &self.state(table).mirror
    }

    pub fn edit_mode(&self, table: TableKind) -> bool {
        self.state(table).edit_mode
    }

    pub fn search(&self, table: TableKind) -> &str {
        &self.state(table).search
    }

    pub fn set_search(&mut self, table: TableKind, term: impl Into<String>) {
        self.state_mut(table).search = term.into();
    }

    /// The filter projection: mirror order, case-insensitive substring
    /// match on the current search term. Never mutates the mirror.
    pub fn visible_rows(&self, table: TableKind) -> Vec<&Row> {
        let state = self.state(table);
        state.mirror.filtered(&state.search)
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn is_selected(&self, table: TableKind, id: i64) -> bool {
        self.state(table).selection.contains(id)
    }

    pub fn selection_len(&self, table: TableKind) -> usize {
        self.state(table).selection.len()
    }

    pub fn selected_ids(&self, table: TableKind) -> Vec<i64> {
        self.state(table).selection.to_vec()
    }

    /// Install a wholesale load. A session bound to this table is
    /// force-cancelled first; the selection is pruned to surviving ids.
    pub fn replace_rows(&mut self, table: TableKind, rows: Vec<Row>) -> Vec<GridEvent> {
        let mut events = self.force_close_if_bound(table);

        let state = self.state_mut(table);
        state.mirror.replace_all(rows);
        let before = state.selection.len();
        let TableState {
            mirror, selection, ..
        } = state;
        selection.retain(|id| mirror.contains(*id));
        if state.selection.len() != before {
            events.push(GridEvent::SelectionChanged(table, state.selection.len()));
        }
        events.push(GridEvent::RowsReplaced(table, state.mirror.len()));
        events
    }

    pub fn set_edit_mode(&mut self, table: TableKind, on: bool) -> Vec<GridEvent> {
        if self.state(table).edit_mode == on {
            return Vec::new();
        }

        let mut events = Vec::new();
        if !on {
            events.extend(self.force_close_if_bound(table));
        }

        let state = self.state_mut(table);
        state.edit_mode = on;
        if !state.selection.is_empty() {
            state.selection.clear();
            events.push(GridEvent::SelectionChanged(table, 0));
        }
        events.push(GridEvent::ModeChanged(table, on));
        events
    }

    /// Open an edit session on a row. Silent no-op when the table is
    /// not in edit mode, the row is unknown, the row is already open,
    /// or another row's save is still in flight. A prior idle session
    /// is cancelled first.
    pub fn activate(&mut self, table: TableKind, id: RowId) -> Vec<GridEvent> {
        if !self.state(table).edit_mode {
            return Vec::new();
        }
        if self.state(table).mirror.row(id).is_none() {
            return Vec::new();
        }
        if let Some(session) = &self.session {
            if session.table() == table && session.row_id() == id {
                return Vec::new();
            }
            if session.is_saving() {
                return Vec::new();
            }
        }

        let mut events = self.close_session(CloseReason::Cancelled);
        let row = self
            .state(table)
            .mirror
            .row(id)
            .cloned()
            .expect("activation target checked above");
        self.session = Some(EditSession::open(table, &row));
        events.push(GridEvent::SessionOpened(table, id));
        events
    }

    /// Append the one allowed placeholder row and start editing it.
    pub fn add_row(&mut self, table: TableKind) -> Vec<GridEvent> {
        if !self.state(table).edit_mode {
            return Vec::new();
        }
        if self.state(table).mirror.has_pending() {
            return self.activate(table, RowId::Pending);
        }
        if self.session.as_ref().is_some_and(EditSession::is_saving) {
            return Vec::new();
        }

        let mut events = self.close_session(CloseReason::Cancelled);
        let row = Row::blank(table);
        self.state_mut(table).mirror.push_pending(row.clone());
        self.session = Some(EditSession::open(table, &row));
        events.push(GridEvent::RowAdded(table));
        events.push(GridEvent::SessionOpened(table, RowId::Pending));
        events
    }

    pub fn set_input(&mut self, field: &str, value: impl Into<String>) -> bool {
        match &mut self.session {
            Some(session) if !session.is_saving() => session.set_input(field, value),
            _ => false,
        }
    }

    /// Validate and dispatch the open session's write. The returned
    /// request must be delivered to the store and its result fed back
    /// through `resolve_write`.
    pub fn commit(&mut self) -> CommitOutcome {
        let Some(session) = &mut self.session else {
            return CommitOutcome::NoSession;
        };
        if session.is_saving() {
            return CommitOutcome::AlreadySaving;
        }

        let policy = FieldPolicy::for_table(session.table());
        let missing = policy.missing_required(session.inputs());
        if !missing.is_empty() {
            session.flag_fields(&missing);
            return CommitOutcome::Invalid { missing };
        }

        let fields = session.inputs().clone();
        let op = match session.row_id() {
            RowId::Assigned(id) => WriteOp::Update { id, fields },
            RowId::Pending => WriteOp::Create { fields },
        };
        let ticket = WriteTicket(self.next_ticket);
        self.next_ticket += 1;
        let table = session.table();
        let target = session.row_id();
        session.mark_saving(ticket);
        self.pending.insert(ticket, PendingWrite { table, target });
        CommitOutcome::Dispatched(WriteRequest { ticket, table, op })
    }

    /// Apply a write result. The mirror takes the server record even if
    /// the session was cancelled in the meantime; session state only
    /// changes when the session still holds this ticket.
    pub fn resolve_write(
        &mut self,
        ticket: WriteTicket,
        result: Result<Row, StoreError>,
    ) -> Vec<GridEvent> {
        let Some(PendingWrite { table, target }) = self.pending.remove(&ticket) else {
            return Vec::new();
        };
        let session_owns = self
            .session
            .as_ref()
            .is_some_and(|session| session.ticket() == Some(ticket));

        let mut events = Vec::new();
        match result {
            Ok(row) => {
                let installed = row.id;
                self.state_mut(table).mirror.install(target, row);
                events.push(GridEvent::RowPatched(table, installed));
                if session_owns {
                    let session = self.session.take().expect("session ownership checked");
                    events.push(GridEvent::SessionClosed(
                        table,
                        session.row_id(),
                        CloseReason::Saved,
                    ));
                }
            }
            Err(error) => {
                if session_owns {
                    if let Some(session) = &mut self.session {
                        session.clear_saving();
                    }
                }
                events.push(GridEvent::WriteFailed(table, error.to_string()));
            }
        }
        events
    }

    /// Discard the open session: rendered values revert to the
    /// activation snapshot (not the mirror), a placeholder row is
    /// removed. Allowed while a save is in flight; the eventual result
    /// then lands in the mirror without touching session state.
    pub fn cancel(&mut self) -> Vec<GridEvent> {
        self.close_session(CloseReason::Cancelled)
    }

    pub fn toggle_selected(&mut self, table: TableKind, id: i64) -> Vec<GridEvent> {
        let state = self.state_mut(table);
        if !state.edit_mode || !state.mirror.contains(id) {
            return Vec::new();
        }
        state.selection.toggle(id);
        vec![GridEvent::SelectionChanged(table, state.selection.len())]
    }

    /// Select every row in the current filtered view. Rows hidden by
    /// the filter keep their existing selection state.
    pub fn select_all_visible(&mut self, table: TableKind) -> Vec<GridEvent> {
        if !self.state(table).edit_mode {
            return Vec::new();
        }
        let visible: Vec<i64> = self
            .visible_rows(table)
            .iter()
            .filter_map(|row| row.id.assigned())
            .collect();
        let state = self.state_mut(table);
        for id in visible {
            state.selection.insert(id);
        }
        vec![GridEvent::SelectionChanged(table, state.selection.len())]
    }

    pub fn clear_selection(&mut self, table: TableKind) -> Vec<GridEvent> {
        let state = self.state_mut(table);
        if state.selection.is_empty() {
            return Vec::new();
        }
        state.selection.clear();
        vec![GridEvent::SelectionChanged(table, 0)]
    }

    /// Apply one per-row outcome of a batch delete. Successes splice
    /// the mirror and selection; failures stay in place and selected.
    /// `NotFound` removes the local row too, since the server no longer
    /// has it, but is reported separately.
    pub fn apply_delete(
        &mut self,
        table: TableKind,
        id: i64,
        result: Result<(), StoreError>,
    ) -> Vec<GridEvent> {
        match result {
            Ok(()) | Err(StoreError::NotFound) => {
                let gone_remotely = matches!(result, Err(StoreError::NotFound));
                let mut events = Vec::new();
                if self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.table() == table && s.row_id() == RowId::Assigned(id))
                {
                    let session = self.session.take().expect("session presence checked");
                    events.push(GridEvent::SessionClosed(
                        table,
                        session.row_id(),
                        CloseReason::ForcedOut,
                    ));
                }
                let state = self.state_mut(table);
                if state.mirror.remove(id) {
                    events.push(GridEvent::RowRemoved(table, id));
                }
                if state.selection.remove(id) {
                    events.push(GridEvent::SelectionChanged(table, state.selection.len()));
                }
                if gone_remotely {
                    events.push(GridEvent::Status(format!(
                        "row {id} was already deleted remotely"
                    )));
                }
                events
            }
            Err(error) => vec![GridEvent::DeleteFailed(table, id, error.to_string())],
        }
    }

    fn force_close_if_bound(&mut self, table: TableKind) -> Vec<GridEvent> {
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.table() == table)
        {
            self.close_session(CloseReason::ForcedOut)
        } else {
            Vec::new()
        }
    }

    fn close_session(&mut self, reason: CloseReason) -> Vec<GridEvent> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let table = session.table();
        let row_id = session.row_id();
        let state = self.state_mut(table);
        match row_id {
            RowId::Assigned(id) => {
                if let Some(row) = state.mirror.get_mut(id) {
                    row.fields = session.snapshot().clone();
                }
            }
            RowId::Pending => {
                state.mirror.remove_pending();
            }
        }
        // In-flight writes stay registered; their results still land in
        // the mirror through resolve_write.
        vec![GridEvent::SessionClosed(table, row_id, reason)]
    }
}

#[cfg(test)]
mod tests {
    use super::{CloseReason, CommitOutcome, GridController, GridEvent, WriteOp};
    use crate::{Row, RowId, StoreError, TableKind};
    use std::collections::BTreeMap;

    const TABLE: TableKind = TableKind::Professors;

    fn seeded() -> GridController {
        let mut controller = GridController::new();
        controller.replace_rows(TABLE, vec![professor(1, "Ali"), professor(2, "Sara")]);
        controller
    }

    fn professor(id: i64, name: &str) -> Row {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_owned(), name.to_owned());
        fields.insert("Family".to_owned(), "Ahmadi".to_owned());
        fields.insert("Email".to_owned(), format!("{}@uni.example", name.to_lowercase()));
        Row::new(RowId::Assigned(id), fields)
    }

    #[test]
    fn activate_requires_edit_mode() {
        let mut controller = seeded();
        let events = controller.activate(TABLE, RowId::Assigned(1));
        assert!(events.is_empty());
        assert!(controller.session().is_none());
    }

    #[test]
    fn activate_cancels_prior_session_before_opening() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.activate(TABLE, RowId::Assigned(1));
        controller.set_input("Name", "Scratch");

        let events = controller.activate(TABLE, RowId::Assigned(2));
        assert_eq!(
            events,
            vec![
                GridEvent::SessionClosed(TABLE, RowId::Assigned(1), CloseReason::Cancelled),
                GridEvent::SessionOpened(TABLE, RowId::Assigned(2)),
            ]
        );
        // Unsaved edits from the first session are discarded.
        assert_eq!(
            controller.mirror(TABLE).get(1).map(|row| row.field("Name")),
            Some("Ali")
        );
    }

    #[test]
    fn reactivating_the_open_row_is_a_no_op() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.activate(TABLE, RowId::Assigned(1));
        controller.set_input("Name", "Reza");

        assert!(controller.activate(TABLE, RowId::Assigned(1)).is_empty());
        let session = controller.session().expect("session should survive");
        assert_eq!(session.input("Name"), Some("Reza"));
    }

    #[test]
    fn commit_update_dispatches_editable_fields() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.activate(TABLE, RowId::Assigned(1));
        controller.set_input("Phone", "0912");

        let CommitOutcome::Dispatched(request) = controller.commit() else {
            panic!("commit should dispatch");
        };
        assert_eq!(request.table, TABLE);
        let WriteOp::Update { id, fields } = request.op else {
            panic!("existing rows update");
        };
        assert_eq!(id, 1);
        assert_eq!(fields.get("Phone").map(String::as_str), Some("0912"));
        assert!(!fields.contains_key("id"));
    }

    #[test]
    fn second_commit_while_saving_is_rejected() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.activate(TABLE, RowId::Assigned(1));
        let CommitOutcome::Dispatched(_) = controller.commit() else {
            panic!("commit should dispatch");
        };
        assert_eq!(controller.commit(), CommitOutcome::AlreadySaving);
    }

    #[test]
    fn add_row_places_single_placeholder_and_create_op() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.add_row(TABLE);
        assert!(controller.mirror(TABLE).has_pending());

        // A second add re-opens the existing placeholder.
        controller.add_row(TABLE);
        assert_eq!(
            controller.mirror(TABLE).rows().len(),
            3,
            "still one placeholder"
        );

        controller.set_input("Name", "Nima");
        controller.set_input("Family", "Karimi");
        controller.set_input("Email", "nima@uni.example");
        let CommitOutcome::Dispatched(request) = controller.commit() else {
            panic!("commit should dispatch");
        };
        assert!(matches!(request.op, WriteOp::Create { .. }));
    }

    #[test]
    fn saved_create_replaces_placeholder_with_server_row() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.add_row(TABLE);
        controller.set_input("Name", "Nima");
        controller.set_input("Family", "Karimi");
        controller.set_input("Email", "nima@uni.example");
        let CommitOutcome::Dispatched(request) = controller.commit() else {
            panic!("commit should dispatch");
        };

        let events = controller.resolve_write(request.ticket, Ok(professor(7, "Nima")));
        assert!(events.contains(&GridEvent::RowPatched(TABLE, RowId::Assigned(7))));
        assert!(!controller.mirror(TABLE).has_pending());
        assert!(controller.mirror(TABLE).contains(7));
        assert!(controller.session().is_none());
    }

    #[test]
    fn failed_write_keeps_session_editable_with_inputs() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.activate(TABLE, RowId::Assigned(1));
        controller.set_input("Name", "Reza");
        let CommitOutcome::Dispatched(request) = controller.commit() else {
            panic!("commit should dispatch");
        };

        let events = controller.resolve_write(
            request.ticket,
            Err(StoreError::Write("duplicate email".to_owned())),
        );
        assert_eq!(
            events,
            vec![GridEvent::WriteFailed(
                TABLE,
                "write rejected: duplicate email".to_owned()
            )]
        );
        let session = controller.session().expect("session stays open");
        assert!(!session.is_saving());
        assert_eq!(session.input("Name"), Some("Reza"));
        assert_eq!(
            controller.mirror(TABLE).get(1).map(|row| row.field("Name")),
            Some("Ali")
        );
    }

    #[test]
    fn stale_ticket_resolution_is_ignored() {
        let mut controller = seeded();
        let events =
            controller.resolve_write(crate::WriteTicket(99), Ok(professor(1, "Ghost")));
        assert!(events.is_empty());
        assert_eq!(
            controller.mirror(TABLE).get(1).map(|row| row.field("Name")),
            Some("Ali")
        );
    }

    #[test]
    fn selection_requires_edit_mode_and_known_row() {
        let mut controller = seeded();
        assert!(controller.toggle_selected(TABLE, 1).is_empty());

        controller.set_edit_mode(TABLE, true);
        assert!(controller.toggle_selected(TABLE, 42).is_empty());
        controller.toggle_selected(TABLE, 1);
        assert!(controller.is_selected(TABLE, 1));
    }

    #[test]
    fn select_all_applies_to_filtered_rows_only() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.set_search(TABLE, "ali");
        controller.select_all_visible(TABLE);
        assert!(controller.is_selected(TABLE, 1));
        assert!(!controller.is_selected(TABLE, 2));
    }

    #[test]
    fn delete_of_edited_row_force_closes_session() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.toggle_selected(TABLE, 1);
        controller.activate(TABLE, RowId::Assigned(1));

        let events = controller.apply_delete(TABLE, 1, Ok(()));
        assert!(events.contains(&GridEvent::SessionClosed(
            TABLE,
            RowId::Assigned(1),
            CloseReason::ForcedOut
        )));
        assert!(controller.session().is_none());
        assert!(!controller.mirror(TABLE).contains(1));
    }

    #[test]
    fn delete_not_found_removes_locally_but_reports() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.toggle_selected(TABLE, 2);

        let events = controller.apply_delete(TABLE, 2, Err(StoreError::NotFound));
        assert!(events.contains(&GridEvent::RowRemoved(TABLE, 2)));
        assert!(events.iter().any(|event| matches!(event, GridEvent::Status(_))));
        assert!(!controller.mirror(TABLE).contains(2));
        assert!(!controller.is_selected(TABLE, 2));
    }

    #[test]
    fn replace_rows_prunes_selection_and_closes_bound_session() {
        let mut controller = seeded();
        controller.set_edit_mode(TABLE, true);
        controller.toggle_selected(TABLE, 2);
        controller.activate(TABLE, RowId::Assigned(1));

        let events = controller.replace_rows(TABLE, vec![professor(1, "Ali")]);
        assert!(events.contains(&GridEvent::SessionClosed(
            TABLE,
            RowId::Assigned(1),
            CloseReason::ForcedOut
        )));
        assert!(controller.session().is_none());
        assert!(!controller.is_selected(TABLE, 2));
        assert_eq!(controller.mirror(TABLE).len(), 1);
    }
}
