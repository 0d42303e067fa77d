// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use daftar_app::validation::{self, JalaliDate};
use daftar_app::{
    CloseReason, CommitOutcome, FieldKind, FieldPolicy, GridController, GridEvent, ListQuery,
    RemoteStore, RowId, SortDirection, TableKind, WriteOp, WriteRequest,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const SELECT_MARK: &str = "[x]";
const UNSELECT_MARK: &str = "[ ]";
const FLAG_MARK: &str = "!";
const FOCUS_MARK: &str = "▸";

/// Seed for the date picker when the field holds nothing parseable.
const PICKER_FALLBACK: JalaliDate = JalaliDate {
    year: 1404,
    month: 1,
    day: 1,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct DatePickerUiState {
    visible: bool,
    field: String,
    original: String,
    selected: Option<JalaliDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    active_table: TableKind,
    cursor: usize,
    field_cursor: usize,
    search_editing: bool,
    confirm_delete: bool,
    help_visible: bool,
    date_picker: DatePickerUiState,
    sorts: Vec<(TableKind, String, SortDirection)>,
    status: String,
    status_token: u64,
}

impl ViewData {
    fn new(start_table: TableKind) -> Self {
        Self {
            active_table: start_table,
            cursor: 0,
            field_cursor: 0,
            search_editing: false,
            confirm_delete: false,
            help_visible: false,
            date_picker: DatePickerUiState::default(),
            sorts: Vec::new(),
            status: String::new(),
            status_token: 0,
        }
    }

    fn sort_for(&self, table: TableKind) -> Option<(&str, SortDirection)> {
        self.sorts
            .iter()
            .find(|(entry, _, _)| *entry == table)
            .map(|(_, column, direction)| (column.as_str(), *direction))
    }

    fn set_sort(&mut self, table: TableKind, column: Option<(String, SortDirection)>) {
        self.sorts.retain(|(entry, _, _)| *entry != table);
        if let Some((column, direction)) = column {
            self.sorts.push((table, column, direction));
        }
    }
}

pub fn run_app<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    start_table: TableKind,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(start_table);
    let (internal_tx, internal_rx) = mpsc::channel();

    for table in TableKind::ALL {
        reload_table(controller, store, &mut view_data, &internal_tx, table);
    }

    let mut result = Ok(());
    loop {
        process_internal_events(controller, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, controller, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(controller, store, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    _controller: &mut GridController,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status.clear();
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status = message.into();
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

/// Surface controller events on the status line. The last event with a
/// message wins; most batches carry exactly one.
fn apply_events(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: &[GridEvent],
) {
    if let Some(message) = events.iter().rev().find_map(event_status) {
        emit_status(view_data, internal_tx, message);
    }
}

fn event_status(event: &GridEvent) -> Option<String> {
    match event {
        GridEvent::ModeChanged(table, true) => Some(format!("{} edit mode on", table.label())),
        GridEvent::ModeChanged(table, false) => Some(format!("{} edit mode off", table.label())),
        GridEvent::SessionOpened(_, row) => Some(format!("editing row {}", row.display())),
        GridEvent::SessionClosed(_, _, CloseReason::Saved) => Some("saved".to_owned()),
        GridEvent::SessionClosed(_, _, CloseReason::Cancelled) => Some("edit cancelled".to_owned()),
        GridEvent::SessionClosed(_, _, CloseReason::ForcedOut) => Some("edit closed".to_owned()),
        GridEvent::RowsReplaced(table, count) => {
            Some(format!("{count} {} rows loaded", table.label()))
        }
        GridEvent::WriteFailed(_, reason) => Some(format!("save failed: {reason}")),
        GridEvent::DeleteFailed(_, id, reason) => Some(format!("delete {id} failed: {reason}")),
        GridEvent::Status(text) => Some(text.clone()),
        GridEvent::RowAdded(_)
        | GridEvent::RowPatched(_, _)
        | GridEvent::RowRemoved(_, _)
        | GridEvent::SelectionChanged(_, _) => None,
    }
}

fn reload_table<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    table: TableKind,
) {
    let mut query = ListQuery::new();
    if let Some((column, direction)) = view_data.sort_for(table) {
        query = ListQuery::sorted(column, direction);
    }
    match store.list(table, &query) {
        Ok(rows) => {
            let events = controller.replace_rows(table, rows);
            apply_events(view_data, internal_tx, &events);
        }
        Err(error) => emit_status(view_data, internal_tx, error.to_string()),
    }
    clamp_cursor(controller, view_data);
}

fn clamp_cursor(controller: &GridController, view_data: &mut ViewData) {
    let visible = controller.visible_rows(view_data.active_table).len();
    view_data.cursor = view_data.cursor.min(visible.saturating_sub(1));
}

fn cursor_row_id(controller: &GridController, view_data: &ViewData) -> Option<RowId> {
    controller
        .visible_rows(view_data.active_table)
        .get(view_data.cursor)
        .map(|row| row.id)
}

fn session_fields(controller: &GridController) -> &'static [&'static str] {
    controller
        .session()
        .map(|session| FieldPolicy::for_table(session.table()).editable_fields())
        .unwrap_or(&[])
}

fn focused_field(controller: &GridController, view_data: &ViewData) -> Option<&'static str> {
    let fields = session_fields(controller);
    fields.get(view_data.field_cursor.min(fields.len().saturating_sub(1))).copied()
}

fn handle_key_event<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.date_picker.visible {
        handle_date_picker_key(controller, view_data, internal_tx, key);
        return false;
    }

    if view_data.confirm_delete {
        handle_confirm_delete_key(controller, store, view_data, internal_tx, key);
        return false;
    }

    if view_data.search_editing {
        handle_search_key(controller, view_data, key);
        return false;
    }

    if controller.session().is_some() {
        handle_session_key(controller, store, view_data, internal_tx, key);
        return false;
    }

    handle_nav_key(controller, store, view_data, internal_tx, key);
    false
}

fn handle_nav_key<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let table = view_data.active_table;
    match (key.code, key.modifiers) {
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        (KeyCode::Char('f') | KeyCode::Right, KeyModifiers::NONE) => {
            switch_table(view_data, 1);
            clamp_cursor(controller, view_data);
        }
        (KeyCode::Char('b') | KeyCode::Left, KeyModifiers::NONE) => {
            switch_table(view_data, -1);
            clamp_cursor(controller, view_data);
        }
        (KeyCode::Char('j') | KeyCode::Down, KeyModifiers::NONE) => {
            let visible = controller.visible_rows(table).len();
            if view_data.cursor + 1 < visible {
                view_data.cursor += 1;
            }
        }
        (KeyCode::Char('k') | KeyCode::Up, KeyModifiers::NONE) => {
            view_data.cursor = view_data.cursor.saturating_sub(1);
        }
        (KeyCode::Char('g'), KeyModifiers::NONE) => view_data.cursor = 0,
        (KeyCode::Char('G'), _) => {
            view_data.cursor = controller.visible_rows(table).len().saturating_sub(1);
        }
        (KeyCode::Char('/'), KeyModifiers::NONE) => view_data.search_editing = true,
        (KeyCode::Char('e'), KeyModifiers::NONE) => {
            let events = controller.set_edit_mode(table, !controller.edit_mode(table));
            apply_events(view_data, internal_tx, &events);
            clamp_cursor(controller, view_data);
        }
        (KeyCode::Enter, _) => {
            if let Some(id) = cursor_row_id(controller, view_data) {
                let events = controller.activate(table, id);
                if events
                    .iter()
                    .any(|event| matches!(event, GridEvent::SessionOpened(_, _)))
                {
                    view_data.field_cursor = 0;
                }
                apply_events(view_data, internal_tx, &events);
            }
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            let events = controller.add_row(table);
            if events
                .iter()
                .any(|event| matches!(event, GridEvent::SessionOpened(_, _)))
            {
                view_data.field_cursor = 0;
                view_data.cursor = controller.visible_rows(table).len().saturating_sub(1);
            }
            apply_events(view_data, internal_tx, &events);
        }
        (KeyCode::Char(' '), KeyModifiers::NONE) => {
            if let Some(RowId::Assigned(id)) = cursor_row_id(controller, view_data) {
                let events = controller.toggle_selected(table, id);
                apply_events(view_data, internal_tx, &events);
            }
        }
        (KeyCode::Char('A'), _) => {
            let events = controller.select_all_visible(table);
            apply_events(view_data, internal_tx, &events);
        }
        (KeyCode::Char('x'), KeyModifiers::NONE) => {
            let events = controller.clear_selection(table);
            apply_events(view_data, internal_tx, &events);
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            if controller.selection_len(table) == 0 {
                emit_status(view_data, internal_tx, "nothing selected");
            } else {
                view_data.confirm_delete = true;
            }
        }
        (KeyCode::Char('s'), KeyModifiers::NONE) => {
            cycle_sort(view_data, table);
            reload_table(controller, store, view_data, internal_tx, table);
        }
        (KeyCode::Char('S'), _) => {
            flip_sort(view_data, table);
            reload_table(controller, store, view_data, internal_tx, table);
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            reload_table(controller, store, view_data, internal_tx, table);
        }
        _ => {}
    }
}

fn handle_session_key<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            let events = controller.cancel();
            apply_events(view_data, internal_tx, &events);
            clamp_cursor(controller, view_data);
        }
        (KeyCode::Enter, _) => {
            commit_session(controller, store, view_data, internal_tx);
        }
        (KeyCode::Tab, _) => {
            let fields = session_fields(controller).len();
            if fields > 0 {
                view_data.field_cursor = (view_data.field_cursor + 1) % fields;
            }
        }
        (KeyCode::BackTab, _) => {
            let fields = session_fields(controller).len();
            if fields > 0 {
                view_data.field_cursor = view_data.field_cursor.checked_sub(1).unwrap_or(fields - 1);
            }
        }
        (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
            open_date_picker(controller, view_data, internal_tx);
        }
        (KeyCode::Backspace, _) => {
            if let Some(field) = focused_field(controller, view_data) {
                let current = controller
                    .session()
                    .and_then(|session| session.input(field))
                    .unwrap_or("")
                    .to_owned();
                let mut chars = current.chars();
                chars.next_back();
                let shorter = chars.as_str().to_owned();
                controller.set_input(field, shorter);
            }
        }
        (KeyCode::Char(ch), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
            if let Some(field) = focused_field(controller, view_data) {
                let mut current = controller
                    .session()
                    .and_then(|session| session.input(field))
                    .unwrap_or("")
                    .to_owned();
                current.push(ch);
                controller.set_input(field, current);
            }
        }
        _ => {}
    }
}

/// Frontend-side format check for typed date and time fields; the
/// controller only enforces required-field presence.
fn format_error(controller: &GridController) -> Option<String> {
    let session = controller.session()?;
    let table = session.table();
    for column in table.columns() {
        let Some(value) = session.input(column.name) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let error = match column.kind {
            FieldKind::Text => continue,
            FieldKind::JalaliDate => validation::parse_jalali_date(value).err(),
            FieldKind::TimeOfDay => validation::parse_time_of_day(value).err(),
        };
        if let Some(error) = error {
            return Some(format!("{}: {error}", column.name));
        }
    }
    None
}

fn commit_session<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if let Some(message) = format_error(controller) {
        emit_status(view_data, internal_tx, message);
        return;
    }

    match controller.commit() {
        CommitOutcome::NoSession => {}
        CommitOutcome::AlreadySaving => {
            emit_status(view_data, internal_tx, "save already in flight");
        }
        CommitOutcome::Invalid { missing } => {
            emit_status(
                view_data,
                internal_tx,
                format!("required: {}", missing.join(", ")),
            );
        }
        CommitOutcome::Dispatched(request) => {
            let events = deliver_write(controller, store, request);
            apply_events(view_data, internal_tx, &events);
            clamp_cursor(controller, view_data);
        }
    }
}

fn deliver_write<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    request: WriteRequest,
) -> Vec<GridEvent> {
    let result = match &request.op {
        WriteOp::Create { fields } => store.create(request.table, fields),
        WriteOp::Update { id, fields } => store.update(request.table, *id, fields),
    };
    controller.resolve_write(request.ticket, result)
}

fn handle_confirm_delete_key<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            view_data.confirm_delete = false;
            run_batch_delete(controller, store, view_data, internal_tx);
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            view_data.confirm_delete = false;
            emit_status(view_data, internal_tx, "delete cancelled");
        }
        _ => {}
    }
}

/// One DELETE per selected id; failures keep their rows and stay
/// selected for a retry.
fn run_batch_delete<S: RemoteStore>(
    controller: &mut GridController,
    store: &mut S,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let table = view_data.active_table;
    let mut deleted = 0usize;
    let mut failed = 0usize;
    for id in controller.selected_ids(table) {
        let result = store.delete(table, id);
        for event in controller.apply_delete(table, id, result) {
            match event {
                GridEvent::RowRemoved(_, _) => deleted += 1,
                GridEvent::DeleteFailed(_, _, _) => failed += 1,
                _ => {}
            }
        }
    }
    let message = if failed == 0 {
        format!("deleted {deleted} rows")
    } else {
        format!("deleted {deleted} rows, {failed} failed")
    };
    emit_status(view_data, internal_tx, message);
    clamp_cursor(controller, view_data);
}

fn handle_search_key(controller: &mut GridController, view_data: &mut ViewData, key: KeyEvent) {
    let table = view_data.active_table;
    match key.code {
        KeyCode::Esc => {
            controller.set_search(table, "");
            view_data.search_editing = false;
        }
        KeyCode::Enter => view_data.search_editing = false,
        KeyCode::Backspace => {
            let mut term = controller.search(table).to_owned();
            term.pop();
            controller.set_search(table, term);
        }
        KeyCode::Char(ch) => {
            let mut term = controller.search(table).to_owned();
            term.push(ch);
            controller.set_search(table, term);
        }
        _ => {}
    }
    clamp_cursor(controller, view_data);
}

fn switch_table(view_data: &mut ViewData, delta: isize) {
    let tables = TableKind::ALL;
    let current = tables
        .iter()
        .position(|table| *table == view_data.active_table)
        .unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(tables.len() as isize) as usize;
    view_data.active_table = tables[next];
    view_data.cursor = 0;
}

fn sortable_columns(table: TableKind) -> Vec<&'static str> {
    table
        .columns()
        .iter()
        .filter(|column| column.sortable)
        .map(|column| column.name)
        .collect()
}

/// Cycle: unsorted -> first sortable column -> next -> ... -> unsorted.
fn cycle_sort(view_data: &mut ViewData, table: TableKind) {
    let columns = sortable_columns(table);
    let next = match view_data.sort_for(table) {
        None => columns.first().copied(),
        Some((current, _)) => {
            let position = columns.iter().position(|name| *name == current);
            position.and_then(|index| columns.get(index + 1).copied())
        }
    };
    view_data.set_sort(
        table,
        next.map(|column| (column.to_owned(), SortDirection::Asc)),
    );
}

fn flip_sort(view_data: &mut ViewData, table: TableKind) {
    let flipped = view_data.sort_for(table).map(|(column, direction)| {
        let direction = match direction {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        };
        (column.to_owned(), direction)
    });
    view_data.set_sort(table, flipped);
}

fn open_date_picker(
    controller: &GridController,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(field) = focused_field(controller, view_data) else {
        return;
    };
    let Some(session) = controller.session() else {
        return;
    };
    let kind = session
        .table()
        .column(field)
        .map(|column| column.kind)
        .unwrap_or(FieldKind::Text);
    if kind != FieldKind::JalaliDate {
        emit_status(view_data, internal_tx, "not a date field");
        return;
    }

    let original = session.input(field).unwrap_or("").to_owned();
    let selected = validation::parse_jalali_date(&original)
        .ok()
        .unwrap_or(PICKER_FALLBACK);
    view_data.date_picker = DatePickerUiState {
        visible: true,
        field: field.to_owned(),
        original,
        selected: Some(selected),
    };
}

fn handle_date_picker_key(
    controller: &mut GridController,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(date) = view_data.date_picker.selected else {
        view_data.date_picker = DatePickerUiState::default();
        return;
    };

    let shifted = match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            view_data.date_picker = DatePickerUiState::default();
            return;
        }
        (KeyCode::Enter, _) => {
            let field = view_data.date_picker.field.clone();
            controller.set_input(&field, date.format());
            view_data.date_picker = DatePickerUiState::default();
            emit_status(view_data, internal_tx, format!("{field} = {}", date.format()));
            return;
        }
        (KeyCode::Char('h') | KeyCode::Left, KeyModifiers::NONE) => shift_days(date, -1),
        (KeyCode::Char('l') | KeyCode::Right, KeyModifiers::NONE) => shift_days(date, 1),
        (KeyCode::Char('j') | KeyCode::Down, KeyModifiers::NONE) => shift_days(date, 7),
        (KeyCode::Char('k') | KeyCode::Up, KeyModifiers::NONE) => shift_days(date, -7),
        (KeyCode::Char('H'), _) => shift_months(date, -1),
        (KeyCode::Char('L'), _) => shift_months(date, 1),
        (KeyCode::Char('['), KeyModifiers::NONE) => shift_years(date, -1),
        (KeyCode::Char(']'), KeyModifiers::NONE) => shift_years(date, 1),
        _ => date,
    };
    view_data.date_picker.selected = Some(shifted);
}

const fn day_cap(month: u8) -> u8 {
    if month <= 6 { 31 } else { 30 }
}

fn shift_days(date: JalaliDate, delta: i32) -> JalaliDate {
    let mut current = date;
    let step = if delta < 0 { -1 } else { 1 };
    for _ in 0..delta.abs() {
        if step > 0 {
            if current.day < day_cap(current.month) {
                current.day += 1;
            } else if current.month < 12 {
                current.month += 1;
                current.day = 1;
            } else {
                current.year += 1;
                current.month = 1;
                current.day = 1;
            }
        } else if current.day > 1 {
            current.day -= 1;
        } else if current.month > 1 {
            current.month -= 1;
            current.day = day_cap(current.month);
        } else {
            current.year -= 1;
            current.month = 12;
            current.day = day_cap(12);
        }
    }
    current
}

fn shift_months(date: JalaliDate, delta: i32) -> JalaliDate {
    let zero_based = date.month as i32 - 1 + delta;
    let year = date.year + zero_based.div_euclid(12);
    let month = (zero_based.rem_euclid(12) + 1) as u8;
    JalaliDate {
        year,
        month,
        day: date.day.min(day_cap(month)),
    }
}

fn shift_years(date: JalaliDate, delta: i32) -> JalaliDate {
    JalaliDate {
        year: date.year + delta,
        month: date.month,
        day: date.day.min(day_cap(date.month)),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, controller: &GridController, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = TableKind::ALL
        .iter()
        .position(|table| *table == view_data.active_table)
        .unwrap_or(0);
    let tab_titles = TableKind::ALL
        .iter()
        .map(|table| tab_title(*table, controller))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("daftar").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_grid(frame, layout[1], controller, view_data);

    let status = status_text(controller, view_data);
    let status_widget = Paragraph::new(status)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if view_data.confirm_delete {
        let area = centered_rect(48, 24, frame.area());
        frame.render_widget(Clear, area);
        let count = controller.selection_len(view_data.active_table);
        let confirm = Paragraph::new(format!(
            "delete {count} selected {} rows?\n\ny yes | n no",
            view_data.active_table.label()
        ))
        .block(
            Block::default()
                .title("confirm delete")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(confirm, area);
    }

    if view_data.date_picker.visible {
        let area = centered_rect(48, 30, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(render_date_picker_overlay_text(&view_data.date_picker))
            .block(Block::default().title("date").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if view_data.help_visible {
        let area = centered_rect(80, 66, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn tab_title(table: TableKind, controller: &GridController) -> String {
    let mut title = table.label().to_owned();
    if controller.edit_mode(table) {
        title.push_str(" [edit]");
    }
    let selected = controller.selection_len(table);
    if selected > 0 {
        title.push_str(&format!(" ({selected})"));
    }
    if !controller.search(table).trim().is_empty() {
        title.push_str(" ▼");
    }
    title
}

fn render_grid(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    controller: &GridController,
    view_data: &ViewData,
) {
    let table = view_data.active_table;
    let columns = table.columns();
    let edit_mode = controller.edit_mode(table);
    let session = controller.session().filter(|session| session.table() == table);

    let mut header_cells = Vec::new();
    if edit_mode {
        header_cells.push(Cell::from("sel"));
    }
    for column in columns {
        let mut label = column.name.to_owned();
        if let Some((sorted, direction)) = view_data.sort_for(table)
            && sorted == column.name
        {
            label.push_str(match direction {
                SortDirection::Asc => " ↑",
                SortDirection::Desc => " ↓",
            });
        }
        header_cells.push(Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let header = Row::new(header_cells);

    let visible = controller.visible_rows(table);
    let focused = focused_field(controller, view_data);
    let rows = visible.iter().enumerate().map(|(row_index, row)| {
        let cursor_row = row_index == view_data.cursor;
        let editing_row = session.is_some_and(|session| session.row_id() == row.id);

        let mut cells = Vec::new();
        if edit_mode {
            let mark = match row.id.assigned() {
                Some(id) if controller.is_selected(table, id) => SELECT_MARK,
                Some(_) => UNSELECT_MARK,
                None => "",
            };
            cells.push(Cell::from(mark));
        }
        for column in columns {
            let text = if column.identifier {
                row.id.display()
            } else if editing_row {
                let session = session.expect("editing row implies session");
                match session.input(column.name) {
                    Some(value) => {
                        let mut text = String::new();
                        if focused == Some(column.name) {
                            text.push_str(FOCUS_MARK);
                        }
                        text.push_str(value);
                        if session.is_flagged(column.name) {
                            text.push_str(FLAG_MARK);
                        }
                        text
                    }
                    None => row.field(column.name).to_owned(),
                }
            } else {
                row.field(column.name).to_owned()
            };

            let mut style = Style::default();
            if editing_row {
                style = style.fg(Color::Black).bg(Color::Cyan);
            } else if cursor_row {
                style = style.bg(Color::DarkGray);
            }
            cells.push(Cell::from(text).style(style));
        }
        Row::new(cells)
    });

    let column_count = columns.len() + usize::from(edit_mode);
    let widths = vec![Constraint::Min(6); column_count];
    let grid = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(grid_title(controller, view_data))
                .borders(Borders::ALL),
        );
    frame.render_widget(grid, area);
}

fn grid_title(controller: &GridController, view_data: &ViewData) -> String {
    let table = view_data.active_table;
    let visible = controller.visible_rows(table).len();
    let total = controller.mirror(table).len();
    if visible == total {
        format!("{} ({total})", table.label())
    } else {
        format!("{} ({visible}/{total})", table.label())
    }
}

fn status_text(controller: &GridController, view_data: &ViewData) -> String {
    if view_data.search_editing {
        return format!(
            "search: {}_  (enter keep, esc clear)",
            controller.search(view_data.active_table)
        );
    }
    if !view_data.status.is_empty() {
        return view_data.status.clone();
    }
    if let Some(session) = controller.session() {
        if session.is_saving() {
            return "saving...".to_owned();
        }
        return "tab field | type edit | ctrl+d date | enter save | esc cancel".to_owned();
    }
    if controller.edit_mode(view_data.active_table) {
        return "enter edit | a add | space select | A all | d delete | e done | ? help".to_owned();
    }
    "b/f tables | j/k rows | / search | e edit mode | r reload | ? help".to_owned()
}

fn render_date_picker_overlay_text(date_picker: &DatePickerUiState) -> String {
    let selected = date_picker
        .selected
        .map(JalaliDate::format)
        .unwrap_or_else(|| "-".to_owned());
    let original = if date_picker.original.trim().is_empty() {
        "(empty)".to_owned()
    } else {
        date_picker.original.clone()
    };
    [
        format!("field: {}", date_picker.field),
        format!("orig: {original}"),
        format!("pick: {selected}"),
        String::new(),
        "h/l day | j/k week | H/L month | [/] year".to_owned(),
        "enter pick | esc cancel".to_owned(),
    ]
    .join("\n")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
nav: j/k rows | g/G first/last | b/f tables | / search | r reload\n\
nav: s sort column | S flip order\n\
edit mode: e toggle | enter edit row | a add row\n\
edit mode: space select | A select all shown | x clear | d delete selected\n\
row edit: tab/shift+tab field | type to edit | ctrl+d date picker\n\
row edit: enter save | esc cancel\n\
date picker: h/l day j/k week H/L month [/] year enter pick esc cancel"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        ViewData, cycle_sort, event_status, flip_sort, handle_key_event, handle_search_key,
        help_overlay_text, shift_days, shift_months, status_text, tab_title,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use daftar_app::validation::JalaliDate;
    use daftar_app::{
        CloseReason, GridController, GridEvent, ListQuery, RemoteStore, RowId, SortDirection,
        TableKind,
    };
    use daftar_testkit::MemoryStore;
    use std::sync::mpsc;

    const TABLE: TableKind = TableKind::Professors;

    fn fixture() -> (GridController, MemoryStore, ViewData) {
        let mut store = MemoryStore::seeded();
        let mut controller = GridController::new();
        for table in TableKind::ALL {
            let rows = store.list(table, &ListQuery::new()).expect("seeded list");
            controller.replace_rows(table, rows);
        }
        (controller, store, ViewData::new(TABLE))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(
        controller: &mut GridController,
        store: &mut MemoryStore,
        view_data: &mut ViewData,
        code: KeyCode,
    ) -> bool {
        let (tx, _rx) = mpsc::channel();
        handle_key_event(controller, store, view_data, &tx, key(code))
    }

    #[test]
    fn ctrl_q_quits() {
        let (mut controller, mut store, mut view_data) = fixture();
        let (tx, _rx) = mpsc::channel();
        let quit = handle_key_event(
            &mut controller,
            &mut store,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        );
        assert!(quit);
    }

    #[test]
    fn full_inline_edit_flow_through_keys() {
        let (mut controller, mut store, mut view_data) = fixture();

        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('e'));
        assert!(controller.edit_mode(TABLE));

        press(&mut controller, &mut store, &mut view_data, KeyCode::Enter);
        assert!(controller.session().is_some());

        // First editable field for professors is Name; replace it.
        for _ in 0.."Ali".len() {
            press(&mut controller, &mut store, &mut view_data, KeyCode::Backspace);
        }
        for ch in "Hossein".chars() {
            press(&mut controller, &mut store, &mut view_data, KeyCode::Char(ch));
        }
        press(&mut controller, &mut store, &mut view_data, KeyCode::Enter);

        assert!(controller.session().is_none());
        assert_eq!(
            controller.mirror(TABLE).get(1).map(|row| row.field("Name")),
            Some("Hossein")
        );
        assert_eq!(store.rows(TABLE)[0].field("Name"), "Hossein");
    }

    #[test]
    fn escape_reverts_typed_edits() {
        let (mut controller, mut store, mut view_data) = fixture();
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('e'));
        press(&mut controller, &mut store, &mut view_data, KeyCode::Enter);
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('Z'));
        press(&mut controller, &mut store, &mut view_data, KeyCode::Esc);

        assert!(controller.session().is_none());
        assert_eq!(
            controller.mirror(TABLE).get(1).map(|row| row.field("Name")),
            Some("Ali")
        );
    }

    #[test]
    fn selection_and_batch_delete_via_keys() {
        let (mut controller, mut store, mut view_data) = fixture();
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('e'));
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char(' '));
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('j'));
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char(' '));
        assert_eq!(controller.selection_len(TABLE), 2);

        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('d'));
        assert!(view_data.confirm_delete);
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('y'));

        assert!(!view_data.confirm_delete);
        assert_eq!(controller.selection_len(TABLE), 0);
        assert!(!controller.mirror(TABLE).contains(1));
        assert!(!controller.mirror(TABLE).contains(2));
        assert_eq!(store.rows(TABLE).len(), 3);
    }

    #[test]
    fn search_keys_drive_the_filter() {
        let (mut controller, _store, mut view_data) = fixture();
        view_data.search_editing = true;
        for ch in "karimi".chars() {
            handle_search_key(&mut controller, &mut view_data, key(KeyCode::Char(ch)));
        }
        assert_eq!(controller.visible_rows(TABLE).len(), 1);

        handle_search_key(&mut controller, &mut view_data, key(KeyCode::Esc));
        assert!(!view_data.search_editing);
        assert_eq!(controller.search(TABLE), "");
        assert_eq!(controller.visible_rows(TABLE).len(), 5);
    }

    #[test]
    fn invalid_date_blocks_the_save_locally() {
        let (mut controller, mut store, mut view_data) = fixture();
        view_data.active_table = TableKind::Events;
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('e'));
        press(&mut controller, &mut store, &mut view_data, KeyCode::Enter);
        let session = controller.session().expect("session open");
        assert_eq!(session.table(), TableKind::Events);

        // Move to Start_date and corrupt it.
        press(&mut controller, &mut store, &mut view_data, KeyCode::Tab);
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('x'));
        press(&mut controller, &mut store, &mut view_data, KeyCode::Enter);

        assert!(controller.session().is_some(), "commit must be blocked");
        assert!(view_data.status.contains("Start_date"));
    }

    #[test]
    fn sort_cycles_through_sortable_columns_and_back() {
        let (_, _, mut view_data) = fixture();
        cycle_sort(&mut view_data, TableKind::FileLinks);
        assert_eq!(
            view_data.sort_for(TableKind::FileLinks),
            Some(("id", SortDirection::Asc))
        );
        // Link is not sortable and must be skipped.
        cycle_sort(&mut view_data, TableKind::FileLinks);
        cycle_sort(&mut view_data, TableKind::FileLinks);
        cycle_sort(&mut view_data, TableKind::FileLinks);
        assert_eq!(
            view_data.sort_for(TableKind::FileLinks),
            Some(("Status", SortDirection::Asc))
        );
        cycle_sort(&mut view_data, TableKind::FileLinks);
        assert_eq!(view_data.sort_for(TableKind::FileLinks), None);

        cycle_sort(&mut view_data, TableKind::FileLinks);
        flip_sort(&mut view_data, TableKind::FileLinks);
        assert_eq!(
            view_data.sort_for(TableKind::FileLinks),
            Some(("id", SortDirection::Desc))
        );
    }

    #[test]
    fn date_picker_arithmetic_respects_jalali_month_caps() {
        let date = JalaliDate {
            year: 1403,
            month: 6,
            day: 31,
        };
        assert_eq!(
            shift_days(date, 1),
            JalaliDate {
                year: 1403,
                month: 7,
                day: 1
            }
        );
        assert_eq!(
            shift_months(date, 1),
            JalaliDate {
                year: 1403,
                month: 7,
                day: 30
            }
        );
        assert_eq!(
            shift_months(date, 7),
            JalaliDate {
                year: 1404,
                month: 1,
                day: 31
            }
        );
        let year_end = JalaliDate {
            year: 1403,
            month: 12,
            day: 30,
        };
        assert_eq!(
            shift_days(year_end, 1),
            JalaliDate {
                year: 1404,
                month: 1,
                day: 1
            }
        );
    }

    #[test]
    fn status_line_reflects_mode_and_session() {
        let (mut controller, mut store, mut view_data) = fixture();
        assert!(status_text(&controller, &view_data).contains("e edit mode"));

        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('e'));
        view_data.status.clear();
        assert!(status_text(&controller, &view_data).contains("a add"));

        press(&mut controller, &mut store, &mut view_data, KeyCode::Enter);
        view_data.status.clear();
        assert!(status_text(&controller, &view_data).contains("esc cancel"));
    }

    #[test]
    fn tab_titles_carry_mode_and_selection_badges() {
        let (mut controller, mut store, mut view_data) = fixture();
        assert_eq!(tab_title(TABLE, &controller), "professors");

        press(&mut controller, &mut store, &mut view_data, KeyCode::Char('e'));
        press(&mut controller, &mut store, &mut view_data, KeyCode::Char(' '));
        assert_eq!(tab_title(TABLE, &controller), "professors [edit] (1)");
    }

    #[test]
    fn event_statuses_cover_the_lifecycle() {
        assert_eq!(
            event_status(&GridEvent::SessionClosed(
                TABLE,
                RowId::Assigned(1),
                CloseReason::Saved
            )),
            Some("saved".to_owned())
        );
        assert_eq!(
            event_status(&GridEvent::WriteFailed(TABLE, "boom".to_owned())),
            Some("save failed: boom".to_owned())
        );
        assert_eq!(event_status(&GridEvent::RowPatched(TABLE, RowId::Pending)), None);
    }

    #[test]
    fn help_text_documents_every_surface() {
        let help = help_overlay_text();
        for needle in ["ctrl+q", "date picker", "select all", "search"] {
            assert!(help.contains(needle), "help should mention {needle}");
        }
    }
}
