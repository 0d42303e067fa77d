// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use daftar_app::{ListQuery, RemoteStore, Row, RowId, SortDirection, StoreError, StoreResult, TableKind};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory stand-in for the CRUD proxy. Mimics the proxy's list
/// semantics (substring search, column sort, limit/offset) and carries
/// switches for forcing write and delete failures.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: BTreeMap<TableKind, Vec<Row>>,
    next_id: i64,
    fail_next_write: Option<String>,
    fail_delete_of: BTreeSet<i64>,
    offline: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let tables = TableKind::ALL
            .into_iter()
            .map(|table| (table, Vec::new()))
            .collect();
        Self {
            tables,
            next_id: 1,
            fail_next_write: None,
            fail_delete_of: BTreeSet::new(),
            offline: false,
        }
    }

    /// Store populated with a small campus data set, for `--demo` and
    /// editor tests.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        for (name, family, email, degree, field, rank) in [
            ("Ali", "Ahmadi", "a.ahmadi@uni.example", "PhD", "Databases", "Professor"),
            ("Sara", "Karimi", "s.karimi@uni.example", "PhD", "Networks", "Associate"),
            ("Reza", "Moradi", "r.moradi@uni.example", "MSc", "Software Eng", "Lecturer"),
            ("Niloofar", "Hosseini", "n.hosseini@uni.example", "PhD", "AI", "Assistant"),
            ("Hamed", "Rahimi", "h.rahimi@uni.example", "PhD", "Security", "Associate"),
        ] {
            store.seed_row(
                TableKind::Professors,
                &[
                    ("Name", name),
                    ("Family", family),
                    ("Email", email),
                    ("Phone", "021-88001122"),
                    ("Degree", degree),
                    ("Field", field),
                    ("University", "Tehran IT Institute"),
                    ("Rank", rank),
                ],
            );
        }
        for (name, unit, kind, prereq, professor) in [
            ("Database Systems", "3", "Core", "", "1"),
            ("Computer Networks", "3", "Core", "", "2"),
            ("Software Engineering", "3", "Core", "Database Systems", "3"),
            ("Machine Learning", "3", "Elective", "Statistics", "4"),
            ("Network Security", "2", "Elective", "Computer Networks", "5"),
        ] {
            store.seed_row(
                TableKind::Courses,
                &[
                    ("Name", name),
                    ("Unit", unit),
                    ("Type", kind),
                    ("Prerequisite", prereq),
                    ("Corequisite", ""),
                    ("Professor_id", professor),
                    ("Semester", "1403-1"),
                ],
            );
        }
        for (name, link, course) in [
            ("DB lecture notes", "https://files.example/db-notes.pdf", "1"),
            ("Networks lab pack", "https://files.example/net-lab.zip", "2"),
            ("ML assignment 1", "https://files.example/ml-hw1.pdf", "4"),
        ] {
            store.seed_row(
                TableKind::FileLinks,
                &[("Name", name), ("Link", link), ("Course_id", course)],
            );
        }
        for (title, start, finish, hour, description) in [
            (
                "Registration opens",
                "1403/06/20",
                "1403/06/25",
                "08:00",
                "Course registration for the fall term",
            ),
            (
                "Midterm exams",
                "1403/08/15",
                "1403/08/22",
                "09:00",
                "All core course midterms",
            ),
            (
                "Research seminar",
                "1403/09/05",
                "1403/09/05",
                "14:30",
                "Guest talk on distributed storage",
            ),
        ] {
            store.seed_row(
                TableKind::Events,
                &[
                    ("Title", title),
                    ("Start_date", start),
                    ("Finish_date", finish),
                    ("Start_Hour", hour),
                    ("Description", description),
                ],
            );
        }
        store
    }

    fn seed_row(&mut self, table: TableKind, fields: &[(&str, &str)]) {
        let mut row = Row::blank(table);
        row.id = RowId::Assigned(self.next_id);
        self.next_id += 1;
        for (name, value) in fields {
            row.set_field(name, *value);
        }
        self.tables
            .get_mut(&table)
            .expect("every table is registered")
            .push(row);
    }

    /// Next create or update returns `StoreError::Write(reason)`.
    pub fn fail_next_write(&mut self, reason: impl Into<String>) {
        self.fail_next_write = Some(reason.into());
    }

    /// Deletes of this id return `StoreError::Write` until cleared.
    pub fn fail_delete_of(&mut self, id: i64) {
        self.fail_delete_of.insert(id);
    }

    /// All calls return `StoreError::Fetch` until turned back on.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn rows(&self, table: TableKind) -> &[Row] {
        self.tables.get(&table).expect("every table is registered")
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline {
            Err(StoreError::Fetch("connection refused".to_owned()))
        } else {
            Ok(())
        }
    }

    fn take_write_failure(&mut self) -> StoreResult<()> {
        match self.fail_next_write.take() {
            Some(reason) => Err(StoreError::Write(reason)),
            None => Ok(()),
        }
    }
}

impl RemoteStore for MemoryStore {
    fn list(&mut self, table: TableKind, query: &ListQuery) -> StoreResult<Vec<Row>> {
        self.check_online()?;
        let mut rows: Vec<Row> = self
            .rows(table)
            .iter()
            .filter(|row| match &query.search {
                Some(term) => {
                    let needle = term.to_lowercase();
                    row.fields
                        .values()
                        .any(|value| value.to_lowercase().contains(&needle))
                }
                None => true,
            })
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            if table.column(sort).is_some_and(|column| column.sortable) {
                rows.sort_by(|a, b| match sort.as_str() {
                    "id" => a.id.cmp(&b.id),
                    name => a.field(name).cmp(b.field(name)),
                });
                if query.order == Some(SortDirection::Desc) {
                    rows.reverse();
                }
            }
        }

        let offset = query.offset.unwrap_or(0).min(rows.len());
        let mut rows = rows.split_off(offset);
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn create(&mut self, table: TableKind, fields: &BTreeMap<String, String>) -> StoreResult<Row> {
        self.check_online()?;
        self.take_write_failure()?;
        let mut row = Row::blank(table);
        row.id = RowId::Assigned(self.next_id);
        self.next_id += 1;
        for (name, value) in fields {
            row.set_field(name, value.clone());
        }
        self.tables
            .get_mut(&table)
            .expect("every table is registered")
            .push(row.clone());
        Ok(row)
    }

    fn update(
        &mut self,
        table: TableKind,
        id: i64,
        fields: &BTreeMap<String, String>,
    ) -> StoreResult<Row> {
        self.check_online()?;
        self.take_write_failure()?;
        let rows = self.tables.get_mut(&table).expect("every table is registered");
        let row = rows
            .iter_mut()
            .find(|row| row.id == RowId::Assigned(id))
            .ok_or(StoreError::NotFound)?;
        for (name, value) in fields {
            row.set_field(name, value.clone());
        }
        Ok(row.clone())
    }

    fn delete(&mut self, table: TableKind, id: i64) -> StoreResult<()> {
        self.check_online()?;
        if self.fail_delete_of.contains(&id) {
            return Err(StoreError::Write(format!(
                "row {id} is referenced by another table"
            )));
        }
        let rows = self.tables.get_mut(&table).expect("every table is registered");
        let position = rows
            .iter()
            .position(|row| row.id == RowId::Assigned(id))
            .ok_or(StoreError::NotFound)?;
        rows.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use daftar_app::{ListQuery, RemoteStore, SortDirection, StoreError, TableKind};
    use std::collections::BTreeMap;

    #[test]
    fn seeded_store_lists_every_table() {
        let mut store = MemoryStore::seeded();
        for table in TableKind::ALL {
            let rows = store.list(table, &ListQuery::new()).expect("list succeeds");
            assert!(!rows.is_empty(), "{table:?} should be seeded");
        }
    }

    #[test]
    fn list_search_matches_any_column() {
        let mut store = MemoryStore::seeded();
        let query = ListQuery {
            search: Some("KARIMI".to_owned()),
            ..ListQuery::new()
        };
        let rows = store
            .list(TableKind::Professors, &query)
            .expect("list succeeds");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field("Family"), "Karimi");
    }

    #[test]
    fn list_sorts_and_pages() {
        let mut store = MemoryStore::seeded();
        let query = ListQuery {
            limit: Some(2),
            offset: Some(1),
            ..ListQuery::sorted("Name", SortDirection::Asc)
        };
        let rows = store
            .list(TableKind::Professors, &query)
            .expect("list succeeds");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field("Name"), "Hamed");
    }

    #[test]
    fn create_assigns_fresh_identifier() {
        let mut store = MemoryStore::new();
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_owned(), "Compilers".to_owned());
        let row = store
            .create(TableKind::Courses, &fields)
            .expect("create succeeds");
        assert_eq!(row.id.assigned(), Some(1));
        assert_eq!(row.field("Name"), "Compilers");
    }

    #[test]
    fn failure_switches_fire_once_or_per_id() {
        let mut store = MemoryStore::seeded();
        store.fail_next_write("duplicate email");
        let fields = BTreeMap::new();
        assert_eq!(
            store.update(TableKind::Professors, 1, &fields),
            Err(StoreError::Write("duplicate email".to_owned()))
        );
        assert!(store.update(TableKind::Professors, 1, &fields).is_ok());

        store.fail_delete_of(2);
        assert!(matches!(
            store.delete(TableKind::Professors, 2),
            Err(StoreError::Write(_))
        ));
        assert!(store.delete(TableKind::Professors, 3).is_ok());
    }

    #[test]
    fn missing_ids_surface_not_found() {
        let mut store = MemoryStore::new();
        assert_eq!(
            store.delete(TableKind::Events, 42),
            Err(StoreError::NotFound)
        );
        assert_eq!(
            store.update(TableKind::Events, 42, &BTreeMap::new()),
            Err(StoreError::NotFound)
        );
    }
}
