// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableKind {
    Professors,
    Courses,
    FileLinks,
    Events,
}

impl TableKind {
    pub const ALL: [Self; 4] = [Self::Professors, Self::Courses, Self::FileLinks, Self::Events];

    /// Table name on the wire; must match the proxy's whitelist.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Professors => "professors",
            Self::Courses => "itcourses",
            Self::FileLinks => "file_link",
            Self::Events => "events",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "professors" => Some(Self::Professors),
            "itcourses" => Some(Self::Courses),
            "file_link" => Some(Self::FileLinks),
            "events" => Some(Self::Events),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Professors => "professors",
            Self::Courses => "courses",
            Self::FileLinks => "files",
            Self::Events => "events",
        }
    }

    pub const fn columns(self) -> &'static [ColumnSpec] {
        match self {
            Self::Professors => &PROFESSOR_COLUMNS,
            Self::Courses => &COURSE_COLUMNS,
            Self::FileLinks => &FILE_LINK_COLUMNS,
            Self::Events => &EVENT_COLUMNS,
        }
    }

    pub fn column(self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns().iter().find(|column| column.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    JalaliDate,
    TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub sortable: bool,
    pub identifier: bool,
}

impl ColumnSpec {
    const fn id() -> Self {
        Self {
            name: "id",
            kind: FieldKind::Text,
            sortable: true,
            identifier: true,
        }
    }

    const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            sortable: true,
            identifier: false,
        }
    }

    const fn unsorted(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            sortable: false,
            identifier: false,
        }
    }

    const fn date(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::JalaliDate,
            sortable: true,
            identifier: false,
        }
    }

    const fn time(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::TimeOfDay,
            sortable: true,
            identifier: false,
        }
    }
}

const PROFESSOR_COLUMNS: [ColumnSpec; 10] = [
    ColumnSpec::id(),
    ColumnSpec::text("Name"),
    ColumnSpec::text("Family"),
    ColumnSpec::text("Email"),
    ColumnSpec::text("Phone"),
    ColumnSpec::text("Degree"),
    ColumnSpec::text("Field"),
    ColumnSpec::text("University"),
    ColumnSpec::text("Rank"),
    ColumnSpec::text("Status"),
];

const COURSE_COLUMNS: [ColumnSpec; 9] = [
    ColumnSpec::id(),
    ColumnSpec::text("Name"),
    ColumnSpec::text("Unit"),
    ColumnSpec::text("Type"),
    ColumnSpec::text("Prerequisite"),
    ColumnSpec::text("Corequisite"),
    ColumnSpec::text("Professor_id"),
    ColumnSpec::text("Semester"),
    ColumnSpec::text("Status"),
];

const FILE_LINK_COLUMNS: [ColumnSpec; 5] = [
    ColumnSpec::id(),
    ColumnSpec::text("Name"),
    ColumnSpec::unsorted("Link"),
    ColumnSpec::text("Course_id"),
    ColumnSpec::text("Status"),
];

const EVENT_COLUMNS: [ColumnSpec; 7] = [
    ColumnSpec::id(),
    ColumnSpec::text("Title"),
    ColumnSpec::date("Start_date"),
    ColumnSpec::date("Finish_date"),
    ColumnSpec::time("Start_Hour"),
    ColumnSpec::unsorted("Description"),
    ColumnSpec::text("Status"),
];

/// Row identity. `Pending` marks the one not-yet-created placeholder a
/// table may carry while a creation is unsaved or in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowId {
    Assigned(i64),
    Pending,
}

impl RowId {
    pub const fn assigned(self) -> Option<i64> {
        match self {
            Self::Assigned(id) => Some(id),
            Self::Pending => None,
        }
    }

    pub fn display(self) -> String {
        match self {
            Self::Assigned(id) => id.to_string(),
            Self::Pending => "Auto".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub fields: BTreeMap<String, String>,
}

impl Row {
    pub fn new(id: RowId, fields: BTreeMap<String, String>) -> Self {
        Self { id, fields }
    }

    /// Placeholder row for the add-row flow: every non-identifier
    /// column blank, except the backend's `Status` default.
    pub fn blank(table: TableKind) -> Self {
        let mut fields = BTreeMap::new();
        for column in table.columns() {
            if column.identifier {
                continue;
            }
            let value = if column.name == "Status" { "active" } else { "" };
            fields.insert(column.name.to_owned(), value.to_owned());
        }
        Self {
            id: RowId::Pending,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_owned(), value.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}
