// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::TableKind;
use std::collections::BTreeMap;

/// Per-table declaration of which fields the operator may edit and
/// which must be non-blank before a save is dispatched. The identifier
/// column is never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    editable: &'static [&'static str],
    required: &'static [&'static str],
}

const PROFESSOR_POLICY: FieldPolicy = FieldPolicy {
    editable: &[
        "Name",
        "Family",
        "Email",
        "Phone",
        "Degree",
        "Field",
        "University",
        "Rank",
        "Status",
    ],
    required: &["Name", "Family", "Email"],
};

const COURSE_POLICY: FieldPolicy = FieldPolicy {
    editable: &[
        "Name",
        "Unit",
        "Type",
        "Prerequisite",
        "Corequisite",
        "Professor_id",
        "Semester",
        "Status",
    ],
    required: &["Name", "Unit", "Type"],
};

const FILE_LINK_POLICY: FieldPolicy = FieldPolicy {
    editable: &["Name", "Link", "Course_id", "Status"],
    required: &["Name", "Link", "Course_id"],
};

const EVENT_POLICY: FieldPolicy = FieldPolicy {
    editable: &[
        "Title",
        "Start_date",
        "Finish_date",
        "Start_Hour",
        "Description",
        "Status",
    ],
    required: &["Title", "Start_date"],
};

impl FieldPolicy {
    pub const fn for_table(table: TableKind) -> &'static Self {
        match table {
            TableKind::Professors => &PROFESSOR_POLICY,
            TableKind::Courses => &COURSE_POLICY,
            TableKind::FileLinks => &FILE_LINK_POLICY,
            TableKind::Events => &EVENT_POLICY,
        }
    }

    pub fn is_editable(&self, field: &str) -> bool {
        self.editable.contains(&field)
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.required.contains(&field)
    }

    pub const fn editable_fields(&self) -> &'static [&'static str] {
        self.editable
    }

    pub const fn required_fields(&self) -> &'static [&'static str] {
        self.required
    }

    /// Required fields whose input is blank after trimming, in policy
    /// order. Empty result means the commit may proceed.
    pub fn missing_required(&self, inputs: &BTreeMap<String, String>) -> Vec<String> {
        self.required
            .iter()
            .filter(|field| {
                inputs
                    .get(**field)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .map(|field| (*field).to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::FieldPolicy;
    use crate::TableKind;
    use std::collections::BTreeMap;

    #[test]
    fn identifier_is_never_editable() {
        for table in TableKind::ALL {
            assert!(!FieldPolicy::for_table(table).is_editable("id"));
        }
    }

    #[test]
    fn required_fields_are_a_subset_of_editable_fields() {
        for table in TableKind::ALL {
            let policy = FieldPolicy::for_table(table);
            for field in policy.required_fields() {
                assert!(policy.is_editable(field), "{field} on {}", table.as_str());
            }
        }
    }

    #[test]
    fn missing_required_flags_blank_and_whitespace_values() {
        let policy = FieldPolicy::for_table(TableKind::Professors);
        let mut inputs = BTreeMap::new();
        inputs.insert("Name".to_owned(), "Ali".to_owned());
        inputs.insert("Family".to_owned(), "   ".to_owned());

        let missing = policy.missing_required(&inputs);
        assert_eq!(missing, vec!["Family".to_owned(), "Email".to_owned()]);
    }

    #[test]
    fn missing_required_is_empty_for_complete_inputs() {
        let policy = FieldPolicy::for_table(TableKind::Events);
        let mut inputs = BTreeMap::new();
        inputs.insert("Title".to_owned(), "Orientation".to_owned());
        inputs.insert("Start_date".to_owned(), "1403/07/01".to_owned());
        assert!(policy.missing_required(&inputs).is_empty());
    }
}
