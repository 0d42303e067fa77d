// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

/// Row identifiers chosen for a pending batch operation. Only rows with
/// assigned identifiers are selectable; the placeholder row never is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSet {
    ids: BTreeSet<i64>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Returns whether the id is selected after the toggle.
    pub fn toggle(&mut self, id: i64) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: i64) {
        self.ids.insert(id);
    }

    pub fn remove(&mut self, id: i64) -> bool {
        self.ids.remove(&id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn retain(&mut self, keep: impl FnMut(&i64) -> bool) {
        self.ids.retain(keep);
    }

    pub fn to_vec(&self) -> Vec<i64> {
        self.ids.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionSet;

    #[test]
    fn toggle_reports_resulting_state() {
        let mut selection = SelectionSet::new();
        assert!(selection.toggle(3));
        assert!(selection.contains(3));
        assert!(!selection.toggle(3));
        assert!(selection.is_empty());
    }

    #[test]
    fn retain_prunes_stale_ids_in_order() {
        let mut selection = SelectionSet::new();
        selection.insert(5);
        selection.insert(1);
        selection.insert(9);
        selection.retain(|id| *id != 5);
        assert_eq!(selection.to_vec(), vec![1, 9]);
    }
}
