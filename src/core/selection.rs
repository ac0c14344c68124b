//! Favorites selection set
//!
//! Independent of pagination: members may reference dogs that are not on
//! the page currently shown. Insertion order is kept so the favorites list
//! reads in the order dogs were picked.

use crate::core::dog::DogId;
use indexmap::IndexSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: IndexSet<DogId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the id if absent, remove it if present
    ///
    /// Returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: &DogId) -> bool {
        if self.ids.shift_remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    /// Select or deselect exactly the given visible ids
    ///
    /// Ids outside `visible` are never touched. Returns whether the set changed.
    pub fn set_all<'a>(&mut self, visible: impl IntoIterator<Item = &'a DogId>, selected: bool) -> bool {
        let mut changed = false;
        for id in visible {
            changed |= if selected {
                self.ids.insert(id.clone())
            } else {
                self.ids.shift_remove(id)
            };
        }
        changed
    }

    pub fn contains(&self, id: &DogId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &DogId> {
        self.ids.iter()
    }

    pub fn to_vec(&self) -> Vec<DogId> {
        self.ids.iter().cloned().collect()
    }

    /// Same members, ignoring the order they were picked in
    pub fn same_members(&self, other: &SelectionSet) -> bool {
        self.len() == other.len() && self.ids.iter().all(|id| other.contains(id))
    }
}

impl FromIterator<DogId> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = DogId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
