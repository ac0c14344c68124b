//! The search store
//!
//! One explicitly owned value holding everything the search view shows:
//! filter, sort, pagination, rows, selection and banner state. It has no
//! interior mutability of its own; [`ResultTable`](crate::table::ResultTable)
//! owns it behind a mutex and is the only component that mutates it.

use crate::core::dog::{Dog, DogId};
use crate::core::error::ErrorResponse;
use crate::core::filter::{FilterCriteria, SortState};
use crate::core::pagination::PaginationState;
use crate::core::selection::SelectionSet;

/// Non-blocking message shown above the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBanner {
    Loading,
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Default)]
pub struct SearchStore {
    pub filter: FilterCriteria,
    pub sort: SortState,
    pub pagination: PaginationState,
    /// Records of the current page, in `result_ids` order
    pub rows: Vec<Dog>,
    pub selection: SelectionSet,
    pub loading: bool,
    pub error: Option<ErrorResponse>,
    /// Why the last match request failed, until the next attempt or
    /// selection change
    pub match_error: Option<ErrorResponse>,
    /// Last match handed to the match-result view
    pub matched: Option<DogId>,
}

impl SearchStore {
    pub fn new(sort: SortState) -> Self {
        Self {
            sort,
            ..Default::default()
        }
    }

    /// Ids of the rows currently shown
    pub fn visible_ids(&self) -> Vec<DogId> {
        self.rows.iter().map(|dog| dog.id.clone()).collect()
    }

    /// Banner to show, errors taking precedence over the loading notice
    ///
    /// A fetch error outranks a match error.
    pub fn banner(&self) -> Option<TableBanner> {
        if let Some(error) = self.error.as_ref().or(self.match_error.as_ref()) {
            Some(TableBanner::Error(error.clone()))
        } else if self.loading {
            Some(TableBanner::Loading)
        } else {
            None
        }
    }

    /// True when every visible row is selected (drives the header checkbox)
    pub fn all_visible_selected(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|dog| self.selection.contains(&dog.id))
    }
}
