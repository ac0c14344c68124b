//! Cursor-based pagination state
//!
//! The page index is a local counter for display; the cursors are the
//! server's tokens for moving between pages. A new filter or sort always
//! replaces the cursor pair wholesale so a page fetched under old criteria
//! can never be reached from a new search.

use crate::core::dog::{Cursor, SearchPage};
use serde::Serialize;

/// Direction of a cursor navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDirection {
    Next,
    Prev,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaginationState {
    /// No search has completed yet
    #[default]
    Idle,
    /// The last search produced a page
    Loaded {
        page_index: usize,
        total: u64,
        next: Option<Cursor>,
        prev: Option<Cursor>,
    },
}

impl PaginationState {
    /// Install the first page of a new search
    ///
    /// Valid from any state. The page index restarts at 0.
    pub fn replace(&mut self, page: &SearchPage) {
        *self = PaginationState::Loaded {
            page_index: 0,
            total: page.total,
            next: page.next.clone(),
            prev: page.prev.clone(),
        };
    }

    /// Install the page reached through the `next` cursor
    ///
    /// Returns false (and changes nothing) when there was no `next` cursor.
    pub fn advance(&mut self, page: &SearchPage) -> bool {
        self.step(PageDirection::Next, page)
    }

    /// Install the page reached through the `prev` cursor
    pub fn retreat(&mut self, page: &SearchPage) -> bool {
        self.step(PageDirection::Prev, page)
    }

    fn step(&mut self, direction: PageDirection, page: &SearchPage) -> bool {
        let page_index = match self {
            PaginationState::Loaded { page_index, .. } => *page_index,
            PaginationState::Idle => return false,
        };
        if self.cursor(direction).is_none() {
            return false;
        }
        let page_index = match direction {
            PageDirection::Next => page_index.saturating_add(1),
            PageDirection::Prev => page_index.saturating_sub(1),
        };
        *self = PaginationState::Loaded {
            page_index,
            total: page.total,
            next: page.next.clone(),
            prev: page.prev.clone(),
        };
        true
    }

    pub fn cursor(&self, direction: PageDirection) -> Option<&Cursor> {
        match direction {
            PageDirection::Next => self.next_cursor(),
            PageDirection::Prev => self.prev_cursor(),
        }
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        match self {
            PaginationState::Loaded { next, .. } => next.as_ref(),
            PaginationState::Idle => None,
        }
    }

    pub fn prev_cursor(&self) -> Option<&Cursor> {
        match self {
            PaginationState::Loaded { prev, .. } => prev.as_ref(),
            PaginationState::Idle => None,
        }
    }

    pub fn has_next(&self) -> bool {
        self.next_cursor().is_some()
    }

    pub fn has_prev(&self) -> bool {
        self.prev_cursor().is_some()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PaginationState::Idle)
    }

    pub fn page_index(&self) -> usize {
        match self {
            PaginationState::Loaded { page_index, .. } => *page_index,
            PaginationState::Idle => 0,
        }
    }

    /// Total matches across all pages of the current search
    pub fn total(&self) -> u64 {
        match self {
            PaginationState::Loaded { total, .. } => *total,
            PaginationState::Idle => 0,
        }
    }

    /// Number of pages for a given page size
    pub fn page_count(&self, page_size: u32) -> u64 {
        let page_size = u64::from(page_size.max(1));
        self.total().div_ceil(page_size)
    }
}
