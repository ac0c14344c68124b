//! Change notifications for the search store
//!
//! Every mutation of the [`SearchStore`](crate::core::store::SearchStore)
//! goes through the [`ResultTable`](crate::table::ResultTable), which
//! publishes a [`StoreEvent`] describing what changed. Views subscribe to
//! re-render; the favorites flow subscribes to drop stale match results.
//!
//! # Architecture
//!
//! ```text
//! submit_filter ──┐
//! request_sort ───┤
//! next/prev_page ─┼──▶ EventBus::publish() ──▶ broadcast channel ──▶ table view
//! toggle_select ──┘                                              ──▶ favorites view
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut rx = table.events().subscribe();
//! table.submit_filter(criteria).await?;
//!
//! while let Ok(envelope) = rx.recv().await {
//!     if let StoreEvent::RowsLoaded { .. } = envelope.event {
//!         render(table.rows());
//!     }
//! }
//! ```

use crate::core::dog::DogId;
use crate::core::filter::SortState;
use crate::core::pagination::PageDirection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// What changed in the store
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    /// New filter criteria were submitted
    FilterChanged,
    /// The breed sort direction flipped
    SortChanged { sort: SortState },
    /// A fetch was issued and the table is loading
    FetchStarted { request_id: u64 },
    /// The rows of a new page are in place
    RowsLoaded {
        request_id: u64,
        page_index: usize,
        total: u64,
        direction: Option<PageDirection>,
    },
    /// A fetch failed; the rows on screen are unchanged
    FetchFailed { request_id: u64, code: String },
    /// A superseded response arrived and was dropped
    ResponseDiscarded { request_id: u64, latest: u64 },
    /// The favorites selection changed
    SelectionChanged { count: usize },
    /// The match service picked a dog from the favorites
    MatchReady { matched: DogId },
    /// A match request failed; the favorites are unchanged
    MatchFailed { code: String },
    /// A cached match was dropped because the favorites changed
    MatchInvalidated,
}

impl StoreEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreEvent::FilterChanged => "filter_changed",
            StoreEvent::SortChanged { .. } => "sort_changed",
            StoreEvent::FetchStarted { .. } => "fetch_started",
            StoreEvent::RowsLoaded { .. } => "rows_loaded",
            StoreEvent::FetchFailed { .. } => "fetch_failed",
            StoreEvent::ResponseDiscarded { .. } => "response_discarded",
            StoreEvent::SelectionChanged { .. } => "selection_changed",
            StoreEvent::MatchReady { .. } => "match_ready",
            StoreEvent::MatchFailed { .. } => "match_failed",
            StoreEvent::MatchInvalidated => "match_invalidated",
        }
    }

    /// Whether views showing the table must re-render
    pub fn affects_rows(&self) -> bool {
        matches!(
            self,
            StoreEvent::RowsLoaded { .. }
                | StoreEvent::FetchStarted { .. }
                | StoreEvent::FetchFailed { .. }
                | StoreEvent::SelectionChanged { .. }
        )
    }
}

/// Envelope wrapping a store event with metadata
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: StoreEvent,
}

impl EventEnvelope {
    pub fn new(event: StoreEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus for store notifications
///
/// Cheap to clone (Arc internally). Slow receivers see `Lagged` on their
/// next `recv()` rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails. Returns the number of receivers that will see the event.
    pub fn publish(&self, event: StoreEvent) -> usize {
        let envelope = EventEnvelope::new(event);
        // send() returns Err only if there are no receivers
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
