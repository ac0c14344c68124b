//! Result table core
//!
//! Coordinates filter, sort and cursor state with the catalog and keeps the
//! rendered rows consistent with the most recent page:
//!
//! - rows are always the records of the latest page's `result_ids`, in that
//!   order, whatever order the bulk lookup answers in;
//! - every fetch is tagged with a request id, and a response that is not
//!   the latest issued is dropped on arrival;
//! - a failed fetch shows an error banner and leaves the rows in place;
//! - the favorites selection survives paging and sorting.
//!
//! # Example
//!
//! ```rust,ignore
//! let table = ResultTable::new(Arc::new(catalog), &ClientConfig::default());
//! table.initial_load().await;
//! table.submit_filter(FilterCriteria::new().with_breed("Poodle")).await;
//! table.toggle_select(&table.rows()[0].id);
//! table.next_page().await;
//! let matched = table.match_favorites().await?;
//! ```

use crate::config::ClientConfig;
use crate::core::dog::{Cursor, Dog, DogId, SearchPage};
use crate::core::error::{ErrorResponse, FinderError, FinderResult, SelectionError};
use crate::core::events::{EventBus, StoreEvent};
use crate::core::filter::{FilterCriteria, FilterError, FilterForm, SearchQuery, SortColumn, SortState};
use crate::core::pagination::{PageDirection, PaginationState};
use crate::core::selection::SelectionSet;
use crate::core::service::CatalogService;
use crate::core::store::{SearchStore, TableBanner};
use crate::favorites::MatchFlow;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Largest id list the bulk lookup accepts in one request
pub const MAX_LOOKUP_IDS: usize = 100;

/// What became of a fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// The page is now on screen
    Applied { request_id: u64 },
    /// A newer fetch was issued meanwhile; this response was dropped
    Discarded { request_id: u64, latest: u64 },
    /// The fetch failed; the previous rows are still shown
    Failed { request_id: u64, error: FinderError },
    /// Nothing to do (no cursor in that direction, or an unsortable column)
    Skipped,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied { .. })
    }
}

/// Which fetch is running
enum FetchKind {
    /// First page of a new search
    Search(SearchQuery),
    /// Replay of a cursor
    Cursor(PageDirection, Cursor),
}

pub struct ResultTable {
    service: Arc<dyn CatalogService>,
    store: Mutex<SearchStore>,
    events: EventBus,
    latest_request: AtomicU64,
    page_size: Option<u32>,
    match_flow: MatchFlow,
}

impl ResultTable {
    pub fn new(service: Arc<dyn CatalogService>, config: &ClientConfig) -> Self {
        Self {
            match_flow: MatchFlow::new(service.clone()),
            service,
            store: Mutex::new(SearchStore::new(config.initial_sort())),
            events: EventBus::new(config.event_capacity),
            latest_request: AtomicU64::new(0),
            page_size: config.page_size,
        }
    }

    fn store(&self) -> MutexGuard<'_, SearchStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn match_flow(&self) -> &MatchFlow {
        &self.match_flow
    }

    // ------------------------------------------------------------------
    // Searching and paging
    // ------------------------------------------------------------------

    /// First search of a session: current filter (empty by default) and sort
    pub async fn initial_load(&self) -> FetchOutcome {
        self.refresh().await
    }

    /// Replace the filter and start a new search from the first page
    pub async fn submit_filter(&self, criteria: FilterCriteria) -> FetchOutcome {
        tracing::info!(
            breeds = criteria.breeds.len(),
            zip_codes = criteria.zip_codes.len(),
            age_min = ?criteria.age_min,
            age_max = ?criteria.age_max,
            "Submitting filter"
        );
        self.store().filter = criteria;
        self.events.publish(StoreEvent::FilterChanged);
        self.refresh().await
    }

    /// Validate raw form input, then submit it
    ///
    /// Invalid input is rejected before any request and leaves the current
    /// filter untouched.
    pub async fn submit_form(&self, form: &FilterForm) -> Result<FetchOutcome, FilterError> {
        let criteria = form.parse()?;
        Ok(self.submit_filter(criteria).await)
    }

    /// Flip the sort direction of a server-sortable column and re-search
    ///
    /// Other columns are ignored. The new search starts at the first page;
    /// the selection is kept.
    pub async fn request_sort(&self, column: SortColumn) -> FetchOutcome {
        if !column.is_server_sortable() {
            tracing::debug!(?column, "Ignoring sort on unsortable column");
            return FetchOutcome::Skipped;
        }
        let sort = {
            let mut store = self.store();
            let direction = if store.sort.column == column {
                store.sort.direction.toggled()
            } else {
                store.sort.direction
            };
            store.sort = SortState { column, direction };
            store.sort
        };
        self.events.publish(StoreEvent::SortChanged { sort });
        self.refresh().await
    }

    /// Re-run the current filter and sort from the first page
    ///
    /// The cursor pair of the previous search is discarded once the new
    /// first page arrives.
    pub async fn refresh(&self) -> FetchOutcome {
        let query = {
            let store = self.store();
            SearchQuery::from_criteria(&store.filter, &store.sort, self.page_size)
        };
        self.run_fetch(FetchKind::Search(query)).await
    }

    /// Follow the `next` cursor; no-op when there is none
    pub async fn next_page(&self) -> FetchOutcome {
        self.navigate(PageDirection::Next).await
    }

    /// Follow the `prev` cursor; no-op when there is none
    pub async fn prev_page(&self) -> FetchOutcome {
        self.navigate(PageDirection::Prev).await
    }

    async fn navigate(&self, direction: PageDirection) -> FetchOutcome {
        let cursor = self.store().pagination.cursor(direction).cloned();
        match cursor {
            Some(cursor) => self.run_fetch(FetchKind::Cursor(direction, cursor)).await,
            None => {
                tracing::debug!(?direction, "No cursor in that direction");
                FetchOutcome::Skipped
            }
        }
    }

    /// Start over: clear filter, favorites and any cached match, then search
    pub async fn restart(&self) -> FetchOutcome {
        {
            let mut store = self.store();
            store.filter = FilterCriteria::default();
            store.selection.clear();
            store.matched = None;
            store.match_error = None;
        }
        self.match_flow.clear();
        self.events.publish(StoreEvent::FilterChanged);
        self.events.publish(StoreEvent::SelectionChanged { count: 0 });
        self.refresh().await
    }

    /// Resolve a page's ids to records, in exactly the order of `ids`
    ///
    /// The bulk lookup does not preserve order, so records are re-ordered
    /// locally. Ids the catalog did not return are left out; an id listed
    /// twice yields two rows. Long lists are split into lookups of at most
    /// [`MAX_LOOKUP_IDS`].
    pub async fn load_page(&self, ids: &[DogId]) -> FinderResult<Vec<Dog>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let lookups = ids
            .chunks(MAX_LOOKUP_IDS)
            .map(|chunk| self.service.dogs(chunk));
        let by_id: HashMap<DogId, Dog> = try_join_all(lookups)
            .await?
            .into_iter()
            .flatten()
            .map(|dog| (dog.id.clone(), dog))
            .collect();

        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.get(id) {
                Some(dog) => rows.push(dog.clone()),
                None => tracing::warn!(id = %id, "Catalog returned no record for id"),
            }
        }
        Ok(rows)
    }

    async fn run_fetch(&self, kind: FetchKind) -> FetchOutcome {
        let request_id = {
            let mut store = self.store();
            let request_id = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
            store.loading = true;
            request_id
        };
        self.events.publish(StoreEvent::FetchStarted { request_id });

        let (direction, fetched) = match &kind {
            FetchKind::Search(query) => {
                tracing::debug!(request_id, query = %query.to_query_string(), "Searching catalog");
                (None, self.service.search(query).await)
            }
            FetchKind::Cursor(direction, cursor) => {
                tracing::debug!(request_id, cursor = %cursor, "Following cursor");
                (Some(*direction), self.service.page(cursor).await)
            }
        };

        let result = match fetched {
            Ok(page) => self.load_page(&page.result_ids).await.map(|rows| (page, rows)),
            Err(e) => Err(e.into()),
        };

        self.finish_fetch(request_id, direction, result)
    }

    fn finish_fetch(
        &self,
        request_id: u64,
        direction: Option<PageDirection>,
        result: FinderResult<(SearchPage, Vec<Dog>)>,
    ) -> FetchOutcome {
        let mut store = self.store();

        let latest = self.latest_request.load(Ordering::SeqCst);
        if request_id != latest {
            drop(store);
            tracing::debug!(request_id, latest, "Dropping superseded response");
            self.events
                .publish(StoreEvent::ResponseDiscarded { request_id, latest });
            return FetchOutcome::Discarded { request_id, latest };
        }

        store.loading = false;
        match result {
            Ok((page, rows)) => {
                match direction {
                    None => store.pagination.replace(&page),
                    Some(PageDirection::Next) => {
                        store.pagination.advance(&page);
                    }
                    Some(PageDirection::Prev) => {
                        store.pagination.retreat(&page);
                    }
                }
                store.rows = rows;
                store.error = None;

                let page_index = store.pagination.page_index();
                let total = store.pagination.total();
                drop(store);

                tracing::info!(request_id, page_index, total, "Page loaded");
                self.events.publish(StoreEvent::RowsLoaded {
                    request_id,
                    page_index,
                    total,
                    direction,
                });
                FetchOutcome::Applied { request_id }
            }
            Err(error) => {
                let response = error.to_response();
                store.error = Some(response.clone());
                drop(store);

                tracing::warn!(request_id, error = %error, "Fetch failed, keeping current rows");
                self.events.publish(StoreEvent::FetchFailed {
                    request_id,
                    code: response.code,
                });
                FetchOutcome::Failed { request_id, error }
            }
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Add or remove one favorite, whichever page it is on
    ///
    /// Returns whether the dog is selected afterwards.
    pub fn toggle_select(&self, id: &DogId) -> bool {
        let (selected, selection) = {
            let mut store = self.store();
            let selected = store.selection.toggle(id);
            (selected, store.selection.clone())
        };
        self.selection_changed(&selection);
        selected
    }

    /// Select or deselect exactly the rows currently shown
    ///
    /// Favorites on other pages are untouched. Returns the selection size.
    pub fn select_all_visible(&self, selected: bool) -> usize {
        let (changed, selection) = {
            let mut store = self.store();
            let visible = store.visible_ids();
            let changed = store.selection.set_all(&visible, selected);
            (changed, store.selection.clone())
        };
        if changed {
            self.selection_changed(&selection);
        }
        selection.len()
    }

    fn selection_changed(&self, selection: &SelectionSet) {
        self.store().match_error = None;
        self.events.publish(StoreEvent::SelectionChanged {
            count: selection.len(),
        });
        if self.match_flow.invalidate_if_changed(selection) {
            self.store().matched = None;
            self.events.publish(StoreEvent::MatchInvalidated);
        }
    }

    /// Hand the favorites to the match service
    ///
    /// On success the selection is cleared (the favorites now belong to the
    /// match view) and the match id is returned. On failure the selection is
    /// kept so the user can retry, and the error is shown in the banner.
    ///
    /// If the favorites change while the request is in flight, the answer is
    /// dropped, the new favorites are kept and [`SelectionError::Changed`] is
    /// returned.
    pub async fn match_favorites(&self) -> FinderResult<DogId> {
        let submitted = self.store().selection.clone();
        let answer = self.match_flow.request_match(&submitted).await;

        let mut store = self.store();
        if answer.is_ok() && !store.selection.same_members(&submitted) {
            let current = store.selection.clone();
            drop(store);
            self.match_flow.invalidate_if_changed(&current);
            tracing::info!(
                submitted = submitted.len(),
                current = current.len(),
                "Favorites changed during match, dropping answer"
            );
            return Err(SelectionError::Changed.into());
        }

        match answer {
            Ok(matched) => {
                store.selection.clear();
                store.matched = Some(matched.clone());
                store.match_error = None;
                drop(store);

                self.events.publish(StoreEvent::SelectionChanged { count: 0 });
                self.events.publish(StoreEvent::MatchReady {
                    matched: matched.clone(),
                });
                Ok(matched)
            }
            Err(FinderError::Selection(SelectionError::Changed)) => {
                Err(SelectionError::Changed.into())
            }
            Err(error) => {
                let response = error.to_response();
                store.match_error = Some(response.clone());
                drop(store);

                self.events.publish(StoreEvent::MatchFailed {
                    code: response.code,
                });
                Err(error)
            }
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn rows(&self) -> Vec<Dog> {
        self.store().rows.clone()
    }

    pub fn row_ids(&self) -> Vec<DogId> {
        self.store().visible_ids()
    }

    pub fn is_loading(&self) -> bool {
        self.store().loading
    }

    pub fn error(&self) -> Option<ErrorResponse> {
        self.store().error.clone()
    }

    pub fn banner(&self) -> Option<TableBanner> {
        self.store().banner()
    }

    pub fn selection(&self) -> SelectionSet {
        self.store().selection.clone()
    }

    pub fn is_selected(&self, id: &DogId) -> bool {
        self.store().selection.contains(id)
    }

    pub fn all_visible_selected(&self) -> bool {
        self.store().all_visible_selected()
    }

    pub fn sort(&self) -> SortState {
        self.store().sort
    }

    pub fn filter(&self) -> FilterCriteria {
        self.store().filter.clone()
    }

    pub fn pagination(&self) -> PaginationState {
        self.store().pagination.clone()
    }

    pub fn page_index(&self) -> usize {
        self.store().pagination.page_index()
    }

    pub fn total(&self) -> u64 {
        self.store().pagination.total()
    }

    pub fn matched(&self) -> Option<DogId> {
        self.store().matched.clone()
    }

    /// Id of the most recently issued fetch
    pub fn latest_request_id(&self) -> u64 {
        self.latest_request.load(Ordering::SeqCst)
    }
}
