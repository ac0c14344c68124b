//! Integration tests for the result table core
//!
//! These tests drive a [`ResultTable`] against a scripted catalog whose
//! answers are fixed per query and per cursor. The scripted bulk lookup
//! answers in reverse order, so every test also checks that rows follow
//! `result_ids` rather than the lookup order.

use dog_finder::prelude::*;
use dog_finder::core::ServiceResult;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Notify;

// =============================================================================
// Scripted catalog
// =============================================================================

#[derive(Default)]
struct Script {
    searches: HashMap<String, SearchPage>,
    cursors: HashMap<String, SearchPage>,
    dogs: HashMap<DogId, Dog>,
    failing: Vec<String>,
    gates: HashMap<String, Arc<Notify>>,
    calls: Vec<String>,
}

#[derive(Clone, Default)]
struct ScriptedCatalog {
    script: Arc<Mutex<Script>>,
}

impl ScriptedCatalog {
    fn with_dogs(dogs: Vec<Dog>) -> Self {
        let catalog = Self::default();
        {
            let mut script = catalog.script.lock().unwrap();
            for dog in dogs {
                script.dogs.insert(dog.id.clone(), dog);
            }
        }
        catalog
    }

    fn on_search(&self, query: &SearchQuery, page: SearchPage) {
        self.script
            .lock()
            .unwrap()
            .searches
            .insert(query.to_query_string(), page);
    }

    fn on_cursor(&self, cursor: &str, page: SearchPage) {
        self.script
            .lock()
            .unwrap()
            .cursors
            .insert(cursor.to_string(), page);
    }

    /// Make calls to `endpoint` (search query string or cursor) fail
    fn fail(&self, endpoint: &str) {
        self.script.lock().unwrap().failing.push(endpoint.to_string());
    }

    /// Hold calls to `endpoint` until the returned gate is notified
    fn gate(&self, endpoint: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script
            .lock()
            .unwrap()
            .gates
            .insert(endpoint.to_string(), gate.clone());
        gate
    }

    fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    async fn answer(
        &self,
        endpoint: String,
        lookup: impl Fn(&Script) -> Option<SearchPage>,
    ) -> ServiceResult<SearchPage> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(format!("page {}", endpoint));
            script.gates.get(&endpoint).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let script = self.script.lock().unwrap();
        if script.failing.contains(&endpoint) {
            return Err(NetworkError::Transport {
                endpoint,
                message: "connection reset".to_string(),
            });
        }
        lookup(&*script).ok_or(NetworkError::Status {
            endpoint,
            status: 404,
            message: "not scripted".to_string(),
        })
    }
}

#[async_trait]
impl CatalogService for ScriptedCatalog {
    async fn login(&self, _credentials: &Credentials) -> ServiceResult<()> {
        Ok(())
    }

    async fn logout(&self) -> ServiceResult<()> {
        Ok(())
    }

    async fn breeds(&self) -> ServiceResult<Vec<String>> {
        Ok(vec![])
    }

    async fn search(&self, query: &SearchQuery) -> ServiceResult<SearchPage> {
        let key = query.to_query_string();
        let lookup_key = key.clone();
        self.answer(key, move |script| script.searches.get(&lookup_key).cloned())
            .await
    }

    async fn page(&self, cursor: &Cursor) -> ServiceResult<SearchPage> {
        let key = cursor.as_str().to_string();
        let lookup_key = key.clone();
        self.answer(key, move |script| script.cursors.get(&lookup_key).cloned())
            .await
    }

    async fn dogs(&self, ids: &[DogId]) -> ServiceResult<Vec<Dog>> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!("dogs {}", ids.len()));
        let mut found: Vec<Dog> = ids
            .iter()
            .filter_map(|id| script.dogs.get(id).cloned())
            .collect();
        found.reverse();
        Ok(found)
    }

    async fn match_favorites(&self, ids: &[DogId]) -> ServiceResult<DogId> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!("match {}", ids.len()));
        if script.failing.iter().any(|f| f == "match") {
            return Err(NetworkError::Status {
                endpoint: "/dogs/match".to_string(),
                status: 503,
                message: "try later".to_string(),
            });
        }
        Ok(ids[ids.len() - 1].clone())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn dog(id: &str, breed: &str) -> Dog {
    Dog {
        id: DogId::from(id),
        img: format!("https://img.example/{}.jpg", id),
        name: format!("Dog {}", id),
        age: 3,
        zip_code: "10001".to_string(),
        breed: breed.to_string(),
    }
}

fn ids(raw: &[&str]) -> Vec<DogId> {
    raw.iter().map(|s| DogId::from(*s)).collect()
}

fn page(raw: &[&str], total: u64, next: Option<&str>, prev: Option<&str>) -> SearchPage {
    SearchPage {
        result_ids: ids(raw),
        total,
        next: next.map(Cursor::new),
        prev: prev.map(Cursor::new),
    }
}

fn query(criteria: &FilterCriteria, sort: SortState) -> SearchQuery {
    SearchQuery::from_criteria(criteria, &sort, None)
}

fn table(catalog: &ScriptedCatalog) -> ResultTable {
    ResultTable::new(Arc::new(catalog.clone()), &ClientConfig::default())
}

/// Three pages of an unfiltered search: p0 -> p1 -> p2
fn paged_catalog() -> ScriptedCatalog {
    let catalog = ScriptedCatalog::with_dogs(
        ["a1", "a2", "b1", "b2", "c1", "c2"]
            .iter()
            .map(|id| dog(id, "Akita"))
            .collect(),
    );
    catalog.on_search(
        &query(&FilterCriteria::new(), SortState::default()),
        page(&["a1", "a2"], 6, Some("/next/1"), None),
    );
    catalog.on_cursor("/next/1", page(&["b1", "b2"], 6, Some("/next/2"), Some("/prev/0")));
    catalog.on_cursor("/next/2", page(&["c1", "c2"], 6, None, Some("/prev/1")));
    catalog.on_cursor("/prev/1", page(&["b1", "b2"], 6, Some("/next/2"), Some("/prev/0")));
    catalog.on_cursor("/prev/0", page(&["a1", "a2"], 6, Some("/next/1"), None));
    catalog
}

// =============================================================================
// Row order
// =============================================================================

#[tokio::test]
async fn test_rows_follow_result_ids_not_lookup_order() {
    let catalog = ScriptedCatalog::with_dogs(vec![dog("d1", "Poodle"), dog("d2", "Poodle")]);
    let criteria = FilterCriteria::new()
        .with_breed("Poodle")
        .with_age_range(Some(1), Some(5));
    catalog.on_search(
        &query(&criteria, SortState::default()),
        page(&["d1", "d2"], 2, None, None),
    );

    let table = table(&catalog);
    let outcome = table.submit_filter(criteria).await;

    assert!(outcome.is_applied());
    assert_eq!(table.row_ids(), ids(&["d1", "d2"]));
    assert_eq!(table.total(), 2);
    assert!(!table.is_loading());
    assert!(table.error().is_none());
}

#[tokio::test]
async fn test_navigation_keeps_server_order() {
    let catalog = paged_catalog();
    let table = table(&catalog);

    table.initial_load().await;
    assert_eq!(table.row_ids(), ids(&["a1", "a2"]));
    assert_eq!(table.page_index(), 0);

    assert!(table.next_page().await.is_applied());
    assert_eq!(table.row_ids(), ids(&["b1", "b2"]));
    assert_eq!(table.page_index(), 1);

    assert!(table.next_page().await.is_applied());
    assert_eq!(table.row_ids(), ids(&["c1", "c2"]));
    assert_eq!(table.page_index(), 2);

    assert!(table.prev_page().await.is_applied());
    assert_eq!(table.row_ids(), ids(&["b1", "b2"]));
    assert_eq!(table.page_index(), 1);
}

#[tokio::test]
async fn test_load_page_splits_long_id_lists() {
    let dogs: Vec<Dog> = (0..150).map(|i| dog(&format!("x{:03}", i), "Akita")).collect();
    let wanted: Vec<DogId> = dogs.iter().rev().map(|d| d.id.clone()).collect();
    let catalog = InMemoryCatalog::new(dogs);
    let table = ResultTable::new(Arc::new(catalog.clone()), &ClientConfig::default());

    let rows = table.load_page(&wanted).await.unwrap();

    let got: Vec<DogId> = rows.into_iter().map(|d| d.id).collect();
    assert_eq!(got, wanted);
    assert_eq!(catalog.calls(), 2);
}

#[tokio::test]
async fn test_load_page_drops_unknown_ids() {
    let catalog = ScriptedCatalog::with_dogs(vec![dog("d1", "Akita"), dog("d3", "Akita")]);
    let table = table(&catalog);

    let rows = table.load_page(&ids(&["d3", "gone", "d1"])).await.unwrap();
    let got: Vec<DogId> = rows.into_iter().map(|d| d.id).collect();
    assert_eq!(got, ids(&["d3", "d1"]));
}

#[tokio::test]
async fn test_load_page_keeps_repeated_ids() {
    let catalog = ScriptedCatalog::with_dogs(vec![dog("d1", "Akita"), dog("d2", "Akita")]);
    let table = table(&catalog);

    let rows = table.load_page(&ids(&["d1", "d2", "d1"])).await.unwrap();
    let got: Vec<DogId> = rows.into_iter().map(|d| d.id).collect();
    assert_eq!(got, ids(&["d1", "d2", "d1"]));
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_navigation_without_cursor_is_noop() {
    let catalog = paged_catalog();
    let table = table(&catalog);

    assert!(matches!(table.next_page().await, FetchOutcome::Skipped));
    assert!(catalog.calls().is_empty());

    table.initial_load().await;
    let calls = catalog.calls().len();
    assert!(matches!(table.prev_page().await, FetchOutcome::Skipped));
    assert_eq!(catalog.calls().len(), calls);
    assert_eq!(table.page_index(), 0);
}

#[tokio::test]
async fn test_new_filter_resets_page_and_cursors() {
    let catalog = paged_catalog();
    let poodles = FilterCriteria::new().with_breed("Poodle");
    catalog.on_search(
        &query(&poodles, SortState::default()),
        page(&["a2"], 1, None, None),
    );
    let table = table(&catalog);

    table.initial_load().await;
    table.next_page().await;
    table.next_page().await;
    assert_eq!(table.page_index(), 2);
    assert!(table.pagination().has_prev());

    assert!(table.submit_filter(poodles.clone()).await.is_applied());

    assert_eq!(table.page_index(), 0);
    assert_eq!(table.total(), 1);
    assert!(!table.pagination().has_next());
    assert!(!table.pagination().has_prev());
    assert_eq!(table.row_ids(), ids(&["a2"]));
    assert_eq!(table.filter(), poodles);
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_selection_survives_paging() {
    let catalog = paged_catalog();
    let table = table(&catalog);
    table.initial_load().await;

    let a1 = DogId::from("a1");
    assert!(table.toggle_select(&a1));

    table.next_page().await;
    assert!(table.is_selected(&a1));
    assert!(!table.row_ids().contains(&a1));

    table.prev_page().await;
    assert!(table.is_selected(&a1));
    assert_eq!(table.selection().len(), 1);
}

#[tokio::test]
async fn test_select_all_visible_is_page_scoped() {
    let catalog = paged_catalog();
    let table = table(&catalog);
    table.initial_load().await;

    assert_eq!(table.select_all_visible(true), 2);
    assert!(table.all_visible_selected());

    table.next_page().await;
    for id in table.row_ids() {
        assert!(!table.is_selected(&id));
    }
    assert!(!table.all_visible_selected());

    table.toggle_select(&DogId::from("b1"));
    assert_eq!(table.select_all_visible(false), 2);
    assert_eq!(table.selection().to_vec(), ids(&["a1", "a2"]));
}

#[tokio::test]
async fn test_toggle_off_page_id() {
    let catalog = paged_catalog();
    let table = table(&catalog);
    table.initial_load().await;

    let elsewhere = DogId::from("c2");
    assert!(table.toggle_select(&elsewhere));
    assert!(table.is_selected(&elsewhere));
    assert!(!table.toggle_select(&elsewhere));
    assert!(table.selection().is_empty());
}

// =============================================================================
// Sorting
// =============================================================================

#[tokio::test]
async fn test_sort_on_other_columns_is_ignored() {
    let catalog = paged_catalog();
    let table = table(&catalog);

    for column in [SortColumn::Name, SortColumn::Age, SortColumn::ZipCode] {
        assert!(matches!(table.request_sort(column).await, FetchOutcome::Skipped));
    }
    assert!(catalog.calls().is_empty());
    assert_eq!(table.sort(), SortState::default());
}

#[tokio::test]
async fn test_breed_sort_requeries_from_first_page() {
    let catalog = paged_catalog();
    let desc = SortState::breed(SortDirection::Desc);
    catalog.on_search(
        &query(&FilterCriteria::new(), desc),
        page(&["c2", "c1"], 6, Some("/desc/1"), None),
    );
    let table = table(&catalog);

    table.initial_load().await;
    table.next_page().await;
    table.toggle_select(&DogId::from("b2"));

    assert!(table.request_sort(SortColumn::Breed).await.is_applied());

    assert_eq!(table.sort(), desc);
    assert_eq!(table.page_index(), 0);
    assert_eq!(table.row_ids(), ids(&["c2", "c1"]));
    assert_eq!(
        table.pagination().next_cursor().map(Cursor::as_str),
        Some("/desc/1")
    );
    assert!(table.is_selected(&DogId::from("b2")));

    let last_search = catalog
        .calls()
        .into_iter()
        .filter(|c| c.contains("sort="))
        .last()
        .unwrap();
    assert!(last_search.ends_with("sort=breed%3Adesc"));
}

// =============================================================================
// Failures and stale responses
// =============================================================================

#[tokio::test]
async fn test_failed_fetch_keeps_rows() {
    let catalog = paged_catalog();
    catalog.fail("/next/1");
    let table = table(&catalog);
    table.initial_load().await;

    let outcome = table.next_page().await;

    match outcome {
        FetchOutcome::Failed { error, .. } => assert_eq!(error.error_code(), "NETWORK_TRANSPORT"),
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(table.row_ids(), ids(&["a1", "a2"]));
    assert_eq!(table.page_index(), 0);
    assert!(!table.is_loading());
    assert!(matches!(table.banner(), Some(TableBanner::Error(_))));
    assert_eq!(table.error().unwrap().code, "NETWORK_TRANSPORT");
}

#[tokio::test]
async fn test_success_clears_error_banner() {
    let catalog = paged_catalog();
    catalog.fail("/next/1");
    let table = table(&catalog);
    table.initial_load().await;
    table.next_page().await;
    assert!(table.error().is_some());

    table.refresh().await;
    assert!(table.error().is_none());
    assert_eq!(table.banner(), None);
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let catalog = paged_catalog();
    let slow = FilterCriteria::new().with_breed("Akita");
    let fast = FilterCriteria::new().with_breed("Basenji");
    let slow_query = query(&slow, SortState::default());
    catalog.on_search(&slow_query, page(&["a1"], 1, None, None));
    catalog.on_search(
        &query(&fast, SortState::default()),
        page(&["c1", "c2"], 2, None, None),
    );
    let gate = catalog.gate(&slow_query.to_query_string());
    let table = table(&catalog);

    let (slow_outcome, fast_outcome) = tokio::join!(table.submit_filter(slow), async {
        let outcome = table.submit_filter(fast.clone()).await;
        gate.notify_one();
        outcome
    });

    assert!(matches!(
        slow_outcome,
        FetchOutcome::Discarded {
            request_id: 1,
            latest: 2
        }
    ));
    assert!(fast_outcome.is_applied());
    assert_eq!(table.row_ids(), ids(&["c1", "c2"]));
    assert_eq!(table.total(), 2);
    assert_eq!(table.latest_request_id(), 2);
    assert!(!table.is_loading());
}

#[tokio::test]
async fn test_events_announce_changes() {
    let catalog = paged_catalog();
    let table = table(&catalog);
    let mut rx = table.events().subscribe();

    table.submit_filter(FilterCriteria::new()).await;
    table.toggle_select(&DogId::from("a1"));

    let mut kinds = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        kinds.push(envelope.event.kind());
    }
    assert_eq!(
        kinds,
        vec!["filter_changed", "fetch_started", "rows_loaded", "selection_changed"]
    );
}

// =============================================================================
// Forms and restart
// =============================================================================

#[tokio::test]
async fn test_invalid_form_makes_no_request() {
    let catalog = paged_catalog();
    let table = table(&catalog);

    let form = FilterForm {
        age_min: "9".to_string(),
        age_max: "2".to_string(),
        ..Default::default()
    };
    let err = table.submit_form(&form).await.unwrap_err();

    assert_eq!(err, FilterError::AgeRangeInverted { min: 9, max: 2 });
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_restart_clears_filter_and_selection() {
    let catalog = paged_catalog();
    let poodles = FilterCriteria::new().with_breed("Poodle");
    catalog.on_search(
        &query(&poodles, SortState::default()),
        page(&["a2"], 1, None, None),
    );
    let table = table(&catalog);
    table.submit_filter(poodles).await;
    table.toggle_select(&DogId::from("a2"));

    assert!(table.restart().await.is_applied());

    assert!(table.filter().is_empty());
    assert!(table.selection().is_empty());
    assert_eq!(table.row_ids(), ids(&["a1", "a2"]));
    assert_eq!(catalog.count("page "), 2);
}
