//! Favorites and match flow
//!
//! Takes the accumulated favorites and asks the catalog to pick one. The
//! result is cached together with the favorites it was computed from, and
//! dropped as soon as the favorites change, so a match is never shown next
//! to a selection it was not computed for. Requests are numbered; when two
//! overlap, only the newest one's answer is kept.

use crate::core::dog::{Dog, DogId};
use crate::core::error::{ErrorResponse, FinderError, FinderResult, SelectionError};
use crate::core::selection::SelectionSet;
use crate::core::service::CatalogService;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MatchState {
    /// Favorites the cached match was computed from
    submitted: Option<SelectionSet>,
    matched: Option<DogId>,
    error: Option<ErrorResponse>,
}

pub struct MatchFlow {
    service: Arc<dyn CatalogService>,
    state: Mutex<MatchState>,
    latest_request: AtomicU64,
}

impl MatchFlow {
    pub fn new(service: Arc<dyn CatalogService>) -> Self {
        Self {
            service,
            state: Mutex::new(MatchState::default()),
            latest_request: AtomicU64::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the catalog to pick one dog out of `selection`
    ///
    /// An empty selection fails with [`SelectionError::Empty`] without
    /// contacting the service. On failure any previous match is kept and
    /// the error is recorded for display. If a newer request was issued
    /// while this one was in flight, its answer is dropped and
    /// [`SelectionError::Changed`] is returned.
    pub async fn request_match(&self, selection: &SelectionSet) -> FinderResult<DogId> {
        if selection.is_empty() {
            return Err(SelectionError::Empty.into());
        }

        let request_id = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        let ids = selection.to_vec();
        tracing::info!(request_id, favorites = ids.len(), "Requesting match");

        let answer = self.service.match_favorites(&ids).await;

        let mut state = self.state();
        let latest = self.latest_request.load(Ordering::SeqCst);
        if request_id != latest {
            drop(state);
            tracing::debug!(request_id, latest, "Dropping superseded match answer");
            return Err(SelectionError::Changed.into());
        }

        match answer {
            Ok(matched) => {
                state.submitted = Some(selection.clone());
                state.matched = Some(matched.clone());
                state.error = None;
                tracing::info!(matched = %matched, "Match received");
                Ok(matched)
            }
            Err(e) => {
                let err = FinderError::from(e);
                tracing::warn!(request_id, error = %err, "Match request failed");
                state.error = Some(err.to_response());
                Err(err)
            }
        }
    }

    /// Drop the cached match if `selection` is not the one it was computed from
    ///
    /// Returns true when a cached match was dropped.
    pub fn invalidate_if_changed(&self, selection: &SelectionSet) -> bool {
        let mut state = self.state();
        let stale = match &state.submitted {
            Some(submitted) => !submitted.same_members(selection),
            None => false,
        };
        if stale {
            *state = MatchState::default();
            tracing::debug!("Favorites changed, dropping cached match");
        }
        stale
    }

    pub fn matched(&self) -> Option<DogId> {
        self.state().matched.clone()
    }

    /// Favorites the cached match was computed from
    pub fn submitted(&self) -> Option<SelectionSet> {
        self.state().submitted.clone()
    }

    /// Error from the last failed match request
    pub fn error(&self) -> Option<ErrorResponse> {
        self.state().error.clone()
    }

    pub fn clear(&self) {
        *self.state() = MatchState::default();
    }

    /// Full record of the matched dog, for the match-result view
    pub async fn resolve_match(&self) -> FinderResult<Option<Dog>> {
        let Some(matched) = self.matched() else {
            return Ok(None);
        };
        let dogs = self.service.dogs(std::slice::from_ref(&matched)).await?;
        Ok(dogs.into_iter().find(|dog| dog.id == matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryCatalog;

    fn dog(id: &str) -> Dog {
        Dog {
            id: DogId::from(id),
            img: String::new(),
            name: id.to_string(),
            age: 3,
            zip_code: "10001".to_string(),
            breed: "Akita".to_string(),
        }
    }

    fn selection(raw: &[&str]) -> SelectionSet {
        raw.iter().map(|s| DogId::from(*s)).collect()
    }

    #[tokio::test]
    async fn test_empty_selection_makes_no_call() {
        let catalog = InMemoryCatalog::new(vec![dog("d1")]);
        let flow = MatchFlow::new(Arc::new(catalog.clone()));

        let err = flow.request_match(&SelectionSet::new()).await.unwrap_err();
        assert!(matches!(err, FinderError::Selection(SelectionError::Empty)));
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn test_match_is_cached_and_invalidated() {
        let flow = MatchFlow::new(Arc::new(InMemoryCatalog::new(vec![dog("d1"), dog("d2")])));
        let favorites = selection(&["d2", "d1"]);

        let matched = flow.request_match(&favorites).await.unwrap();
        assert_eq!(matched, DogId::from("d1"));
        assert_eq!(flow.matched(), Some(DogId::from("d1")));

        assert!(!flow.invalidate_if_changed(&selection(&["d1", "d2"])));
        assert!(flow.matched().is_some());

        assert!(flow.invalidate_if_changed(&selection(&["d1"])));
        assert!(flow.matched().is_none());
        assert!(flow.submitted().is_none());
    }

    #[tokio::test]
    async fn test_resolve_match() {
        let flow = MatchFlow::new(Arc::new(InMemoryCatalog::new(vec![dog("d1"), dog("d2")])));
        assert_eq!(flow.resolve_match().await.unwrap(), None);

        flow.request_match(&selection(&["d2"])).await.unwrap();
        let resolved = flow.resolve_match().await.unwrap().unwrap();
        assert_eq!(resolved.id, DogId::from("d2"));
    }

    #[tokio::test]
    async fn test_failure_records_error() {
        let catalog = InMemoryCatalog::new(vec![dog("d1")]);
        catalog.set_offline(true);
        let flow = MatchFlow::new(Arc::new(catalog));

        let err = flow.request_match(&selection(&["d1"])).await.unwrap_err();
        assert_eq!(err.error_code(), "NETWORK_TRANSPORT");
        assert_eq!(flow.error().map(|e| e.code), Some("NETWORK_TRANSPORT".to_string()));
        assert!(flow.matched().is_none());
    }
}
