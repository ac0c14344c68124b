//! In-memory implementation of CatalogService for testing and development
//!
//! Behaves like the remote catalog: searches return ids plus opaque
//! relative-URL cursors, the bulk lookup returns records in storage order
//! (not request order), and calls can be made to require a prior login.
//!
//! Cursors carry the whole search (`/dogs/search?<query>&from=N`), so no
//! per-cursor state is kept.

use crate::core::dog::{Credentials, Cursor, Dog, DogId, SearchPage};
use crate::core::error::NetworkError;
use crate::core::filter::SearchQuery;
use crate::core::service::{CatalogService, ServiceResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Page size used when a search does not send `size`
pub const DEFAULT_PAGE_SIZE: usize = 25;

const CURSOR_PREFIX: &str = "/dogs/search?";

/// In-memory catalog implementation
///
/// Uses RwLock for thread-safe access. Cheap to clone; clones share data.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    dogs: Arc<RwLock<BTreeMap<DogId, Dog>>>,
    login_required: bool,
    signed_in: Arc<AtomicBool>,
    offline: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryCatalog {
    pub fn new(dogs: impl IntoIterator<Item = Dog>) -> Self {
        let catalog = Self::default();
        if let Ok(mut store) = catalog.dogs.write() {
            store.extend(dogs.into_iter().map(|dog| (dog.id.clone(), dog)));
        }
        catalog
    }

    /// Reject every call except login until a login has succeeded
    pub fn with_login_required(mut self) -> Self {
        self.login_required = true;
        self
    }

    /// Simulate losing the network: every call fails with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls received, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, endpoint: &str) -> ServiceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Transport {
                endpoint: endpoint.to_string(),
                message: "catalog is offline".to_string(),
            });
        }
        if self.login_required && !self.signed_in.load(Ordering::SeqCst) {
            return Err(NetworkError::Unauthorized {
                endpoint: endpoint.to_string(),
            });
        }
        Ok(())
    }

    fn lock_error(endpoint: &str, e: impl std::fmt::Display) -> NetworkError {
        NetworkError::Transport {
            endpoint: endpoint.to_string(),
            message: format!("Failed to acquire lock: {}", e),
        }
    }

    fn matching_ids(&self, query: &SearchQuery) -> ServiceResult<Vec<DogId>> {
        let dogs = self
            .dogs
            .read()
            .map_err(|e| Self::lock_error("/dogs/search", e))?;

        let breeds: BTreeSet<&str> = query.values("breeds").into_iter().collect();
        let zips: BTreeSet<&str> = query.values("zipCodes").into_iter().collect();
        let age_min = first_number(query, "ageMin");
        let age_max = first_number(query, "ageMax");

        let mut matches: Vec<&Dog> = dogs
            .values()
            .filter(|dog| breeds.is_empty() || breeds.contains(dog.breed.as_str()))
            .filter(|dog| zips.is_empty() || zips.contains(dog.zip_code.as_str()))
            .filter(|dog| age_min.is_none_or(|min| dog.age >= min))
            .filter(|dog| age_max.is_none_or(|max| dog.age <= max))
            .collect();

        if let Some(sort) = query.values("sort").first().copied() {
            let (field, direction) = sort.split_once(':').unwrap_or((sort, "asc"));
            // Stable sort keeps id order between equal keys
            matches.sort_by(|a, b| {
                let ordering = match field {
                    "name" => a.name.cmp(&b.name),
                    "age" => a.age.cmp(&b.age),
                    "zip_code" => a.zip_code.cmp(&b.zip_code),
                    _ => a.breed.cmp(&b.breed),
                };
                if direction == "desc" {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(matches.into_iter().map(|dog| dog.id.clone()).collect())
    }

    fn page_at(&self, query: &SearchQuery, from: usize) -> ServiceResult<SearchPage> {
        let ids = self.matching_ids(query)?;
        let size = first_number(query, "size")
            .map(|s| s.max(1) as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let total = ids.len();
        let from = from.min(total);
        let result_ids: Vec<DogId> = ids.into_iter().skip(from).take(size).collect();

        Ok(SearchPage {
            result_ids,
            total: total as u64,
            next: (from + size < total).then(|| cursor_for(query, from + size)),
            prev: (from > 0).then(|| cursor_for(query, from.saturating_sub(size))),
        })
    }
}

fn cursor_for(query: &SearchQuery, from: usize) -> Cursor {
    Cursor::new(format!("{}{}&from={}", CURSOR_PREFIX, query.to_query_string(), from))
}

/// Search and offset encoded in a cursor issued by [`cursor_for`]
fn read_cursor(cursor: &Cursor) -> Option<(SearchQuery, usize)> {
    let raw = cursor.as_str().strip_prefix(CURSOR_PREFIX)?;
    let (query, from) = raw.rsplit_once("&from=")?;
    Some((SearchQuery::parse_query_string(query)?, from.parse().ok()?))
}

fn first_number(query: &SearchQuery, name: &str) -> Option<u32> {
    query
        .values(name)
        .first()
        .and_then(|raw| raw.parse::<u32>().ok())
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn login(&self, credentials: &Credentials) -> ServiceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Transport {
                endpoint: "/auth/login".to_string(),
                message: "catalog is offline".to_string(),
            });
        }
        if credentials.name.is_empty() || credentials.email.is_empty() {
            return Err(NetworkError::Status {
                endpoint: "/auth/login".to_string(),
                status: 400,
                message: "name and email are required".to_string(),
            });
        }
        self.signed_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> ServiceResult<()> {
        self.enter("/auth/logout")?;
        self.signed_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn breeds(&self) -> ServiceResult<Vec<String>> {
        self.enter("/dogs/breeds")?;
        let dogs = self
            .dogs
            .read()
            .map_err(|e| Self::lock_error("/dogs/breeds", e))?;
        let breeds: BTreeSet<String> = dogs.values().map(|dog| dog.breed.clone()).collect();
        Ok(breeds.into_iter().collect())
    }

    async fn search(&self, query: &SearchQuery) -> ServiceResult<SearchPage> {
        self.enter("/dogs/search")?;
        self.page_at(query, 0)
    }

    async fn page(&self, cursor: &Cursor) -> ServiceResult<SearchPage> {
        self.enter(cursor.as_str())?;
        let (query, from) = read_cursor(cursor).ok_or_else(|| NetworkError::Status {
            endpoint: cursor.as_str().to_string(),
            status: 404,
            message: "unknown cursor".to_string(),
        })?;
        self.page_at(&query, from)
    }

    async fn dogs(&self, ids: &[DogId]) -> ServiceResult<Vec<Dog>> {
        self.enter("/dogs")?;
        if ids.len() > 100 {
            return Err(NetworkError::Status {
                endpoint: "/dogs".to_string(),
                status: 400,
                message: "at most 100 ids per request".to_string(),
            });
        }
        let wanted: BTreeSet<&DogId> = ids.iter().collect();
        let dogs = self.dogs.read().map_err(|e| Self::lock_error("/dogs", e))?;
        Ok(dogs
            .values()
            .filter(|dog| wanted.contains(&dog.id))
            .cloned()
            .collect())
    }

    async fn match_favorites(&self, ids: &[DogId]) -> ServiceResult<DogId> {
        self.enter("/dogs/match")?;
        let dogs = self
            .dogs
            .read()
            .map_err(|e| Self::lock_error("/dogs/match", e))?;
        ids.iter()
            .filter(|id| dogs.contains_key(*id))
            .min()
            .cloned()
            .ok_or_else(|| NetworkError::Status {
                endpoint: "/dogs/match".to_string(),
                status: 400,
                message: "no known dog ids submitted".to_string(),
            })
    }
}
