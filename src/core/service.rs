//! Service trait for the remote dog catalog

use crate::core::dog::{Credentials, Cursor, Dog, DogId, SearchPage};
use crate::core::error::NetworkError;
use crate::core::filter::SearchQuery;
use async_trait::async_trait;

pub type ServiceResult<T> = std::result::Result<T, NetworkError>;

/// Contract the client core needs from the catalog
///
/// Implementations only move data; they never re-order, filter or cache.
/// Every failure is reported as a [`NetworkError`].
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Start a session; later calls are authenticated by the session cookie
    async fn login(&self, credentials: &Credentials) -> ServiceResult<()>;

    /// End the session
    async fn logout(&self) -> ServiceResult<()>;

    /// All breed names known to the catalog
    async fn breeds(&self) -> ServiceResult<Vec<String>>;

    /// First page of a search
    async fn search(&self, query: &SearchQuery) -> ServiceResult<SearchPage>;

    /// Page reached by replaying a server-issued cursor
    async fn page(&self, cursor: &Cursor) -> ServiceResult<SearchPage>;

    /// Resolve ids to full records
    ///
    /// The returned order is unspecified and may not match `ids`.
    async fn dogs(&self, ids: &[DogId]) -> ServiceResult<Vec<Dog>>;

    /// Ask the service to pick one dog out of the given favorites
    async fn match_favorites(&self, ids: &[DogId]) -> ServiceResult<DogId>;
}
