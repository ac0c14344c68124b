//! # dog-finder
//!
//! Client core for a remote catalog of adoptable dogs: filter the catalog,
//! page through cursor-paginated results, pick favorites and ask the
//! catalog for a match.
//!
//! ## Features
//!
//! - **Canonical queries**: filter criteria translate to the same query
//!   string every time, with unset fields left out
//! - **Cursor pagination**: server-issued `next`/`prev` tokens, discarded
//!   wholesale on every new filter or sort
//! - **Order-preserving rows**: bulk lookups are re-ordered to match the
//!   search result order
//! - **Stale-response dropping**: every fetch carries a request id; only the
//!   latest one reaches the table
//! - **Persistent favorites**: the selection survives paging and sorting
//! - **Change notifications**: a broadcast bus announces every store change
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dog_finder::prelude::*;
//!
//! let config = ClientConfig::default().with_env_overrides()?;
//! let client = HttpCatalogClient::new(&config)?;
//! client.login(&LoginForm::new("Ada", "ada@example.com").into_credentials()?).await?;
//!
//! let table = ResultTable::new(Arc::new(client), &config);
//! table.submit_filter(FilterCriteria::new().with_breed("Poodle")).await;
//! for dog in table.rows() {
//!     println!("{} ({})", dog.name, dog.breed);
//! }
//! ```

pub mod client;
pub mod config;
pub mod core;
pub mod favorites;
pub mod storage;
pub mod table;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        CatalogService, Credentials, Cursor, Dog, DogId, EventBus, EventEnvelope, FilterCriteria,
        FilterForm, LoginForm, PageDirection, PaginationState, SearchPage, SearchQuery,
        SelectionSet, SortColumn, SortDirection, SortState, StoreEvent, TableBanner,
    };

    // === Errors ===
    pub use crate::core::{
        ConfigError, FilterError, FinderError, FinderResult, LoginError, NetworkError,
        SelectionError,
    };

    // === Components ===
    pub use crate::client::HttpCatalogClient;
    pub use crate::config::ClientConfig;
    pub use crate::favorites::MatchFlow;
    pub use crate::storage::InMemoryCatalog;
    pub use crate::table::{FetchOutcome, ResultTable};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
