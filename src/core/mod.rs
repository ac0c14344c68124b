//! Core module containing the domain types, state and service contract

pub mod auth;
pub mod dog;
pub mod error;
pub mod events;
pub mod filter;
pub mod pagination;
pub mod selection;
pub mod service;
pub mod store;

pub use auth::{LoginError, LoginForm};
pub use dog::{Credentials, Cursor, Dog, DogId, MatchResponse, SearchPage};
pub use error::{ConfigError, FinderError, FinderResult, NetworkError, SelectionError};
pub use events::{EventBus, EventEnvelope, StoreEvent};
pub use filter::{
    FilterCriteria, FilterError, FilterForm, SearchQuery, SortColumn, SortDirection, SortState,
};
pub use pagination::{PageDirection, PaginationState};
pub use selection::SelectionSet;
pub use service::{CatalogService, ServiceResult};
pub use store::{SearchStore, TableBanner};
