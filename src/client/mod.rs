//! HTTP implementation of the catalog service

pub mod http;

pub use http::HttpCatalogClient;
