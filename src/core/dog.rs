//! Wire and domain types for the remote dog catalog

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a dog in the remote catalog
///
/// Opaque to the client. Two records with the same id are the same dog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DogId(String);

impl DogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DogId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DogId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single adoptable dog, as returned by the bulk lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dog {
    pub id: DogId,
    pub img: String,
    pub name: String,
    pub age: u32,
    pub zip_code: String,
    pub breed: String,
}

/// Opaque server-issued pagination token
///
/// The service hands out relative URLs (`/dogs/search?...&from=25`). The
/// client never inspects or builds them; it only replays them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of search results
///
/// `result_ids` is in server order and defines the row order of the table.
/// A page is superseded by the next search or cursor call, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub result_ids: Vec<DogId>,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Cursor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<Cursor>,
}

/// Body returned by the match endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub matched: DogId,
}

/// Credentials posted to the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub name: String,
    pub email: String,
}
