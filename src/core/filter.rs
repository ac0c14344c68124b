//! Filter criteria, sort state and the query translator
//!
//! [`SearchQuery::from_criteria`] is a pure function of criteria, sort and
//! page size: the same inputs always produce the same parameter list, so a
//! search can be re-issued at any time without drifting.
//!
//! # Example
//!
//! ```rust,ignore
//! let criteria = FilterCriteria::new()
//!     .with_breed("Poodle")
//!     .with_age_range(Some(1), Some(5));
//! let query = SearchQuery::from_criteria(&criteria, &SortState::default(), None);
//! assert_eq!(query.to_query_string(), "ageMin=1&ageMax=5&breeds=Poodle&sort=breed%3Aasc");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// Parameter names a search query can carry
const PARAM_NAMES: [&str; 6] = ["ageMin", "ageMax", "zipCodes", "breeds", "size", "sort"];

static ZIP_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}$").expect("valid regex"));

/// Errors raised while turning filter form input into criteria
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("'{value}' is not a valid {field}")]
    InvalidAge { field: &'static str, value: String },

    #[error("minimum age {min} is greater than maximum age {max}")]
    AgeRangeInverted { min: u32, max: u32 },

    #[error("'{value}' is not a 5-digit zip code")]
    InvalidZipCode { value: String },
}

impl FilterError {
    pub fn error_code(&self) -> &'static str {
        match self {
            FilterError::InvalidAge { .. } => "INVALID_AGE",
            FilterError::AgeRangeInverted { .. } => "AGE_RANGE_INVERTED",
            FilterError::InvalidZipCode { .. } => "INVALID_ZIP_CODE",
        }
    }
}

/// The user's current search filter
///
/// Breeds are a set (the order a user picked them in does not matter);
/// zip codes keep the order they were typed in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub breeds: BTreeSet<String>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub zip_codes: Vec<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_breed(mut self, breed: impl Into<String>) -> Self {
        self.breeds.insert(breed.into());
        self
    }

    pub fn with_age_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.age_min = min;
        self.age_max = max;
        self
    }

    pub fn with_zip_code(mut self, zip: impl Into<String>) -> Self {
        self.zip_codes.push(zip.into());
        self
    }

    /// True when no field restricts the search
    pub fn is_empty(&self) -> bool {
        self.breeds.is_empty()
            && self.age_min.is_none()
            && self.age_max.is_none()
            && self.zip_codes.is_empty()
    }
}

/// Raw filter form values, as typed by the user
///
/// Ages are free text and zip codes a single comma-separated field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    pub breeds: Vec<String>,
    #[serde(default)]
    pub age_min: String,
    #[serde(default)]
    pub age_max: String,
    #[serde(default)]
    pub zip_codes: String,
}

impl FilterForm {
    /// Validate the form and produce criteria
    ///
    /// Blank fields become "unset". Blank zip tokens (`"10001,,10002"`) are
    /// skipped.
    pub fn parse(&self) -> Result<FilterCriteria, FilterError> {
        let age_min = parse_age("minimum age", &self.age_min)?;
        let age_max = parse_age("maximum age", &self.age_max)?;

        if let (Some(min), Some(max)) = (age_min, age_max) {
            if min > max {
                return Err(FilterError::AgeRangeInverted { min, max });
            }
        }

        let mut zip_codes = Vec::new();
        for token in self.zip_codes.split(',').map(str::trim) {
            if token.is_empty() {
                continue;
            }
            if !ZIP_CODE.is_match(token) {
                return Err(FilterError::InvalidZipCode {
                    value: token.to_string(),
                });
            }
            if !zip_codes.iter().any(|z| z == token) {
                zip_codes.push(token.to_string());
            }
        }

        let breeds = self
            .breeds
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect();

        Ok(FilterCriteria {
            breeds,
            age_min,
            age_max,
            zip_codes,
        })
    }
}

fn parse_age(field: &'static str, raw: &str) -> Result<Option<u32>, FilterError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| FilterError::InvalidAge {
            field,
            value: raw.to_string(),
        })
}

/// Table columns
///
/// Only [`SortColumn::Breed`] can be sorted, and sorting it re-queries the
/// server because only the current page is held client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    Breed,
    Age,
    ZipCode,
}

impl SortColumn {
    pub fn is_server_sortable(self) -> bool {
        matches!(self, SortColumn::Breed)
    }

    /// Field name understood by the search endpoint
    pub fn field_name(self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Breed => "breed",
            SortColumn::Age => "age",
            SortColumn::ZipCode => "zip_code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Current sort of the result table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortState {
    pub fn breed(direction: SortDirection) -> Self {
        Self {
            column: SortColumn::Breed,
            direction,
        }
    }

    /// Sort parameter value, e.g. `breed:desc`
    pub fn as_param(&self) -> String {
        format!("{}:{}", self.column.field_name(), self.direction.as_str())
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::breed(SortDirection::Asc)
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_param())
    }
}

/// Canonical search query sent to the catalog
///
/// An ordered list of `(name, value)` pairs. List parameters are repeated
/// (`breeds=A&breeds=B`). Unset fields are absent, never empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    params: Vec<(&'static str, String)>,
}

impl SearchQuery {
    pub fn from_criteria(
        criteria: &FilterCriteria,
        sort: &SortState,
        page_size: Option<u32>,
    ) -> Self {
        let mut params = Vec::new();

        if let Some(min) = criteria.age_min {
            params.push(("ageMin", min.to_string()));
        }
        if let Some(max) = criteria.age_max {
            params.push(("ageMax", max.to_string()));
        }
        for zip in criteria.zip_codes.iter().filter(|z| !z.is_empty()) {
            params.push(("zipCodes", zip.clone()));
        }
        // BTreeSet iteration is sorted, which keeps breed order canonical
        for breed in criteria.breeds.iter().filter(|b| !b.is_empty()) {
            params.push(("breeds", breed.clone()));
        }
        if let Some(size) = page_size {
            params.push(("size", size.to_string()));
        }
        params.push(("sort", sort.as_param()));

        Self { params }
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Values of one parameter, in order
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Percent-encoded `key=value&...` string
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Read back a string produced by [`to_query_string`](Self::to_query_string)
    ///
    /// Unknown parameter names are skipped. Returns `None` when a value does
    /// not decode to UTF-8.
    pub fn parse_query_string(raw: &str) -> Option<Self> {
        let mut params = Vec::new();
        for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let Some(name) = PARAM_NAMES.iter().find(|name| **name == key) else {
                continue;
            };
            let value = urlencoding::decode(value).ok()?;
            params.push((*name, value.into_owned()));
        }
        Some(Self { params })
    }
}
