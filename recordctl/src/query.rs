//! Query construction for record listings and exports.
//!
//! Everything here is pure: raw, untrusted request parameters go in and validated
//! descriptors come out. Malformed pagination, sort, or search input is normalized to a
//! default instead of being rejected. The only input that can fail validation is a record
//! identifier, see [`parse_record_id`].
//!
//! # Field allow-list
//!
//! Sorting and searching only ever reference columns through [`SortField`], a closed enum
//! whose [`SortField::column`] returns `&'static str`. No caller-supplied string is ever
//! interpolated into SQL; unknown field names resolve to [`SortField::Id`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

use crate::db::models::records::RecordDBResponse;
use crate::types::RecordId;

/// Page used when `page` is missing or not a non-negative integer.
pub const DEFAULT_PAGE: u64 = 0;

/// Page size used when `limit` is missing or not a positive integer.
pub const DEFAULT_LIMIT: u64 = 10;

/// Export cap used when `maxExport` is missing or not a positive integer.
pub const DEFAULT_MAX_EXPORT: u64 = 1000;

/// Columns a record can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Id,
    FirstName,
    LastName,
    Email,
    Gender,
    IpAddress,
}

impl SortField {
    /// Every sortable column, in table order.
    pub const ALL: [SortField; 6] = [
        SortField::Id,
        SortField::FirstName,
        SortField::LastName,
        SortField::Email,
        SortField::Gender,
        SortField::IpAddress,
    ];

    /// Text columns covered by free-text search.
    pub const SEARCHABLE: [SortField; 5] = [
        SortField::FirstName,
        SortField::LastName,
        SortField::Email,
        SortField::Gender,
        SortField::IpAddress,
    ];

    /// Column name as it appears in the table and in the public API.
    pub const fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::FirstName => "first_name",
            SortField::LastName => "last_name",
            SortField::Email => "email",
            SortField::Gender => "gender",
            SortField::IpAddress => "ip_address",
        }
    }

    /// Exact, case-sensitive allow-list lookup.
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column() == name)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Exact match on `asc` / `desc`.
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// Ordering applied to a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Exports are always newest id first, whatever the client asked for.
    pub const EXPORT: SortOrder = SortOrder {
        field: SortField::Id,
        direction: SortDirection::Desc,
    };

    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Secondary key keeping page boundaries stable when the primary key has duplicates.
    pub fn tie_break(&self) -> Option<SortField> {
        (self.field != SortField::Id).then_some(SortField::Id)
    }
}

/// Case-insensitive substring predicate over the searchable columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFilter {
    term: String,
    needle: String,
}

impl SearchFilter {
    pub fn new(term: impl Into<String>) -> Self {
        let term = term.into();
        let needle = term.to_lowercase();
        Self { term, needle }
    }

    /// The search term exactly as the caller sent it.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// An empty term matches every record.
    pub fn is_match_all(&self) -> bool {
        self.term.is_empty()
    }

    pub fn matches(&self, record: &RecordDBResponse) -> bool {
        if self.is_match_all() {
            return true;
        }
        SortField::SEARCHABLE
            .into_iter()
            .filter_map(|field| record.text(field))
            .any(|value| value.to_lowercase().contains(&self.needle))
    }

    /// `ILIKE` pattern matching the term literally anywhere in a column.
    ///
    /// `\`, `%` and `_` are escaped with PostgreSQL's default escape character.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.term.len() + 2);
        pattern.push('%');
        for c in self.term.chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// Raw listing parameters, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Zero-based page number (default: 0)
    pub page: Option<String>,
    /// Page size (default: 10)
    pub limit: Option<String>,
    /// Case-insensitive substring matched against every text column
    pub search: Option<String>,
    /// One of `id`, `first_name`, `last_name`, `email`, `gender`, `ip_address` (default: `id`)
    #[serde(rename = "sortField")]
    pub sort_field: Option<String>,
    /// `asc` or `desc` (default: `desc`)
    #[serde(rename = "sortDirection")]
    pub sort_direction: Option<String>,
}

impl ListParams {
    /// Collect parameters from decoded query pairs. The first occurrence of a key wins and
    /// unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                "search" => &mut params.search,
                "sortField" => &mut params.sort_field,
                "sortDirection" => &mut params.sort_direction,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

/// Raw export parameters, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportParams {
    /// Case-insensitive substring matched against every text column
    pub search: Option<String>,
    /// Hard cap on the number of exported rows (default: 1000)
    #[serde(rename = "maxExport")]
    pub max_export: Option<String>,
}

impl ExportParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "search" => &mut params.search,
                "maxExport" => &mut params.max_export,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

/// Validated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub search_term: String,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub page: u64,
    pub limit: u64,
}

impl QueryDescriptor {
    /// Normalize raw parameters. `max_limit`, when set by the operator, clamps the page size;
    /// without it any positive limit is honoured.
    pub fn from_params(params: &ListParams, max_limit: Option<u64>) -> Self {
        let limit = parse_positive(params.limit.as_deref()).unwrap_or(DEFAULT_LIMIT);
        let limit = match max_limit {
            Some(cap) if cap > 0 => limit.min(cap),
            _ => limit,
        };

        Self {
            search_term: params.search.clone().unwrap_or_default(),
            sort_field: params
                .sort_field
                .as_deref()
                .and_then(SortField::from_column)
                .unwrap_or_default(),
            sort_direction: params
                .sort_direction
                .as_deref()
                .and_then(SortDirection::from_param)
                .unwrap_or_default(),
            page: parse_non_negative(params.page.as_deref()).unwrap_or(DEFAULT_PAGE),
            limit,
        }
    }

    /// Rows skipped before this page starts.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.limit)
    }

    pub fn filter(&self) -> SearchFilter {
        SearchFilter::new(self.search_term.as_str())
    }

    pub fn order(&self) -> SortOrder {
        SortOrder::new(self.sort_field, self.sort_direction)
    }
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self::from_params(&ListParams::default(), None)
    }
}

/// Validated export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDescriptor {
    pub search_term: String,
    pub max_export: u64,
}

impl ExportDescriptor {
    pub fn from_params(params: &ExportParams) -> Self {
        Self {
            search_term: params.search.clone().unwrap_or_default(),
            max_export: parse_positive(params.max_export.as_deref()).unwrap_or(DEFAULT_MAX_EXPORT),
        }
    }

    pub fn filter(&self) -> SearchFilter {
        SearchFilter::new(self.search_term.as_str())
    }
}

/// A record identifier that is not an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid ID parameter. Must be a valid number.")]
pub struct InvalidRecordId {
    pub raw: String,
}

/// Validate a path identifier before any lookup is attempted.
pub fn parse_record_id(raw: &str) -> Result<RecordId, InvalidRecordId> {
    raw.trim()
        .parse::<RecordId>()
        .map_err(|_| InvalidRecordId { raw: raw.to_string() })
}

/// `ceil(total_rows / limit)`, zero when nothing matched.
pub fn total_pages(total_rows: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total_rows.div_ceil(limit)
}

/// The leading run of digits, so `"2.7"` reads as 2 and `"25abc"` as 25. A sign other than `+`,
/// no leading digit, or overflow gives `None`.
fn parse_non_negative(raw: Option<&str>) -> Option<u64> {
    let trimmed = raw?.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned.find(|c: char| !c.is_ascii_digit()).unwrap_or(unsigned.len());
    unsigned[..end].parse::<u64>().ok()
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    parse_non_negative(raw).filter(|n| *n > 0)
}
