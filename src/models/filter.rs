//! Query-shaping value objects shared by every list operation.
//!
//! A list call receives a predicate (`ProfileQuery`, `GuardianQuery`) plus a
//! [`ListFilter`]; its paired count call receives only the predicate, so both
//! always see the same row set.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Upper bound on page size accepted from callers.
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            _ => Err(AppError::bad_request(format!(
                "sort order must be ASC or DESC, got '{s}'"
            ))),
        }
    }
}

/// Window into an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    limit: i64,
    offset: i64,
}

impl Pagination {
    /// Builds the window for a 1-based `page` of `per_page` rows.
    pub fn new(page: u32, per_page: u32) -> AppResult<Self> {
        if page < 1 {
            return Err(AppError::bad_request("page must be at least 1"));
        }
        if per_page < 1 || per_page > MAX_PER_PAGE {
            return Err(AppError::bad_request(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        let limit = i64::from(per_page);
        Ok(Self {
            limit,
            offset: (i64::from(page) - 1) * limit,
        })
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

/// Ordering and optional window for a list call.
///
/// Rows are always ordered by `(created_at, id)` in the requested direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListFilter {
    sort_order: SortOrder,
    pagination: Option<Pagination>,
}

impl ListFilter {
    pub fn new(sort_order: SortOrder, pagination: Pagination) -> Self {
        Self {
            sort_order,
            pagination: Some(pagination),
        }
    }

    pub fn unpaginated(sort_order: SortOrder) -> Self {
        Self {
            sort_order,
            pagination: None,
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    /// Applies ordering and the window to rows already matching the predicate.
    pub fn apply<T>(&self, mut rows: Vec<T>, key: impl Fn(&T) -> (Timestamp, uuid::Uuid)) -> Vec<T> {
        rows.sort_by_key(|row| key(row));
        if self.sort_order == SortOrder::Desc {
            rows.reverse();
        }
        match self.pagination {
            Some(page) => rows
                .into_iter()
                .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows,
        }
    }
}

/// Creation-time range aligned to whole UTC days.
///
/// `from` is moved back to midnight of its day; `till` is moved forward to the
/// midnight that ends its day and is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateFilter {
    from: Option<Timestamp>,
    till: Option<Timestamp>,
}

impl DateFilter {
    pub fn new(from: Option<Timestamp>, till: Option<Timestamp>) -> AppResult<Self> {
        if let (Some(from), Some(till)) = (from, till) {
            if from > till {
                return Err(AppError::bad_request("date filter 'from' is after 'till'"));
            }
        }
        Ok(Self {
            from: from.map(start_of_day).transpose()?,
            till: till.map(end_of_day).transpose()?,
        })
    }

    pub fn from(&self) -> Option<Timestamp> {
        self.from
    }

    pub fn till(&self) -> Option<Timestamp> {
        self.till
    }

    pub fn contains(&self, at: Timestamp) -> bool {
        self.from.is_none_or(|from| at >= from) && self.till.is_none_or(|till| at < till)
    }
}

fn start_of_day(at: Timestamp) -> AppResult<Timestamp> {
    let date = at.to_zoned(TimeZone::UTC).date();
    date.to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(|e| AppError::bad_request(format!("invalid date {date}: {e}")))
}

fn end_of_day(at: Timestamp) -> AppResult<Timestamp> {
    let date = at.to_zoned(TimeZone::UTC).date();
    let next = date
        .tomorrow()
        .map_err(|e| AppError::bad_request(format!("date {date} has no following day: {e}")))?;
    next.to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(|e| AppError::bad_request(format!("invalid date {next}: {e}")))
}
