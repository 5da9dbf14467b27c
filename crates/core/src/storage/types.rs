use std::fmt;

use serde::{Deserialize, Serialize};

/// Column projection requested by a read.
///
/// Stores may ignore the projection; it still takes part in cache keys so
/// that differently projected reads never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Columns(Vec<String>);

impl Columns {
    /// Every column (`*`).
    pub fn all() -> Self {
        Self(vec!["*".to_string()])
    }

    /// Only the named columns, in the given order.
    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Self::all();
        }
        Self(columns)
    }

    /// Returns true if every column is selected.
    pub fn is_all(&self) -> bool {
        self.0.iter().any(|c| c == "*")
    }

    /// Iterates over the selected column names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for Columns {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for Columns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}

/// One page of a paginated read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
}

impl<T> Page<T> {
    /// Cuts page `page` (1-based) of `per_page` items out of `all`.
    ///
    /// A zero `per_page` or `page` is clamped to 1.
    pub fn from_items(all: Vec<T>, per_page: u64, page: u64) -> Self {
        let per_page = per_page.max(1);
        let current_page = page.max(1);
        let total = all.len() as u64;
        let skip = (current_page - 1).saturating_mul(per_page);
        let items = all
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(per_page).unwrap_or(usize::MAX))
            .collect();

        Self {
            items,
            total,
            per_page,
            current_page,
        }
    }

    /// Returns the number of the last page (at least 1).
    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.per_page.max(1)).max(1)
    }

    /// Returns true if there are pages after this one.
    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page()
    }
}

/// Optional capabilities a repository contract can carry beyond the base
/// read/write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Base reads and writes only.
    Plain,
    /// Base operations plus restore / force-delete.
    SoftDeletes,
}

impl Capability {
    /// Probes which capability `repository` actually implements.
    pub fn of<R>(repository: &R) -> Self
    where
        R: super::Repository + ?Sized,
    {
        if repository.soft_deletes().is_some() {
            Capability::SoftDeletes
        } else {
            Capability::Plain
        }
    }
}
