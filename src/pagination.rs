//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a request may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 25,
            max_page_size: 100,
        }
    }
}

impl PaginationConfig {
    /// Fill in missing values and clamp the requested page and page size.
    ///
    /// Pages start at one and page sizes are clamped to `1..=max_page_size`.
    pub fn resolve(&self, page: Option<u64>, page_size: Option<u64>) -> Page {
        let page = page.unwrap_or(self.default_page).max(1);
        let size = page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1));

        Page { number: page, size }
    }
}

/// A resolved, 1-based page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    /// The number of rows to skip to reach this page, as an SQL `OFFSET`.
    ///
    /// Offsets past the largest SQLite integer are clamped to it.
    pub fn offset(&self) -> i64 {
        i64::try_from((self.number - 1).saturating_mul(self.size)).unwrap_or(i64::MAX)
    }

    /// The page size as an SQL `LIMIT`.
    pub fn limit(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }

    /// The number of pages needed to show `total` items.
    pub fn count_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::{Page, PaginationConfig};

    #[test]
    fn resolve_uses_defaults() {
        let page = PaginationConfig::default().resolve(None, None);

        assert_eq!(page, Page { number: 1, size: 25 });
    }

    #[test]
    fn resolve_clamps_page_size() {
        let config = PaginationConfig::default();

        assert_eq!(config.resolve(Some(2), Some(0)).size, 1);
        assert_eq!(config.resolve(Some(2), Some(1000)).size, 100);
    }

    #[test]
    fn resolve_treats_page_zero_as_first_page() {
        let page = PaginationConfig::default().resolve(Some(0), Some(10));

        assert_eq!(page.number, 1);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let page = Page { number: 3, size: 20 };

        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn offset_is_clamped_to_sql_integer() {
        let page = Page {
            number: u64::MAX,
            size: 100,
        };

        assert_eq!(page.offset(), i64::MAX);
        assert_eq!(page.limit(), 100);
    }

    #[test]
    fn count_pages_rounds_up() {
        let page = Page { number: 1, size: 20 };

        assert_eq!(page.count_pages(0), 0);
        assert_eq!(page.count_pages(20), 1);
        assert_eq!(page.count_pages(21), 2);
    }
}
