//! Pagination request and response envelopes

use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;
use crate::utils::helpers;

/// `?page=&per_page=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Page parameters after defaults and clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// Apply configured defaults; `page` is at least 1 and `per_page` is
    /// clamped into `1..=max_per_page`
    pub fn resolve(&self, config: &PaginationConfig) -> PageParams {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(config.default_per_page)
            .clamp(1, config.max_per_page.max(1));
        PageParams { page, per_page }
    }
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        helpers::calculate_offset(self.page, self.per_page)
    }
}

/// One page of results plus totals
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            total_pages: helpers::total_pages(total, params.per_page),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_per_page: 20,
            max_per_page: 100,
        }
    }

    #[test]
    fn test_defaults_applied() {
        let params = PageRequest::default().resolve(&config());
        assert_eq!(params, PageParams { page: 1, per_page: 20 });
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let params = PageRequest::new(0, 1000).resolve(&config());
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);

        let params = PageRequest::new(3, 0).resolve(&config());
        assert_eq!(params.per_page, 1);
        assert_eq!(params.offset(), 2);
    }

    #[test]
    fn test_page_totals() {
        let params = PageRequest::new(2, 10).resolve(&config());
        let page = Page::new(vec![1, 2, 3], 23, params);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.map(|n| n * 2).items, vec![2, 4, 6]);
    }
}
