use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: usize = 12;
pub const MAX_PER_PAGE: usize = 100;

/// 1-based page request as it arrives in a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "PageRequest::first")]
    pub page: usize,
    #[serde(default = "PageRequest::default_per_page")]
    pub per_page: usize,
}

impl Default for PageRequest {
    fn default() -> Self { Self { page: 1, per_page: DEFAULT_PER_PAGE } }
}

impl PageRequest {
    fn first() -> usize { 1 }
    fn default_per_page() -> usize { DEFAULT_PER_PAGE }

    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }.clamped()
    }

    pub fn clamped(self) -> Self {
        Self { page: self.page.max(1), per_page: self.per_page.clamp(1, MAX_PER_PAGE) }
    }

    /// Rows to skip; saturates for page numbers past any real table.
    pub fn offset(&self) -> usize {
        (self.page.max(1) - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    pub fn new(req: PageRequest, total: usize) -> Self {
        let total_pages = total.div_ceil(req.per_page);
        Self {
            page: req.page,
            per_page: req.per_page,
            total,
            total_pages,
            has_next: req.page < total_pages,
            has_prev: req.page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub info: PageInfo,
}
