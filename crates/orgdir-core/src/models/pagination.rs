use serde::{Deserialize, Serialize};

/// Requested page. Construct with [`PageRequest::new`] so out-of-range
/// values are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page_idx: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub const DEFAULT_SIZE: i64 = 10;

    /// Non-positive `page_idx` becomes 1; `page_size` is at least 1.
    pub fn new(page_idx: i64, page_size: i64) -> Self {
        Self {
            page_idx: if page_idx <= 0 { 1 } else { page_idx },
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page_idx - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_SIZE)
    }
}

/// Query-string form of a page request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page_idx: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        PageRequest::new(
            q.page_idx.unwrap_or(1),
            q.page_size.unwrap_or(PageRequest::DEFAULT_SIZE),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page_idx: i64,
    pub page_size: i64,
    pub page_total: i64,
    pub total: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total = total.max(0);
        Self {
            page_idx: request.page_idx,
            page_size: request.page_size,
            page_total: total / request.page_size + i64::from(total % request.page_size != 0),
            total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub pagination: Pagination,
}
