//! Outcome types returned by batch and paged operations

use crate::planner::Sort;
use crate::translate::DataAccessError;

/// Per-item outcome of a batch operation
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Input positions that succeeded
    pub succeeded: Vec<usize>,
    /// Input positions that failed, with their error
    pub failed: Vec<(usize, DataAccessError)>,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Outcome of a collection-wide delete
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Records removed
    pub deleted: u64,
    /// Keys whose deletion failed
    pub failed: Vec<(String, DataAccessError)>,
}

/// Page to fetch: zero-based index, size and optional sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
    pub sort: Option<Sort>,
}

impl PageRequest {
    pub fn of(page: usize, size: usize) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Items preceding this page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }

    pub fn is_sorted(&self) -> bool {
        self.sort.as_ref().map_or(false, |s| !s.is_unsorted())
    }
}

/// One page of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub content: Vec<E>,
    pub page: usize,
    pub size: usize,
    /// Approximate collection size
    pub total: u64,
}

impl<E> Page<E> {
    /// Number of pages implied by `total`
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size as u64)
    }

    pub fn has_next(&self) -> bool {
        (self.page as u64).saturating_add(1) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::of(0, 10).offset(), 0);
        assert_eq!(PageRequest::of(3, 10).offset(), 30);
        assert_eq!(PageRequest::of(usize::MAX, 2).offset(), usize::MAX);
    }

    #[test]
    fn test_page_arithmetic() {
        let page = Page {
            content: vec![1, 2],
            page: 1,
            size: 2,
            total: 5,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let last = Page {
            content: vec![5],
            page: 2,
            size: 2,
            total: 5,
        };
        assert!(!last.has_next());
    }

    #[test]
    fn test_zero_size_page() {
        let page: Page<u8> = Page {
            content: Vec::new(),
            page: 0,
            size: 0,
            total: 10,
        };
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next());
    }

    #[test]
    fn test_page_arithmetic_at_extremes() {
        let page: Page<u8> = Page {
            content: Vec::new(),
            page: usize::MAX,
            size: 1,
            total: u64::MAX,
        };
        assert_eq!(page.total_pages(), u64::MAX);
        assert!(!page.has_next());

        let wide: Page<u8> = Page {
            content: Vec::new(),
            page: 0,
            size: 2,
            total: u64::MAX,
        };
        assert_eq!(wide.total_pages(), u64::MAX / 2 + 1);
        assert!(wide.has_next());
    }
}
