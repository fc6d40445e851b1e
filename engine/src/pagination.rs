//! Page windowing over a filtered row count.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};

/// Rows-per-page choices used when none are configured.
pub const DEFAULT_ROWS_PER_PAGE: [usize; 3] = [50, 100, 200];

/// Current page and page size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based page number
    pub current_page: usize,
    /// Page sizes offered to the user
    pub rows_per_page: Vec<usize>,
    pub current_rows_per_page: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            current_page: 1,
            rows_per_page: DEFAULT_ROWS_PER_PAGE.to_vec(),
            current_rows_per_page: DEFAULT_ROWS_PER_PAGE[0],
        }
    }
}

impl Page {
    /// Check the page invariants: page number from 1, at least one page
    /// size, all sizes positive, and the current size among them.
    pub fn validate(&self) -> Result<()> {
        if self.current_page < 1 {
            return Err(Error::InvalidConfig("currentPage must be at least 1".into()));
        }
        if self.rows_per_page.is_empty() || self.rows_per_page.contains(&0) {
            return Err(Error::InvalidConfig(
                "rowsPerPage must hold positive page sizes".into(),
            ));
        }
        if !self.rows_per_page.contains(&self.current_rows_per_page) {
            return Err(Error::InvalidRowsPerPage {
                requested: self.current_rows_per_page,
                allowed: self.rows_per_page.clone(),
            });
        }
        Ok(())
    }

    /// Index range of the rows shown on this page, clipped to `len`.
    pub fn window(&self, len: usize) -> std::ops::Range<usize> {
        let start = self
            .current_page
            .saturating_sub(1)
            .saturating_mul(self.current_rows_per_page)
            .min(len);
        let end = start.saturating_add(self.current_rows_per_page).min(len);
        start..end
    }
}

/// Number of pages needed for `count` rows, never less than one.
pub fn last_page(count: usize, rows_per_page: usize) -> usize {
    count.div_ceil(rows_per_page.max(1)).max(1)
}

/// Tracks the current page against the filtered row count.
#[derive(Debug, Clone)]
pub struct Pagination {
    page: Page,
    initial: Page,
    default: Page,
    count: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(Page::default(), Page::default())
    }
}

impl Pagination {
    pub fn new(initial: Page, default: Page) -> Self {
        Self {
            page: initial.clone(),
            initial,
            default,
            count: 0,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Total rows after filtering.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    pub fn last_page_number(&self) -> usize {
        last_page(self.count, self.page.current_rows_per_page)
    }

    /// 1-based position of the first row on the page and of the last one,
    /// for "1-50 of 95" style labels.
    pub fn range_label(&self, rows_on_page: usize) -> (usize, usize) {
        let from = self
            .page
            .current_page
            .saturating_sub(1)
            .saturating_mul(self.page.current_rows_per_page);
        (from.saturating_add(1), from.saturating_add(rows_on_page))
    }

    pub fn first_page(&mut self) -> &Page {
        self.set_page(1)
    }

    pub fn last_page(&mut self) -> &Page {
        self.set_page(self.last_page_number())
    }

    pub fn next_page(&mut self) -> &Page {
        self.set_page(self.page.current_page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> &Page {
        self.set_page(self.page.current_page.saturating_sub(1))
    }

    /// Jump to a page, clamped to the available range.
    pub fn go_to_page(&mut self, page: usize) -> &Page {
        self.set_page(page)
    }

    /// Change the page size. The current page is pulled back when it would
    /// fall past the last page at the new size.
    pub fn on_change_rows_per_page(&mut self, rows_per_page: usize) -> Result<&Page> {
        if !self.page.rows_per_page.contains(&rows_per_page) {
            return Err(Error::InvalidRowsPerPage {
                requested: rows_per_page,
                allowed: self.page.rows_per_page.clone(),
            });
        }
        self.page.current_rows_per_page = rows_per_page;
        let current = self.page.current_page;
        Ok(self.set_page(current))
    }

    /// Pull the current page back into range after the count shrank.
    pub fn clamp(&mut self) -> &Page {
        let current = self.page.current_page;
        self.set_page(current)
    }

    /// Restore the default page, or the initial snapshot.
    pub fn reset(&mut self, use_default: bool) -> &Page {
        self.page = if use_default {
            self.default.clone()
        } else {
            self.initial.clone()
        };
        &self.page
    }

    /// Replace the page wholesale.
    pub fn restore(&mut self, page: Page) {
        self.page = page;
    }

    fn set_page(&mut self, page: usize) -> &Page {
        let clamped = page.clamp(1, self.last_page_number());
        if clamped != self.page.current_page {
            tracing::debug!(from = self.page.current_page, to = clamped, "page changed");
        }
        self.page.current_page = clamped;
        &self.page
    }
}
