//! Page-number pagination shared by every feed.
//!
//! A request names a 1-based page. The window is resolved against the item
//! count at call time: pages below 1 resolve to the first page, pages past
//! the end resolve to the last one, and an empty listing still has one page.

use serde::Serialize;

/// Items per feed page.
pub const PAGE_SIZE: u32 = 10;

/// Page requested by the client, before it is checked against the item count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: i64,
    per_page: u32,
}

impl PageRequest {
    pub fn new(number: i64) -> Self {
        Self {
            number,
            per_page: PAGE_SIZE,
        }
    }

    pub fn first() -> Self {
        Self::new(1)
    }

    /// Interpret a raw `page` query value. Missing or unparsable values mean page 1.
    pub fn from_query(raw: Option<&str>) -> Self {
        let number = raw
            .map(str::trim)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(1);
        Self::new(number)
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Clamp the request against `total_items` and produce the slice to fetch.
    pub fn resolve(&self, total_items: u64) -> PageWindow {
        let per_page = u64::from(self.per_page);
        let total_pages = total_items.div_ceil(per_page).max(1);
        let number = match u64::try_from(self.number) {
            Ok(0) | Err(_) => 1,
            Ok(value) => value.min(total_pages),
        };

        PageWindow {
            number,
            total_pages,
            total_items,
            offset: (number - 1) * per_page,
            limit: self.per_page,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// A resolved page: always within `1..=total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub offset: u64,
    pub limit: u32,
}

/// Items of one page together with its position in the listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            total_pages: window.total_pages,
            total_items: window.total_items,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn previous_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_number(&self) -> u64 {
        (self.number + 1).min(self.total_pages)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}
