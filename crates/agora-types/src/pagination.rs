use serde::Serialize;

/// Posts shown per feed page.
pub const POSTS_PER_PAGE: u32 = 10;

/// Which slice of an ordered result set a page covers.
///
/// The requested page number comes straight from the query string. Anything
/// that is not an integer falls back to the first page; an integer outside
/// `1..=num_pages` clamps to the last page. An empty result still has one
/// (empty) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PageWindow {
    pub fn resolve(raw: Option<&str>, total: u64, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page as u64).max(1);
        let num_pages = u32::try_from(num_pages).unwrap_or(u32::MAX);

        let number = match raw.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n >= 1 && n <= num_pages as i64 => n as u32,
            Some(Ok(_)) => num_pages,
        };

        Self { number, num_pages, per_page, total }
    }

    pub fn offset(&self) -> u64 {
        (self.number as u64 - 1) * self.per_page as u64
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> u32 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_page_number(&self) -> u32 {
        (self.number + 1).min(self.num_pages)
    }
}

/// One page of items together with its window.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self { items, window }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
