//! Page-number pagination
//!
//! An absent or non-numeric page falls back to the first page. A numeric
//! page outside the valid range falls back to the last page, except for
//! partial (incremental loading) requests, which get an explicit empty
//! result so the client knows to stop fetching.

/// Page-number paginator over `count` items
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

/// Outcome of resolving a requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// 1-based page number within range
    Page(u64),
    /// Partial request beyond the last page
    Empty,
}

/// Pagination metadata returned with a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Paginator {
    /// `per_page` is clamped to at least 1
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages; an empty list still has one (empty) page
    pub fn num_pages(&self) -> u64 {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Resolve a raw `page` query value
    ///
    /// Integers too large for `i64` count as out of range, not as garbage.
    pub fn resolve(&self, raw_page: Option<&str>, partial: bool) -> PageRequest {
        let Some(raw) = raw_page.map(str::trim) else {
            return PageRequest::Page(1);
        };

        let requested = match raw.parse::<i64>() {
            Ok(page) => u64::try_from(page).ok(),
            Err(_) if is_integer(raw) => None,
            Err(_) => return PageRequest::Page(1),
        };

        let last = self.num_pages();
        match requested {
            Some(page) if (1..=last).contains(&page) => PageRequest::Page(page),
            _ if partial => PageRequest::Empty,
            _ => PageRequest::Page(last),
        }
    }

    /// Row offset of the first item on `page`
    pub fn offset(&self, page: u64) -> u64 {
        page.saturating_sub(1).saturating_mul(self.per_page)
    }

    pub fn page_info(&self, page: u64) -> PageInfo {
        let num_pages = self.num_pages();
        PageInfo {
            page,
            num_pages,
            count: self.count,
            has_next: page < num_pages,
            has_previous: page > 1,
        }
    }
}

/// Optionally signed run of ASCII digits
fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_pages_rounds_up_and_never_drops_below_one() {
        assert_eq!(Paginator::new(0, 8).num_pages(), 1);
        assert_eq!(Paginator::new(8, 8).num_pages(), 1);
        assert_eq!(Paginator::new(9, 8).num_pages(), 2);
        assert_eq!(Paginator::new(24, 8).num_pages(), 3);
    }

    #[test]
    fn non_numeric_or_missing_page_is_first_page() {
        let paginator = Paginator::new(24, 8);
        assert_eq!(paginator.resolve(None, false), PageRequest::Page(1));
        assert_eq!(paginator.resolve(Some("abc"), false), PageRequest::Page(1));
        assert_eq!(paginator.resolve(Some(""), true), PageRequest::Page(1));
    }

    #[test]
    fn out_of_range_page_is_last_page() {
        let paginator = Paginator::new(24, 8);
        assert_eq!(paginator.resolve(Some("99"), false), PageRequest::Page(3));
        assert_eq!(paginator.resolve(Some("0"), false), PageRequest::Page(3));
        assert_eq!(paginator.resolve(Some("-2"), false), PageRequest::Page(3));
        assert_eq!(paginator.resolve(Some("2"), false), PageRequest::Page(2));
    }

    #[test]
    fn overflowing_page_number_is_out_of_range() {
        let paginator = Paginator::new(24, 8);
        assert_eq!(
            paginator.resolve(Some("99999999999999999999"), false),
            PageRequest::Page(3)
        );
        assert_eq!(
            paginator.resolve(Some("-99999999999999999999"), false),
            PageRequest::Page(3)
        );
        assert_eq!(
            paginator.resolve(Some("99999999999999999999"), true),
            PageRequest::Empty
        );
        assert_eq!(paginator.resolve(Some("9x"), false), PageRequest::Page(1));
    }

    #[test]
    fn partial_out_of_range_page_is_empty() {
        let paginator = Paginator::new(24, 8);
        assert_eq!(paginator.resolve(Some("99"), true), PageRequest::Empty);
        assert_eq!(paginator.resolve(Some("3"), true), PageRequest::Page(3));
    }

    #[test]
    fn page_info_reports_neighbours() {
        let paginator = Paginator::new(24, 8);
        assert_eq!(paginator.offset(3), 16);

        let info = paginator.page_info(2);
        assert!(info.has_next);
        assert!(info.has_previous);
        assert!(!paginator.page_info(3).has_next);
    }
}
