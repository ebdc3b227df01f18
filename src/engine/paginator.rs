//! Page arithmetic

use std::ops::Range;

/// Page count for `total_rows`; never less than 1
pub fn total_pages(total_rows: usize, page_size: usize) -> usize {
    total_rows.div_ceil(page_size.max(1)).max(1)
}

/// Resolved page of a projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    /// Offsets into the projection
    pub range: Range<usize>,
    /// Page actually served
    pub page: usize,
    pub total_pages: usize,
    /// The requested page was past the end and was pulled back
    pub clamped: bool,
}

/// Slices `total_rows` for `page`, clamping a page past the end to the last page.
///
/// One correction step is always enough: the page size and projection are
/// fixed by the time the window is computed.
pub fn paginate(total_rows: usize, page: usize, page_size: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let total_pages = total_pages(total_rows, page_size);
    let requested = page.max(1);
    let page = requested.min(total_pages);

    let start = ((page - 1).saturating_mul(page_size)).min(total_rows);
    let end = start.saturating_add(page_size).min(total_rows);

    PageWindow {
        range: start..end,
        page,
        total_pages,
        clamped: page != requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(3, 2), 2);
    }

    #[test]
    fn test_last_partial_page() {
        let window = paginate(3, 2, 2);
        assert_eq!(window.range, 2..3);
        assert_eq!(window.total_pages, 2);
        assert!(!window.clamped);
    }

    #[test]
    fn test_page_past_end_is_clamped() {
        let window = paginate(25, 9, 10);
        assert_eq!(window.page, 3);
        assert_eq!(window.range, 20..25);
        assert!(window.clamped);
    }

    #[test]
    fn test_empty_projection_serves_page_one() {
        let window = paginate(0, 4, 10);
        assert_eq!(window.page, 1);
        assert_eq!(window.range, 0..0);
        assert!(window.clamped);
    }
}
