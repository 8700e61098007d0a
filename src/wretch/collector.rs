use crate::wretch::sender::{FetchError, WebSource};

/// What one page yielded, and whether it references the page after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageScan<T> {
    pub(crate) items: Vec<T>,
    pub(crate) has_next: bool,
}

/// Walks a numbered page sequence, starting at page 1.
pub(crate) struct Paginator<'a, S: WebSource> {
    source: &'a S,
}

impl<'a, S: WebSource> Paginator<'a, S> {
    pub(crate) fn new(source: &'a S) -> Self {
        Paginator { source }
    }

    /// Fetches pages until one no longer references the next, accumulating items in page order.
    ///
    /// Only link presence ends the walk: a page with no items that still links onward is followed.
    /// There is no page limit, so a site that always links onward is walked forever.
    ///
    /// # Arguments
    ///
    /// * `first_url`: URL of page 1.
    /// * `page_url`: Builds the URL of page `n` for `n >= 2`.
    /// * `scan`: Extracts a page's items given its markup and the number of the page after it.
    ///
    /// returns: Result<Vec<T>, FetchError>
    pub(crate) fn collect<T, U, F>(&self, first_url: &str, page_url: U, mut scan: F) -> Result<Vec<T>, FetchError>
    where
        U: Fn(u32) -> String,
        F: FnMut(&str, u32) -> PageScan<T>,
    {
        let mut items = Vec::new();
        let mut url = first_url.to_string();
        let mut page = 1;

        loop {
            let html = self.source.get_text(&url)?;
            let next_page = page + 1;
            let scanned = scan(&html, next_page);
            trace!(
                "Page {page} yielded {} items (next page: {})",
                scanned.items.len(),
                scanned.has_next
            );
            items.extend(scanned.items);

            if !scanned.has_next {
                break;
            }

            page = next_page;
            url = page_url(page);
        }

        Ok(items)
    }
}
