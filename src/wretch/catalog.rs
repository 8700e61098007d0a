use crate::wretch::collector::{PageScan, Paginator};
use crate::wretch::extractor::{PageExtractor, scan_file_url};
use crate::wretch::sender::{FetchError, WebSource};

/// A numbered photo album belonging to one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Album {
    account: String,
    number: String,
    name: String,
    picture_count: Option<u32>,
    cover_url: Option<String>,
}

impl Album {
    pub(crate) fn new(account: &str, number: &str, name: &str) -> Self {
        Album {
            account: account.to_string(),
            number: number.to_string(),
            name: name.to_string(),
            picture_count: None,
            cover_url: None,
        }
    }

    pub(crate) fn account(&self) -> &str {
        &self.account
    }

    /// The book number, used to build the album's page URLs.
    pub(crate) fn number(&self) -> &str {
        &self.number
    }

    /// The album's title exactly as listed. May contain characters that aren't valid in paths.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn picture_count(&self) -> Option<u32> {
        self.picture_count
    }

    pub(crate) fn cover_url(&self) -> Option<&str> {
        self.cover_url.as_deref()
    }

    pub(crate) fn set_picture_count(&mut self, count: u32) {
        self.picture_count = Some(count);
    }

    pub(crate) fn set_cover_url(&mut self, url: String) {
        self.cover_url = Some(url);
    }
}

/// A page showing a single photo, which has to be fetched to find the photo's file URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PhotoPageRef(String);

impl PhotoPageRef {
    pub(crate) fn new(url: String) -> Self {
        PhotoPageRef(url)
    }

    pub(crate) fn url(&self) -> &str {
        &self.0
    }
}

/// Lists and walks the albums of one account.
pub(crate) struct AlbumCatalog<S: WebSource> {
    /// Source every page is fetched from.
    source: S,
    /// Host the album site is served from.
    host: String,
    /// Account whose albums are browsed.
    account: String,
    extractor: PageExtractor,
}

impl<S: WebSource> AlbumCatalog<S> {
    /// Creates a catalog for `account` on `host`.
    pub(crate) fn new(source: S, host: &str, account: &str) -> Self {
        AlbumCatalog {
            source,
            host: host.to_string(),
            account: account.to_string(),
            extractor: PageExtractor::new(host, account),
        }
    }

    pub(crate) fn account(&self) -> &str {
        &self.account
    }

    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    /// Root of the album site, sent as the referer when downloading files.
    pub(crate) fn album_root(&self) -> String {
        format!("http://{}/album/", self.host)
    }

    /// URL of the account's album list. Page 1 carries no page parameter.
    pub(crate) fn album_list_url(&self, page: u32) -> String {
        let url = format!("{}{}", self.album_root(), self.account);
        if page >= 2 {
            format!("{url}&page={page}")
        } else {
            url
        }
    }

    /// URL of one page of album `book`. Page 1 carries no page parameter.
    pub(crate) fn book_url(&self, book: &str, page: u32) -> String {
        let url = format!("{}album.php?id={}&book={}", self.album_root(), self.account, book);
        if page >= 2 {
            format!("{url}&page={page}")
        } else {
            url
        }
    }

    /// Fetches a single page of the album list.
    ///
    /// The list itself isn't followed to later pages; moving between pages is up to the caller.
    ///
    /// # Arguments
    ///
    /// * `page`: The page number, starting at 1.
    ///
    /// returns: Result<Vec<Album>, FetchError>
    pub(crate) fn list_page(&self, page: u32) -> Result<Vec<Album>, FetchError> {
        let url = self.album_list_url(page);
        trace!("Listing albums of \"{}\" (page {page})", self.account);
        let html = self.source.get_text(&url)?;
        let albums = self.extractor.scan_album_list(&html);
        info!("Found {} albums on page {page} of \"{}\"", albums.len(), self.account);
        Ok(albums)
    }

    /// Collects every photo page of album `book`, following the album's pages until one no longer
    /// links to the next.
    ///
    /// A failed fetch on any page aborts the walk; photos gathered from earlier pages are dropped.
    pub(crate) fn photo_pages(&self, book: &str) -> Result<Vec<PhotoPageRef>, FetchError> {
        let photos = Paginator::new(&self.source).collect(
            &self.book_url(book, 1),
            |page| self.book_url(book, page),
            |html, next_page| {
                let scan = self.extractor.scan_photo_page(html, book, next_page);
                PageScan {
                    items: scan.links,
                    has_next: scan.has_next,
                }
            },
        )?;

        info!("Found {} photos in book {book}", photos.len());
        Ok(photos)
    }

    /// Fetches a photo page and returns the direct URL of its file, if the page shows one.
    pub(crate) fn resolve_file_url(&self, photo_page: &PhotoPageRef) -> Result<Option<String>, FetchError> {
        let html = self.source.get_text(photo_page.url())?;
        let file_url = scan_file_url(&html);
        if file_url.is_none() {
            trace!("No display image on {}", photo_page.url());
        }

        Ok(file_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wretch::sender::mock::MockSite;

    const HOST: &str = "www.wretch.cc";

    fn photo_link(file: u32) -> String {
        format!(
            r#"<a href="./show.php?i=Riddle&b=9&f={file}&p=0&sp=0" class="t"><img src="thumb{file}.jpg"></a>"#
        )
    }

    #[test]
    fn list_urls_only_carry_page_from_two() {
        let catalog = AlbumCatalog::new(MockSite::new(), HOST, "Riddle");
        assert_eq!(catalog.album_list_url(1), "http://www.wretch.cc/album/Riddle");
        assert_eq!(catalog.album_list_url(2), "http://www.wretch.cc/album/Riddle&page=2");
        assert_eq!(
            catalog.book_url("9", 1),
            "http://www.wretch.cc/album/album.php?id=Riddle&book=9"
        );
        assert_eq!(
            catalog.book_url("9", 3),
            "http://www.wretch.cc/album/album.php?id=Riddle&book=9&page=3"
        );
    }

    #[test]
    fn list_page_parses_the_requested_page() {
        let site = MockSite::new().page(
            "http://www.wretch.cc/album/Riddle&page=2",
            r#"<a href="./album.php?id=Riddle&book=101">Trip</a>
<a href="./album.php?id=Riddle&book=102">Party</a>"#,
        );
        let catalog = AlbumCatalog::new(site, HOST, "Riddle");

        let albums = catalog.list_page(2).unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!((albums[0].number(), albums[0].name()), ("101", "Trip"));
        assert_eq!((albums[1].number(), albums[1].name()), ("102", "Party"));
        assert_eq!(catalog.source().requests().len(), 1);
    }

    #[test]
    fn list_page_without_albums_is_empty() {
        let site = MockSite::new().page("http://www.wretch.cc/album/Riddle", "<html></html>");
        let catalog = AlbumCatalog::new(site, HOST, "Riddle");
        assert!(catalog.list_page(1).unwrap().is_empty());
    }

    #[test]
    fn list_page_propagates_fetch_errors() {
        let catalog = AlbumCatalog::new(MockSite::new(), HOST, "Nobody");
        assert!(matches!(catalog.list_page(1), Err(FetchError::Status { .. })));
    }

    #[test]
    fn photo_pages_walk_every_page_in_order() {
        let site = MockSite::new()
            .page(
                "http://www.wretch.cc/album/album.php?id=Riddle&book=9",
                &format!("{}\n<a href=\"./album.php?id=Riddle&book=9&page=2\">2</a>", photo_link(1)),
            )
            .page(
                "http://www.wretch.cc/album/album.php?id=Riddle&book=9&page=2",
                &format!(
                    "{}\n{}\n<a href=\"./album.php?id=Riddle&book=9&page=3\">3</a>",
                    photo_link(2),
                    photo_link(3)
                ),
            )
            .page(
                "http://www.wretch.cc/album/album.php?id=Riddle&book=9&page=3",
                &format!("{}\n<a href=\"./album.php?id=Riddle&book=9&page=2\">2</a>", photo_link(4)),
            );
        let catalog = AlbumCatalog::new(site, HOST, "Riddle");

        let pages = catalog.photo_pages("9").unwrap();
        let files: Vec<&str> = pages.iter().map(|p| p.url()).collect();
        assert_eq!(
            files,
            vec![
                "http://www.wretch.cc/album/show.php?i=Riddle&b=9&f=1&p=0&sp=0",
                "http://www.wretch.cc/album/show.php?i=Riddle&b=9&f=2&p=0&sp=0",
                "http://www.wretch.cc/album/show.php?i=Riddle&b=9&f=3&p=0&sp=0",
                "http://www.wretch.cc/album/show.php?i=Riddle&b=9&f=4&p=0&sp=0",
            ]
        );
        assert_eq!(catalog.source().requests().len(), 3);
    }

    #[test]
    fn photo_pages_of_empty_album_is_empty() {
        let site = MockSite::new().page(
            "http://www.wretch.cc/album/album.php?id=Riddle&book=9",
            "<p>This album is empty</p>",
        );
        let catalog = AlbumCatalog::new(site, HOST, "Riddle");
        assert!(catalog.photo_pages("9").unwrap().is_empty());
    }

    #[test]
    fn photo_pages_fail_when_a_later_page_fails() {
        let site = MockSite::new().page(
            "http://www.wretch.cc/album/album.php?id=Riddle&book=9",
            &format!("{}\n<a href=\"./album.php?id=Riddle&book=9&page=2\">2</a>", photo_link(1)),
        );
        let catalog = AlbumCatalog::new(site, HOST, "Riddle");
        assert!(catalog.photo_pages("9").is_err());
    }

    #[test]
    fn resolve_file_url_reads_the_display_image() {
        let photo = PhotoPageRef::new(String::from(
            "http://www.wretch.cc/album/show.php?i=Riddle&b=9&f=1&p=0&sp=0",
        ));
        let site = MockSite::new().page(
            photo.url(),
            "<img id='DisplayImage' src='http://f1.wretch.yimg.com/Riddle/9/1.jpg?abc' border='0'>",
        );
        let catalog = AlbumCatalog::new(site, HOST, "Riddle");

        assert_eq!(
            catalog.resolve_file_url(&photo).unwrap(),
            Some(String::from("http://f1.wretch.yimg.com/Riddle/9/1.jpg?abc"))
        );
    }

    #[test]
    fn resolve_file_url_without_image_is_none() {
        let photo = PhotoPageRef::new(String::from("http://www.wretch.cc/album/show.php?i=Riddle&b=9&f=1&p=0&sp=0"));
        let site = MockSite::new().page(photo.url(), "<p>removed</p>");
        let catalog = AlbumCatalog::new(site, HOST, "Riddle");
        assert_eq!(catalog.resolve_file_url(&photo).unwrap(), None);
    }
}
