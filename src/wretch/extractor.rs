//! Line-oriented pattern matching over the album site's raw HTML.
//!
//! The site is scraped structurally: every rule below matches a fixed shape of markup on a single
//! line. Nothing here ever fails; markup that doesn't match simply produces nothing.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Regex, escape};

use crate::wretch::catalog::{Album, PhotoPageRef};

lazy_static! {
    /// The full-size image on a photo page.
    static ref DISPLAY_IMAGE: Regex = Regex::new(r"<img id='DisplayImage' src='([^']+)' ").unwrap();

    /// Older photo pages use a class instead of an id.
    static ref DISPLAY_IMAGE_CLASS: Regex = Regex::new(r"<img class='displayimg' src='([^']+)' ").unwrap();

    /// The "<N> pictures" marker printed under each album on the list page.
    static ref PICTURE_COUNT: Regex = Regex::new(r"(?i)(\d+)\s*pictures").unwrap();
}

/// Photo page links found on one page of an album, and whether the album continues on another page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PhotoPageScan {
    pub(crate) links: Vec<PhotoPageRef>,
    pub(crate) has_next: bool,
}

/// Extracts albums, photo pages and file URLs for a single account.
#[derive(Debug, Clone)]
pub(crate) struct PageExtractor {
    account: String,
    host: String,
    album_entry: Regex,
}

impl PageExtractor {
    /// Creates an extractor for `account` on `host`.
    pub(crate) fn new(host: &str, account: &str) -> Self {
        let album_entry = format!(
            r#"<a href="\./album\.php\?id={}&book=(\d+)">(.+)</a>"#,
            escape(account)
        );

        PageExtractor {
            account: account.to_string(),
            host: host.to_string(),
            // Account names are escaped, so the pattern always compiles.
            album_entry: Regex::new(&album_entry).unwrap(),
        }
    }

    /// Parses one album list page into albums, in the order they appear.
    ///
    /// Three independent passes run over the page: album anchors, picture counts (each assigned to
    /// the album listed closest above it) and cover thumbnails (matched back to albums by number).
    pub(crate) fn scan_album_list(&self, html: &str) -> Vec<Album> {
        let lines: Vec<&str> = html.lines().collect();

        // Line index of each album, kept alongside it for the count pass.
        let mut entries: Vec<(usize, Album)> = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            if let Some(captures) = self.album_entry.captures(line) {
                entries.push((
                    index,
                    Album::new(&self.account, &captures[1], &captures[2]),
                ));
            }
        }

        for (index, line) in lines.iter().enumerate() {
            let Some(count) = PICTURE_COUNT
                .captures(line)
                .and_then(|c| c[1].parse::<u32>().ok())
            else {
                continue;
            };

            match entries.iter_mut().rev().find(|(at, _)| *at <= index) {
                Some((_, album)) => album.set_picture_count(count),
                None => trace!("Picture count {count} on line {index} precedes every album, ignoring"),
            }
        }

        let covers = self.scan_covers(&lines);
        let mut albums: Vec<Album> = entries.into_iter().map(|(_, album)| album).collect();
        for album in albums.iter_mut() {
            if let Some(cover) = covers.get(album.number()) {
                album.set_cover_url(cover.clone());
            }
        }

        albums
    }

    /// Maps album numbers to cover thumbnail URLs.
    ///
    /// The site doesn't always keep the account's casing in thumbnail paths, so when nothing matches
    /// the account verbatim the lower-cased account is tried.
    fn scan_covers(&self, lines: &[&str]) -> HashMap<String, String> {
        let covers = Self::match_covers(lines, &self.account);
        let lowered = self.account.to_lowercase();
        if covers.is_empty() && lowered != self.account {
            trace!("No cover matched \"{}\", retrying as \"{lowered}\"", self.account);
            return Self::match_covers(lines, &lowered);
        }

        covers
    }

    fn match_covers(lines: &[&str], account: &str) -> HashMap<String, String> {
        let pattern = format!(
            r#"<img[^>]*\ssrc=["']([^"']*/{}/(\d+)/thumbs/[^"']*)["']"#,
            escape(account)
        );
        let cover = Regex::new(&pattern).unwrap();

        let mut covers = HashMap::new();
        for line in lines {
            for captures in cover.captures_iter(line) {
                covers.insert(captures[2].to_string(), captures[1].to_string());
            }
        }

        covers
    }

    /// Parses one page of album `book` into its photo page links.
    ///
    /// # Arguments
    ///
    /// * `html`: The page's markup.
    /// * `book`: The album's book number.
    /// * `next_page`: The page number that follows this one.
    pub(crate) fn scan_photo_page(&self, html: &str, book: &str, next_page: u32) -> PhotoPageScan {
        let pattern = format!(
            r#"<a href="\./(show\.php\?i={}&b={}&f=\d+&p=\d+&sp=\d+)".+><img src="#,
            escape(&self.account),
            escape(book)
        );
        let photo_link = Regex::new(&pattern).unwrap();

        let links = html
            .lines()
            .filter_map(|line| photo_link.captures(line))
            .map(|captures| PhotoPageRef::new(format!("http://{}/album/{}", self.host, &captures[1])))
            .collect();

        let next_link = format!("album.php?id={}&book={}&page={}", self.account, book, next_page);
        PhotoPageScan {
            links,
            has_next: html.contains(&next_link),
        }
    }
}

/// Finds the direct file URL on a photo page.
///
/// Every line is scanned and the last matching one wins.
pub(crate) fn scan_file_url(html: &str) -> Option<String> {
    let mut file_url = None;
    for line in html.lines() {
        if let Some(captures) = DISPLAY_IMAGE.captures(line) {
            file_url = Some(captures[1].to_string());
        } else if let Some(captures) = DISPLAY_IMAGE_CLASS.captures(line) {
            file_url = Some(captures[1].to_string());
        }
    }

    file_url
}
