use std::path::Path;

use anyhow::Error;
use console::style;
use dialoguer::Confirm;

use crate::wretch::catalog::{Album, AlbumCatalog};
use crate::wretch::downloader::{DownloadSummary, Downloader};
use crate::wretch::io::directory::{DirectoryManager, open_directory};
use crate::wretch::io::{Config, OpenDirectory};
use crate::wretch::sender::{FetchError, RequestSender};

pub(crate) mod catalog;
pub(crate) mod collector;
pub(crate) mod downloader;
pub(crate) mod extractor;
pub(crate) mod io;
pub(crate) mod sender;
pub(crate) mod tui;

/// Longest album name shown in the progress bar's prefix.
const PREFIX_LENGTH: usize = 16;

/// A web connector that browses one account's albums and downloads the ones picked by the user.
pub(crate) struct WretchWebConnector {
    /// Catalog of the account being browsed.
    catalog: AlbumCatalog<RequestSender>,
    /// Where album directories are created.
    directories: DirectoryManager,
    /// The album list page currently shown.
    page: u32,
    /// Albums listed on the current page.
    albums: Vec<Album>,
}

impl WretchWebConnector {
    /// Connects to `account` and lists the first page of its albums.
    ///
    /// # Arguments
    ///
    /// * `request_sender`: The sender used for every request.
    /// * `account`: The account to browse.
    ///
    /// returns: Result<WretchWebConnector, FetchError>
    pub(crate) fn connect(request_sender: &RequestSender, account: &str) -> Result<Self, FetchError> {
        let config = Config::get();
        let catalog = AlbumCatalog::new(request_sender.clone(), config.host(), account);
        let albums = catalog.list_page(1)?;

        Ok(WretchWebConnector {
            catalog,
            directories: DirectoryManager::new(config.download_directory()),
            page: 1,
            albums,
        })
    }

    pub(crate) fn account(&self) -> &str {
        self.catalog.account()
    }

    pub(crate) fn page(&self) -> u32 {
        self.page
    }

    pub(crate) fn albums(&self) -> &[Album] {
        &self.albums
    }

    /// Lists another page of albums. The current page is kept if it can't be fetched.
    pub(crate) fn go_to_page(&mut self, page: u32) -> Result<(), FetchError> {
        let page = page.max(1);
        self.albums = self.catalog.list_page(page)?;
        self.page = page;
        Ok(())
    }

    /// Prints the albums of the current page.
    pub(crate) fn show_albums(&self) {
        println!("\nAlbum book list (page:{}):", self.page);
        for (i, album) in self.albums.iter().enumerate() {
            match album.picture_count() {
                Some(count) => println!(" {}. {} ({} pictures)", i + 1, album.name(), count),
                None => println!(" {}. {}", i + 1, album.name()),
            }
        }
        println!();
    }

    /// Downloads the album at `index` of the current page into its own directory.
    ///
    /// Fails only when the directory can't be created or the album's pages can't be listed; photos
    /// that fail to download are reported in the summary.
    pub(crate) fn download_album(&self, index: usize) -> Result<(), Error> {
        let Some(album) = self.albums.get(index) else {
            anyhow::bail!("There is no album {} on this page", index + 1);
        };

        let config = Config::get();
        let target_dir = self.directories.album_directory(self.account(), album.name())?;
        trace!("Album Account:    \"{}\"", album.account());
        trace!("Album Name:       \"{}\"", album.name());
        trace!("Album Number:     \"{}\"", album.number());
        trace!("Album Cover:      \"{}\"", album.cover_url().unwrap_or_default());
        trace!("Save Directory:   \"{}\"", target_dir.display());

        info!(
            "Collecting photos of {}...",
            style(format!("\"{}\"", album.name())).color256(39).italic()
        );
        let photo_pages = self.catalog.photo_pages(album.number())?;

        let label: String = album.name().chars().take(PREFIX_LENGTH).collect();
        let summary = Downloader::new(&self.catalog, config.pacing_delay())
            .with_progress(&label)
            .download_album(&target_dir, &photo_pages);

        self.report(&summary);
        self.offer_open_directory(album, &target_dir, config.open_directory());
        Ok(())
    }

    fn report(&self, summary: &DownloadSummary) {
        for outcome in summary.outcomes().iter().filter(|o| !o.succeeded()) {
            warn!(" => Failed: {}", outcome.file_name());
        }

        println!("\n=> Done! Download the {} files!", summary.downloaded());
        if summary.failed() > 0 {
            info!("{} photos could not be downloaded", summary.failed());
        }
    }

    /// Opens the album's directory, asking first unless the config says otherwise.
    fn offer_open_directory(&self, album: &Album, target_dir: &Path, policy: OpenDirectory) {
        let open = match policy {
            OpenDirectory::Never => false,
            OpenDirectory::Always => true,
            OpenDirectory::Ask => Confirm::new()
                .with_prompt(format!("Do you want to open \"{}\" directory?", album.name()))
                .default(false)
                .interact()
                .unwrap_or(false),
        };

        if open {
            if let Err(err) = open_directory(target_dir) {
                warn!("Unable to open directory: {:#}", err);
            }
        }
    }
}
