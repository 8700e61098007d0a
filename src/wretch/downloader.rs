use std::fs::write;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget};

use crate::wretch::catalog::{AlbumCatalog, PhotoPageRef};
use crate::wretch::sender::WebSource;
use crate::wretch::tui::{ProgressBarBuilder, download_style};

/// The result of downloading a single photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DownloadOutcome {
    file_name: String,
    succeeded: bool,
}

impl DownloadOutcome {
    /// Name the file was (or would have been) saved under. Falls back to the photo page URL when
    /// no file URL could be resolved.
    pub(crate) fn file_name(&self) -> &str {
        &self.file_name
    }

    pub(crate) fn succeeded(&self) -> bool {
        self.succeeded
    }
}

/// Per-photo outcomes of one album download, in input order.
#[derive(Debug, Clone, Default)]
pub(crate) struct DownloadSummary {
    outcomes: Vec<DownloadOutcome>,
    downloaded: usize,
}

impl DownloadSummary {
    pub(crate) fn outcomes(&self) -> &[DownloadOutcome] {
        &self.outcomes
    }

    /// Number of files saved successfully.
    pub(crate) fn downloaded(&self) -> usize {
        self.downloaded
    }

    pub(crate) fn failed(&self) -> usize {
        self.outcomes.len() - self.downloaded
    }

    fn record(&mut self, file_name: String, succeeded: bool) {
        if succeeded {
            self.downloaded += 1;
        }
        self.outcomes.push(DownloadOutcome { file_name, succeeded });
    }
}

/// Derives the saved file name from a file URL.
///
/// Only the part before the first `?` is looked at. The last path segment ending in `.jpg` is
/// preferred, otherwise the last path segment is used.
pub(crate) fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    let segments: Vec<&str> = match path.split_once("://") {
        // The first segment after the scheme is the host.
        Some((_, rest)) => rest.split('/').skip(1).collect(),
        None => path.split('/').collect(),
    };
    let segments: Vec<&str> = segments.into_iter().filter(|s| !s.is_empty()).collect();

    segments
        .iter()
        .rev()
        .find(|s| s.to_ascii_lowercase().ends_with(".jpg"))
        .or_else(|| segments.last())
        .map(|s| s.to_string())
}

/// Saves the photos of an album one at a time, pausing between each.
pub(crate) struct Downloader<'a, S: WebSource> {
    catalog: &'a AlbumCatalog<S>,
    /// Pause after every photo, whether it succeeded or not.
    pacing_delay: Duration,
    progress_bar: ProgressBar,
}

impl<'a, S: WebSource> Downloader<'a, S> {
    pub(crate) fn new(catalog: &'a AlbumCatalog<S>, pacing_delay: Duration) -> Self {
        Downloader {
            catalog,
            pacing_delay,
            progress_bar: ProgressBar::hidden(),
        }
    }

    /// Shows a progress bar on stderr, prefixed with `label`, while downloading.
    pub(crate) fn with_progress(mut self, label: &str) -> Self {
        self.progress_bar = ProgressBarBuilder::new(0)
            .style(download_style())
            .draw_target(ProgressDrawTarget::stderr_with_hz(5))
            .prefix(label)
            .steady_tick(Duration::from_millis(200))
            .build();
        self
    }

    /// Downloads every photo of an album into `target_dir`.
    ///
    /// Photos are handled strictly in order. A photo whose file URL can't be resolved or whose file
    /// can't be fetched or written is recorded as failed and the rest still run. `target_dir` has
    /// to exist already.
    ///
    /// # Arguments
    ///
    /// * `target_dir`: Directory files are saved into.
    /// * `photo_pages`: The album's photo pages.
    ///
    /// returns: DownloadSummary
    pub(crate) fn download_album(&self, target_dir: &Path, photo_pages: &[PhotoPageRef]) -> DownloadSummary {
        let mut summary = DownloadSummary::default();
        self.progress_bar.set_length(photo_pages.len() as u64);
        self.progress_bar.set_position(0);

        for photo_page in photo_pages {
            let (file_name, succeeded) = self.download_photo(target_dir, photo_page);
            self.progress_bar.set_message(file_name.clone());
            self.progress_bar.inc(1);
            summary.record(file_name, succeeded);

            sleep(self.pacing_delay);
        }

        self.progress_bar.finish_and_clear();
        info!(
            "Saved {} of {} photos into {}",
            summary.downloaded(),
            photo_pages.len(),
            target_dir.display()
        );

        summary
    }

    /// Resolves and saves a single photo, returning the file name used and whether it was saved.
    fn download_photo(&self, target_dir: &Path, photo_page: &PhotoPageRef) -> (String, bool) {
        let file_url = match self.catalog.resolve_file_url(photo_page) {
            Ok(Some(file_url)) => file_url,
            Ok(None) => {
                warn!("No file found on {}", photo_page.url());
                return (photo_page.url().to_string(), false);
            }
            Err(err) => {
                warn!("Unable to open photo page: {err}");
                return (photo_page.url().to_string(), false);
            }
        };

        let Some(file_name) = file_name_from_url(&file_url) else {
            warn!("Unable to derive a file name from {file_url}");
            return (file_url, false);
        };

        trace!("Downloading {file_name}...");
        let referer = self.catalog.album_root();
        let bytes = match self.catalog.source().get_bytes(&file_url, Some(&referer)) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Failed to download {file_name}: {err}");
                return (file_name, false);
            }
        };

        let file_path = target_dir.join(&file_name);
        if let Err(err) = write(&file_path, &bytes) {
            warn!("Failed to write to file {}: {err}", file_path.display());
            return (file_name, false);
        }

        (file_name, true)
    }
}
