use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Manages the directory structure for downloaded albums: `<root>/<account>/<album name>`.
#[derive(Debug, Clone)]
pub(crate) struct DirectoryManager {
    /// Base directory for all downloads
    root_dir: PathBuf,
}

impl DirectoryManager {
    /// Creates a new DirectoryManager with the specified root directory
    pub(crate) fn new(root_dir: &str) -> Self {
        DirectoryManager {
            root_dir: PathBuf::from(root_dir),
        }
    }

    /// Creates or gets the directory for one album of an account
    pub(crate) fn album_directory(&self, account: &str, album_name: &str) -> Result<PathBuf> {
        let album_dir = self
            .root_dir
            .join(sanitize_filename(account))
            .join(sanitize_filename(album_name));
        fs::create_dir_all(&album_dir)
            .with_context(|| format!("Failed to create album directory at {:?}", album_dir))?;
        trace!("Album directory ready at {}", album_dir.display());
        Ok(album_dir)
    }
}

/// Sanitizes a name to be safe as a single path component
pub(crate) fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c
        })
        .collect();

    match sanitized.as_str() {
        "" | "." | ".." => String::from("_"),
        _ => sanitized,
    }
}

/// Opens `dir` in the platform's file browser.
pub(crate) fn open_directory(dir: &Path) -> Result<()> {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "linux") {
        "xdg-open"
    } else {
        bail!("Opening directories isn't supported on this platform");
    };

    info!("Open directory: {}", dir.display());
    Command::new(program)
        .arg(dir)
        .spawn()
        .with_context(|| format!("Failed to run {program} for {}", dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(sanitize_filename("2012/05: trip?"), "2012_05_ trip_");
        assert_eq!(sanitize_filename("a<b>c|d*e\"f\\g"), "a_b_c_d_e_f_g");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
        assert_eq!(sanitize_filename("旅行 Trip"), "旅行 Trip");
    }

    #[test]
    fn names_that_would_escape_are_neutralised() {
        assert_eq!(sanitize_filename(".."), "_");
        assert_eq!(sanitize_filename("."), "_");
        assert_eq!(sanitize_filename("   "), "_");
    }

    #[test]
    fn album_directory_is_nested_by_account() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("WretchAlbum");
        let manager = DirectoryManager::new(root.to_str().unwrap());

        let dir = manager.album_directory("Riddle", "Trip/2012").unwrap();
        assert_eq!(dir, root.join("Riddle").join("Trip_2012"));
        assert!(dir.is_dir());

        // Creating it again is fine.
        assert_eq!(manager.album_directory("Riddle", "Trip/2012").unwrap(), dir);
    }
}
