use std::fs::{read_to_string, write};
use std::io;
use std::path::Path;
use std::process::exit;
use std::time::Duration;

use anyhow::{Context, Error};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{from_str, to_string_pretty};

pub(crate) mod directory;

/// Name of the configuration file.
pub(crate) const CONFIG_NAME: &str = "config.json";

/// Whether the album's directory is opened once it has been downloaded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OpenDirectory {
    Ask,
    Always,
    Never,
}

/// Config that is used to do general setup.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct Config {
    /// The location of the download directory.
    #[serde(rename = "downloadDirectory")]
    download_directory: String,
    /// Host the album site is served from.
    #[serde(default = "default_host")]
    host: String,
    /// Pause between two photo downloads, in milliseconds.
    #[serde(rename = "pacingDelayMillis", default = "default_pacing_delay_millis")]
    pacing_delay_millis: u64,
    /// Whole-request timeout in seconds, 0 leaves the HTTP client's default.
    #[serde(rename = "requestTimeoutSecs", default)]
    request_timeout_secs: u64,
    /// User agent sent with every request.
    #[serde(rename = "userAgent", default = "default_user_agent")]
    user_agent: String,
    #[serde(rename = "openDirectoryAfterDownload", default = "default_open_directory")]
    open_directory: OpenDirectory,
}

fn default_host() -> String { String::from("www.wretch.cc") }
fn default_pacing_delay_millis() -> u64 { 1000 }
fn default_user_agent() -> String { format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")) }
fn default_open_directory() -> OpenDirectory { OpenDirectory::Ask }

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    /// The location of the download directory.
    pub(crate) fn download_directory(&self) -> &str {
        &self.download_directory
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_millis)
    }

    pub(crate) fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub(crate) fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub(crate) fn open_directory(&self) -> OpenDirectory {
        self.open_directory
    }

    /// Checks config and ensure it isn't missing.
    pub(crate) fn config_exists() -> bool {
        if !Path::new(CONFIG_NAME).exists() {
            trace!("config.json: does not exist!");
            return false;
        }

        true
    }

    /// Creates config file.
    pub(crate) fn create_config() -> Result<(), Error> {
        let json = to_string_pretty(&Config::default())?;
        write(Path::new(CONFIG_NAME), json)
            .with_context(|| format!("Failed to write config file: {}", CONFIG_NAME))?;

        Ok(())
    }

    /// Get the global instance of the `Config`.
    pub(crate) fn get() -> &'static Config {
        CONFIG.get_or_init(|| match Self::load(Path::new(CONFIG_NAME)) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config: {:#}", e);
                emergency_exit("Configuration loading failed");
            }
        })
    }

    /// Loads and validates the config at `path`.
    fn load(path: &Path) -> Result<Self, Error> {
        let contents = read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&contents)?;
        trace!("Config loaded: {:?}", config);
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, Error> {
        let mut config: Config = from_str(contents).context("Config file is not valid")?;
        config.host = config.host.trim().trim_end_matches('/').to_string();
        if config.host.is_empty() {
            anyhow::bail!("The host can't be empty");
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            download_directory: String::from("WretchAlbum"),
            host: default_host(),
            pacing_delay_millis: default_pacing_delay_millis(),
            request_timeout_secs: 0,
            user_agent: default_user_agent(),
            open_directory: default_open_directory(),
        }
    }
}

/// Exits the program after message explaining the error and prompting the user to press `ENTER`.
///
/// # Arguments
///
/// * `error`: The error message to print.
pub(crate) fn emergency_exit(error: &str) -> ! {
    error!("{}", error);
    println!("Press ENTER to close the application...");

    let mut line = String::new();
    io::stdin().read_line(&mut line).unwrap_or_default();

    exit(0x00FF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let json = to_string_pretty(&Config::default()).unwrap();
        assert!(json.contains("\"downloadDirectory\": \"WretchAlbum\""));
        assert!(json.contains("\"openDirectoryAfterDownload\": \"ask\""));

        let config = Config::parse(&json).unwrap();
        assert_eq!(config.host(), "www.wretch.cc");
        assert_eq!(config.pacing_delay(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::parse(r#"{ "downloadDirectory": "photos" }"#).unwrap();
        assert_eq!(config.download_directory(), "photos");
        assert_eq!(config.host(), "www.wretch.cc");
        assert_eq!(config.open_directory(), OpenDirectory::Ask);
    }

    #[test]
    fn host_is_trimmed_and_required() {
        let config = Config::parse(r#"{ "downloadDirectory": "d", "host": " mirror.example/ " }"#).unwrap();
        assert_eq!(config.host(), "mirror.example");
        assert!(Config::parse(r#"{ "downloadDirectory": "d", "host": "  " }"#).is_err());
    }

    #[test]
    fn unknown_open_policy_is_rejected() {
        let json = r#"{ "downloadDirectory": "d", "openDirectoryAfterDownload": "sometimes" }"#;
        assert!(Config::parse(json).is_err());
    }

    #[test]
    fn timeout_is_optional() {
        let config = Config::parse(r#"{ "downloadDirectory": "d", "requestTimeoutSecs": 30 }"#).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join(CONFIG_NAME)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }
}
