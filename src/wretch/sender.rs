use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::REFERER;
use reqwest::{StatusCode, Url};
use thiserror::Error;

/// Errors raised while fetching a page or a file from the album site.
#[derive(Error, Debug)]
pub(crate) enum FetchError {
    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Anything that can serve the album site's pages and files.
///
/// The catalog and downloader only ever talk to the site through this trait, which keeps them
/// testable without a network.
pub(crate) trait WebSource {
    /// Performs a blocking GET and returns the decoded body.
    fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Performs a blocking GET and returns the raw body, sending `referer` when given.
    fn get_bytes(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, FetchError>;
}

/// The blocking HTTP client used for every request made to the album site.
#[derive(Clone, Debug)]
pub(crate) struct RequestSender {
    client: Client,
}

impl RequestSender {
    /// Creates a new sender.
    ///
    /// # Arguments
    ///
    /// * `user_agent`: User agent sent with every request.
    /// * `timeout`: Whole-request timeout, `None` keeps the client default.
    pub(crate) fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .deflate(true)
            .brotli(true);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    fn parse_url(url: &str) -> Result<Url, FetchError> {
        Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn send(&self, url: &str, referer: Option<&str>) -> Result<reqwest::blocking::Response, FetchError> {
        let parsed = Self::parse_url(url)?;
        let mut request = self.client.get(parsed);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

impl WebSource for RequestSender {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        trace!("GET {url}");
        self.send(url, None)?
            .text()
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })
    }

    fn get_bytes(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, FetchError> {
        trace!("GET {url} (referer: {})", referer.unwrap_or("none"));
        let bytes = self
            .send(url, referer)?
            .bytes()
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

/// In-memory site used by the unit tests.
#[cfg(test)]
pub(crate) mod mock {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use reqwest::StatusCode;

    use super::{FetchError, WebSource};

    #[derive(Default)]
    pub(crate) struct MockSite {
        pages: HashMap<String, String>,
        files: HashMap<String, Vec<u8>>,
        requests: RefCell<Vec<String>>,
        referers: RefCell<Vec<Option<String>>>,
    }

    impl MockSite {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub(crate) fn file(mut self, url: &str, bytes: &[u8]) -> Self {
            self.files.insert(url.to_string(), bytes.to_vec());
            self
        }

        /// Every URL requested so far, in request order.
        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }

        /// Referers sent with the file requests, in request order.
        pub(crate) fn referers(&self) -> Vec<Option<String>> {
            self.referers.borrow().clone()
        }

        fn not_found(url: &str) -> FetchError {
            FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            }
        }
    }

    impl WebSource for MockSite {
        fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| Self::not_found(url))
        }

        fn get_bytes(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            self.referers.borrow_mut().push(referer.map(str::to_string));
            self.files.get(url).cloned().ok_or_else(|| Self::not_found(url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_urls_are_rejected_before_sending() {
        let sender = RequestSender::new("wretch_downloader-test", None).unwrap();
        match sender.get_text("not a url") {
            Err(FetchError::InvalidUrl { url, .. }) => assert_eq!(url, "not a url"),
            other => panic!("expected an invalid URL error, got {other:?}"),
        }
    }

    #[test]
    fn fetch_errors_name_the_url() {
        let error = FetchError::Status {
            url: String::from("http://www.wretch.cc/album/someone"),
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(
            error.to_string(),
            "http://www.wretch.cc/album/someone responded with 404 Not Found"
        );
    }
}
