//! HTTP implementation of [`ArchiveFetcher`].
//!
//! The fetcher exposes a blocking interface and drives `reqwest` on a Tokio
//! runtime it owns. Inside an existing multi-threaded runtime it borrows that
//! runtime's handle through [`tokio::task::block_in_place`] instead.

use std::{io, io::Write, time::Duration};

use futures_util::StreamExt;
use log::debug;
use reqwest::Client;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;
use wharf_core::TransportError;

use super::ArchiveFetcher;
use crate::config::DEFAULT_CONNECT_TIMEOUT;

/// Default user agent for archive downloads.
pub const DEFAULT_USER_AGENT: &str = "wharf-sync/0.1";

/// Error type for [`HttpArchiveFetcher`] construction failures.
#[derive(Debug)]
pub enum FetcherBuildError {
    /// Failed to build the HTTP client.
    HttpClient(reqwest::Error),
    /// Failed to build the Tokio runtime.
    Runtime(io::Error),
}

impl std::fmt::Display for FetcherBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpClient(err) => write!(f, "failed to build HTTP client: {err}"),
            Self::Runtime(err) => write!(f, "failed to build Tokio runtime: {err}"),
        }
    }
}

impl std::error::Error for FetcherBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::HttpClient(err) => Some(err),
            Self::Runtime(err) => Some(err),
        }
    }
}

/// Streams export archives over HTTP(S).
pub struct HttpArchiveFetcher {
    client: Client,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpArchiveFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpArchiveFetcher")
            .field("client", &self.client)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpArchiveFetcher {
    /// Build a fetcher with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new() -> Result<Self, FetcherBuildError> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Build a fetcher with an explicit connect timeout.
    ///
    /// Only connecting is bounded; large archives may take arbitrarily long to
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, FetcherBuildError> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(FetcherBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(FetcherBuildError::Runtime)?;
        Ok(Self { client, runtime })
    }

    async fn stream_into(&self, url: Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let display = url.to_string();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, &display))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, &display))?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|err| convert_reqwest_error(err, &display))?;
            sink.write_all(&bytes)
                .map_err(|source| TransportError::Network {
                    url: display.clone(),
                    source,
                })?;
            written += bytes.len() as u64;
        }
        debug!("streamed {written} bytes from {display}");
        Ok(written)
    }
}

impl ArchiveFetcher for HttpArchiveFetcher {
    fn fetch_archive(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let parsed = Url::parse(url).map_err(|err| TransportError::InvalidUrl {
            url: url.to_owned(),
            source: Box::new(err),
        })?;
        let future = self.stream_into(parsed, sink);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}
