use std::{io, time::Duration};

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Response};
use std::io::Write;

use crate::TransportError;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "hpms-national/0.1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies region archives by URL.
#[async_trait(?Send)]
pub trait RegionSource {
    /// Stream the archive at `url` into `sink`, returning the bytes written.
    async fn fetch_archive(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

/// HTTP implementation of [`RegionSource`].
#[derive(Debug)]
pub struct HttpRegionSource {
    client: Client,
    user_agent: String,
}

impl HttpRegionSource {
    /// Construct an HTTP-backed region source.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| TransportError::Client { source })?;
        Ok(Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        })
    }

    /// Override the default user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    async fn call(&self, url: &str) -> Result<Response, TransportError> {
        self.client
            .get(url)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url))
    }
}

#[async_trait(?Send)]
impl RegionSource for HttpRegionSource {
    async fn fetch_archive(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let mut response = self.call(url).await?;
        let mut written = 0_u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?
        {
            sink.write_all(&chunk)
                .map_err(|source| TransportError::Network {
                    url: url.to_owned(),
                    source,
                })?;
            written += chunk.len() as u64;
        }
        Ok(written)
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

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn builds_with_default_user_agent() {
        let source = HttpRegionSource::new().expect("client should build");
        assert_eq!(source.user_agent, DEFAULT_USER_AGENT);
        let custom = source.with_user_agent("analyst/1.0");
        assert_eq!(custom.user_agent, "analyst/1.0");
    }

    #[rstest]
    fn refused_connections_surface_as_network_errors() {
        let source = HttpRegionSource::new().expect("client should build");
        let mut sink = Vec::new();
        let err = crate::test_support::block_on_for_tests(
            source.fetch_archive("http://127.0.0.1:9/ohio2015.zip", &mut sink),
        )
        .expect_err("nothing listens on the discard port");
        match err {
            TransportError::Network { url, .. } => {
                assert_eq!(url, "http://127.0.0.1:9/ohio2015.zip");
            }
            other => panic!("expected network error, got {other:?}"),
        }
        assert!(sink.is_empty());
    }
}
