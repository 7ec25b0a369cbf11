//! HTTP client wrapper for image fetches.
//!
//! One client is built per run from a [`FetchConfig`]. It sends a fixed,
//! conservative header set and keeps no idle connections around between
//! requests. Redirects are bounded, and a hop to a local address is refused
//! under the same rule [`validate_url`](crate::validate_url) applies to the
//! requested URL.

use std::time::Duration;

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderName, HeaderValue,
};
use reqwest::{Client, Response, redirect};
use thiserror::Error;
use tracing::{debug, instrument};

use super::error::FetchError;
use super::outcome::RejectReason;
use crate::config::FetchConfig;
use crate::user_agent;
use crate::validate::is_local_url;

/// Raised by the redirect policy when a hop targets a local address.
#[derive(Debug, Error)]
#[error("redirect to local address refused: {target}")]
struct LocalRedirect {
    target: String,
}

/// HTTP client used by the fetch pipeline.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    probe_timeout: Duration,
}

impl HttpClient {
    /// Builds a client from the timeouts and redirect limit in `config`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend or resolver
    /// cannot be initialized.
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .redirect(redirect_policy(config))
            .pool_max_idle_per_host(0)
            .gzip(true)
            .user_agent(user_agent::default_fetch_user_agent())
            .default_headers(default_headers())
            .build()?;
        Ok(Self {
            client,
            probe_timeout: config.probe_timeout,
        })
    }

    /// Sends a HEAD request and returns its headers when it succeeds with 2xx.
    ///
    /// Any failure is swallowed: the probe is an optimization and the GET
    /// response is validated regardless.
    #[instrument(level = "debug", skip(self))]
    pub async fn probe(&self, url: &str) -> Option<HeaderMap> {
        match self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => Some(response.headers().clone()),
            Ok(response) => {
                debug!(status = response.status().as_u16(), "HEAD probe not successful; skipping");
                None
            }
            Err(error) => {
                debug!(%error, "HEAD probe failed; validating on GET instead");
                None
            }
        }
    }

    /// Sends the GET request, mapping transport errors and non-2xx statuses.
    ///
    /// A redirect to a local address is a rejection, not a failure.
    ///
    /// # Errors
    ///
    /// Returns `Timeout`, `TooManyRedirects`, `Connection` or `HttpStatus`.
    pub async fn get(&self, url: &str) -> Result<Result<Response, RejectReason>, FetchError> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(error) if is_local_redirect(&error) => {
                debug!(%error, "redirect target refused");
                return Ok(Err(RejectReason::LocalAddress));
            }
            Err(error) => return Err(FetchError::from_transport(url, error)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }
        if response.url().as_str() != url {
            debug!(final_url = %response.url(), "followed redirect");
        }
        Ok(Ok(response))
    }
}

/// Follows up to `max_redirects` hops, refusing local targets unless the
/// config allows them.
fn redirect_policy(config: &FetchConfig) -> redirect::Policy {
    let max_redirects = config.max_redirects;
    let allow_local_addresses = config.allow_local_addresses;
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.error("too many redirects")
        } else if !allow_local_addresses && is_local_url(attempt.url()) {
            let target = attempt.url().to_string();
            attempt.error(LocalRedirect { target })
        } else {
            attempt.follow()
        }
    })
}

fn is_local_redirect(error: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        if inner.is::<LocalRedirect>() {
            return true;
        }
        source = inner.source();
    }
    false
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("image/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers
}
