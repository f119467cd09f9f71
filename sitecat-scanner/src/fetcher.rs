use crate::error::{Result, ScanError};
use crate::result::FetchResult;
use futures::{Stream, StreamExt};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build the HTTP client shared by sitemap resolution and page fetching.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!(
            "Mozilla/5.0 (compatible; sitecat/",
            env!("CARGO_PKG_VERSION"),
            ")"
        ))
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// GET a document and return its body, treating any non-2xx status as an error.
pub(crate) async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScanError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

/// Sequential page fetcher with an inter-request delay and an optional page cap.
pub struct PageFetcher {
    client: Client,
    delay: Duration,
    max_pages: Option<usize>,
}

impl PageFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            delay: Duration::ZERO,
            max_pages: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch candidates strictly in order, one at a time.
    ///
    /// The delay is awaited before every fetch except the first. Failed pages
    /// still produce a `FetchResult` and count toward `max_pages`.
    pub fn fetch<'a, S>(&'a self, candidates: S) -> impl Stream<Item = FetchResult> + 'a
    where
        S: Stream<Item = String> + 'a,
    {
        let limit = self.max_pages.unwrap_or(usize::MAX);
        candidates
            .take(limit)
            .enumerate()
            .then(move |(index, url)| async move {
                if index > 0 && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.fetch_one(url).await
            })
    }

    /// Single attempt, no retry.
    pub async fn fetch_one(&self, url: String) -> FetchResult {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                return FetchResult::with_error(url, None, e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Fetch failed for {}: HTTP {}", url, status.as_u16());
            return FetchResult::with_error(
                url,
                Some(status.as_u16()),
                format!("HTTP status {}", status.as_u16()),
            );
        }

        match response.text().await {
            Ok(body) => FetchResult::with_html(url, status.as_u16(), start.elapsed(), body),
            Err(e) => {
                warn!("Reading body failed for {}: {}", url, e);
                FetchResult::with_error(url, Some(status.as_u16()), e.to_string())
            }
        }
    }
}
