use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single page fetch. At most one of `html` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    pub html: Option<String>,
    pub error: Option<String>,
}

impl FetchResult {
    pub fn with_html(url: String, status_code: u16, response_time: Duration, html: String) -> Self {
        Self {
            url,
            status_code: Some(status_code),
            response_time,
            html: Some(html),
            error: None,
        }
    }

    pub fn with_error(url: String, status_code: Option<u16>, error: String) -> Self {
        Self {
            url,
            status_code,
            response_time: Duration::from_secs(0),
            html: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.html.is_some()
    }
}

/// One extracted catalog row. Absent fields mean the heuristics found nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub in_stock: Option<bool>,
    pub url: String,
}

impl ProductRecord {
    pub fn new(url: String) -> Self {
        Self {
            title: None,
            price: None,
            currency: None,
            in_stock: None,
            url,
        }
    }
}
