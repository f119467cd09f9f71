use crate::catalog::{Catalog, CatalogAggregator};
use crate::error::{ExportError, Result};
use crate::sink::ExportFormat;
use futures::{StreamExt, future};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sitecat_scanner::fetcher::DEFAULT_TIMEOUT_SECS;
use sitecat_scanner::sitemap::{DEFAULT_MAX_SITEMAPS, DEFAULT_MAX_URLS};
use sitecat_scanner::{
    PageFetcher, ProductExtractor, SitemapResolver, StockPhrases, UrlFilter, build_client,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::info;
use url::Url;

pub const DEFAULT_DELAY_SECS: f64 = 0.2;

/// Options for configuring an export run
#[derive(Debug)]
pub struct ExportOptions {
    pub sitemap_url: String,
    pub filter: UrlFilter,
    pub keep_only_in_stock: bool,
    pub delay: Duration,
    /// `None` processes every candidate.
    pub max_pages: Option<usize>,
    pub phrases: StockPhrases,
    pub currency_override: Option<String>,
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    pub timeout_secs: u64,
    pub max_sitemaps: usize,
    pub max_urls: usize,
    pub show_progress_bars: bool,
}

impl ExportOptions {
    pub fn new(sitemap_url: impl Into<String>) -> Self {
        Self {
            sitemap_url: sitemap_url.into(),
            filter: UrlFilter::default(),
            keep_only_in_stock: true,
            delay: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            max_pages: None,
            phrases: StockPhrases::default(),
            currency_override: None,
            output_dir: PathBuf::from("."),
            format: ExportFormat::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_sitemaps: DEFAULT_MAX_SITEMAPS,
            max_urls: DEFAULT_MAX_URLS,
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting export progress
pub type ExportProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Counters for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub sitemap_url: String,
    pub sitemaps_fetched: usize,
    pub sitemaps_failed: usize,
    pub sitemaps_skipped: usize,
    pub leaf_urls: usize,
    pub duplicate_leaves: usize,
    pub candidates: usize,
    pub pages_fetched: usize,
    pub page_errors: usize,
    pub records_extracted: usize,
    pub dropped_out_of_stock: usize,
    pub dropped_duplicates: usize,
    pub rows_written: usize,
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
}

impl ExportSummary {
    pub fn has_candidates(&self) -> bool {
        self.candidates > 0
    }
}

/// `<domain>_catalog.<ext>`, with a leading `www.` dropped from the domain.
pub fn catalog_file_name(sitemap_url: &str, format: ExportFormat) -> String {
    let domain = Url::parse(sitemap_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .map(|h| h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
        .unwrap_or_else(|| "sitecat".to_string());
    format!("{}_catalog.{}", domain, format.extension())
}

fn spinner(show: bool) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Run the pipeline up to the catalog: resolve, filter, fetch, extract, aggregate.
///
/// Only a failing root sitemap (or an unusable HTTP client) is an error.
pub async fn collect_catalog(
    options: &ExportOptions,
    progress_callback: Option<&ExportProgressCallback>,
) -> Result<(Catalog, ExportSummary)> {
    let started = Instant::now();
    let client = build_client(options.timeout_secs)?;

    let progress_bar = spinner(options.show_progress_bars);
    if let Some(ref pb) = progress_bar {
        pb.set_message(format!("Resolving {}", options.sitemap_url));
    }

    let resolver = SitemapResolver::new(client.clone())
        .with_max_sitemaps(options.max_sitemaps)
        .with_max_urls(options.max_urls);
    let mut walk = match resolver.resolve(&options.sitemap_url).await {
        Ok(walk) => walk,
        Err(e) => {
            if let Some(ref pb) = progress_bar {
                pb.finish_and_clear();
            }
            return Err(e.into());
        }
    };
    if let Some(cb) = progress_callback {
        cb(format!("Resolved root sitemap {}", options.sitemap_url));
    }

    let fetcher = PageFetcher::new(client)
        .with_delay(options.delay)
        .with_max_pages(options.max_pages);
    let extractor = ProductExtractor::new()
        .with_phrases(options.phrases.clone())
        .with_currency_override(options.currency_override.clone());
    let mut aggregator = CatalogAggregator::new(options.keep_only_in_stock);

    let candidates = AtomicUsize::new(0);
    let mut pages_fetched = 0;
    let mut page_errors = 0;
    let mut records_extracted = 0;

    {
        let filter = &options.filter;
        let candidate_stream = walk
            .leaves()
            .filter(|url| future::ready(filter.matches(url)))
            .inspect(|_| {
                candidates.fetch_add(1, Ordering::Relaxed);
            });
        let mut results = std::pin::pin!(fetcher.fetch(candidate_stream));

        while let Some(result) = results.next().await {
            pages_fetched += 1;
            match extractor.extract(&result) {
                Some(record) => {
                    records_extracted += 1;
                    aggregator.push(record);
                }
                None => page_errors += 1,
            }

            if let Some(ref pb) = progress_bar {
                pb.set_message(format!(
                    "Fetching pages... {} fetched, {} errors, {} rows",
                    pages_fetched,
                    page_errors,
                    aggregator.len()
                ));
            }
        }
    }

    let stats = walk.stats().clone();
    let summary = ExportSummary {
        sitemap_url: options.sitemap_url.clone(),
        sitemaps_fetched: stats.sitemaps_fetched,
        sitemaps_failed: stats.sitemaps_failed,
        sitemaps_skipped: stats.sitemaps_skipped,
        leaf_urls: stats.leaves_yielded,
        duplicate_leaves: stats.duplicate_leaves,
        candidates: candidates.load(Ordering::Relaxed),
        pages_fetched,
        page_errors,
        records_extracted,
        dropped_out_of_stock: aggregator.dropped_out_of_stock(),
        dropped_duplicates: aggregator.dropped_duplicates(),
        rows_written: 0,
        output: None,
        elapsed: started.elapsed(),
    };

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Fetch complete! {} pages, {} rows",
            pages_fetched,
            aggregator.len()
        ));
    }
    info!(
        "Collected {} rows from {} candidates ({} leaf URLs)",
        aggregator.len(),
        summary.candidates,
        summary.leaf_urls
    );

    Ok((aggregator.finish(), summary))
}

/// Execute an export with the given options
///
/// When no URL survives filtering nothing is written and `output` stays `None`.
pub async fn execute_export(
    options: ExportOptions,
    progress_callback: Option<ExportProgressCallback>,
) -> Result<ExportSummary> {
    let (catalog, mut summary) = collect_catalog(&options, progress_callback.as_ref()).await?;

    if !summary.has_candidates() {
        info!("No candidate URLs matched the filters, nothing to write");
        return Ok(summary);
    }

    if options.output_dir.exists() && !options.output_dir.is_dir() {
        return Err(ExportError::Config(format!(
            "output path {} is not a directory",
            options.output_dir.display()
        ))
        .into());
    }
    fs::create_dir_all(&options.output_dir).map_err(ExportError::from)?;

    let path = options
        .output_dir
        .join(catalog_file_name(&options.sitemap_url, options.format));
    if let Some(ref cb) = progress_callback {
        cb(format!("Writing {} rows to {}", catalog.len(), path.display()));
    }

    options.format.sink().write(&catalog, &path)?;
    info!("Wrote {} rows to {}", catalog.len(), path.display());

    summary.rows_written = catalog.len();
    summary.output = Some(path);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_file_name_strips_www() {
        assert_eq!(
            catalog_file_name("https://www.shop.nl/sitemap.xml", ExportFormat::Xlsx),
            "shop.nl_catalog.xlsx"
        );
    }

    #[test]
    fn test_catalog_file_name_keeps_subdomains() {
        assert_eq!(
            catalog_file_name("https://store.example.com/sitemap_index.xml", ExportFormat::Csv),
            "store.example.com_catalog.csv"
        );
    }

    #[test]
    fn test_catalog_file_name_fallback() {
        assert_eq!(
            catalog_file_name("not a url", ExportFormat::Json),
            "sitecat_catalog.json"
        );
    }

    #[test]
    fn test_export_options_defaults() {
        let options = ExportOptions::new("https://shop.test/sitemap.xml");
        assert!(options.keep_only_in_stock);
        assert_eq!(options.delay.as_millis(), 200);
        assert_eq!(options.max_pages, None);
        assert_eq!(options.max_sitemaps, 500);
        assert_eq!(options.max_urls, 500_000);
        assert!(options.filter.is_empty());
    }
}
