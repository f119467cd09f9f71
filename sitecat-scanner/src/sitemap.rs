//! Sitemap resolution.
//!
//! Expands a sitemap (or sitemap index) into a flat, deduplicated, lazy
//! sequence of page URLs. Child sitemaps are walked depth-first in document
//! order. Broken branches are skipped with a warning; only the root sitemap
//! is allowed to fail the walk.

use crate::error::{Result, ScanError};
use crate::fetcher::fetch_text;
use futures::Stream;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_MAX_SITEMAPS: usize = 500;
pub const DEFAULT_MAX_URLS: usize = 500_000;

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapNode {
    /// `<sitemapindex>`: URLs of child sitemaps.
    Index(Vec<String>),
    /// `<urlset>`: URLs of pages.
    UrlSet(Vec<String>),
}

impl SitemapNode {
    /// Parse a sitemap document. Only `<loc>` elements directly under
    /// `<sitemap>` or `<url>` entries are collected, so extension tags such as
    /// `<image:loc>` are ignored.
    pub fn parse(xml: &str) -> std::result::Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut root: Option<String> = None;
        let mut stack: Vec<String> = Vec::new();
        let mut locs = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    if root.is_none() {
                        root = Some(name.clone());
                    }
                    stack.push(name);
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(ref e)) => {
                    if is_entry_loc(&stack) {
                        let text = e.unescape().map_err(|e| e.to_string())?;
                        push_loc(&mut locs, &text);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if is_entry_loc(&stack) {
                        push_loc(&mut locs, &String::from_utf8_lossy(e));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(format!(
                        "malformed XML at byte {}: {}",
                        reader.error_position(),
                        e
                    ));
                }
                _ => {}
            }
        }

        match root.as_deref() {
            Some("sitemapindex") => Ok(SitemapNode::Index(locs)),
            Some("urlset") => Ok(SitemapNode::UrlSet(locs)),
            Some(other) => Err(format!("unexpected root element <{}>", other)),
            None => Err("document has no root element".to_string()),
        }
    }
}

fn is_entry_loc(stack: &[String]) -> bool {
    match stack {
        [.., parent, last] => {
            last == "loc" && (parent == "url" || parent == "sitemap")
        }
        _ => false,
    }
}

fn push_loc(locs: &mut Vec<String>, raw: &str) {
    let loc = raw.trim();
    if !loc.is_empty() {
        locs.push(loc.to_string());
    }
}

/// Key used for the visited set. Falls back to the trimmed text when the URL
/// does not parse.
pub fn normalize_sitemap_url(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Counters collected while walking a sitemap tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub sitemaps_fetched: usize,
    pub sitemaps_failed: usize,
    pub sitemaps_skipped: usize,
    pub leaves_yielded: usize,
    pub duplicate_leaves: usize,
}

pub struct SitemapResolver {
    client: Client,
    max_sitemaps: usize,
    max_urls: usize,
}

impl SitemapResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_sitemaps: DEFAULT_MAX_SITEMAPS,
            max_urls: DEFAULT_MAX_URLS,
        }
    }

    pub fn with_max_sitemaps(mut self, max_sitemaps: usize) -> Self {
        self.max_sitemaps = max_sitemaps;
        self
    }

    pub fn with_max_urls(mut self, max_urls: usize) -> Self {
        self.max_urls = max_urls;
        self
    }

    /// Fetch and parse the root sitemap, returning a walk over its leaves.
    ///
    /// A root that cannot be fetched or parsed is an error; every other
    /// sitemap failure is logged and skipped during the walk.
    pub async fn resolve(&self, root_url: &str) -> Result<SitemapWalk<'_>> {
        Url::parse(root_url.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", root_url, e)))?;

        info!("Resolving sitemap tree from {}", root_url);

        let mut walk = SitemapWalk {
            resolver: self,
            pending_sitemaps: Vec::new(),
            pending_leaves: VecDeque::new(),
            visited: HashSet::new(),
            seen_leaves: HashSet::new(),
            stats: ResolveStats::default(),
            cap_reported: false,
        };

        walk.visited.insert(normalize_sitemap_url(root_url));
        let node = self.load(root_url).await?;
        walk.stats.sitemaps_fetched += 1;
        walk.absorb(node);

        Ok(walk)
    }

    async fn load(&self, url: &str) -> Result<SitemapNode> {
        let xml = fetch_text(&self.client, url).await?;
        SitemapNode::parse(&xml).map_err(|reason| ScanError::SitemapParse {
            url: url.to_string(),
            reason,
        })
    }
}

/// Depth-first walk over a sitemap tree. Finite and not restartable.
pub struct SitemapWalk<'a> {
    resolver: &'a SitemapResolver,
    // Stack of child sitemaps, top is the next one to visit.
    pending_sitemaps: Vec<String>,
    pending_leaves: VecDeque<String>,
    visited: HashSet<String>,
    seen_leaves: HashSet<String>,
    stats: ResolveStats,
    cap_reported: bool,
}

impl<'a> SitemapWalk<'a> {
    fn absorb(&mut self, node: SitemapNode) {
        match node {
            SitemapNode::Index(children) => {
                debug!("Sitemap index with {} children", children.len());
                // Reverse so the first child is visited first.
                self.pending_sitemaps.extend(children.into_iter().rev());
            }
            SitemapNode::UrlSet(urls) => {
                debug!("URL set with {} entries", urls.len());
                self.pending_leaves.extend(urls);
            }
        }
    }

    /// Next unseen leaf URL, or `None` once the tree is exhausted or a cap is hit.
    pub async fn next_leaf(&mut self) -> Option<String> {
        loop {
            if self.stats.leaves_yielded >= self.resolver.max_urls {
                self.report_cap(format!("max_urls={}", self.resolver.max_urls));
                return None;
            }

            if let Some(url) = self.pending_leaves.pop_front() {
                if self.seen_leaves.insert(url.clone()) {
                    self.stats.leaves_yielded += 1;
                    return Some(url);
                }
                self.stats.duplicate_leaves += 1;
                continue;
            }

            let sitemap_url = self.pending_sitemaps.pop()?;
            let key = normalize_sitemap_url(&sitemap_url);
            if self.visited.contains(&key) {
                debug!("Skipping already visited sitemap {}", sitemap_url);
                continue;
            }

            if self.visited.len() >= self.resolver.max_sitemaps {
                self.pending_sitemaps.push(sitemap_url);
                self.report_cap(format!("max_sitemaps={}", self.resolver.max_sitemaps));
                self.pending_sitemaps.clear();
                continue;
            }
            self.visited.insert(key);

            match self.resolver.load(&sitemap_url).await {
                Ok(node) => {
                    self.stats.sitemaps_fetched += 1;
                    self.absorb(node);
                }
                Err(e) => {
                    self.stats.sitemaps_failed += 1;
                    warn!("Skipping sitemap {}: {}", sitemap_url, e);
                }
            }
        }
    }

    fn report_cap(&mut self, cap: String) {
        if !self.cap_reported {
            warn!("Reached {}, stopping sitemap resolution", cap);
            self.cap_reported = true;
            self.stats.sitemaps_skipped = self.pending_sitemaps.len();
        }
    }

    pub fn stats(&self) -> &ResolveStats {
        &self.stats
    }

    /// Borrow the walk as a stream of leaf URLs.
    pub fn leaves(&mut self) -> impl Stream<Item = String> + '_ {
        futures::stream::unfold(self, |walk| async move {
            walk.next_leaf().await.map(|url| (url, walk))
        })
    }
}
