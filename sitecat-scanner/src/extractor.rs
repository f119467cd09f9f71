//! Product field extraction.
//!
//! Each field is filled by an ordered list of strategies. A strategy is a pure
//! function over the parsed page; the first one that yields a value wins, and
//! later strategies are only consulted for fields that are still empty.
//! Structured markup (JSON-LD, microdata) comes first, Open Graph meta tags
//! next, and a scan of the visible text last.

use crate::phrases::StockPhrases;
use crate::price::{PriceQuote, normalize_price, scan_text_price};
use crate::result::{FetchResult, ProductRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static OG_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static JSON_LD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static ITEMPROP_PRICE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="price"]"#).unwrap());
static ITEMPROP_CURRENCY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="priceCurrency"]"#).unwrap());
static OG_AMOUNT_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="product:price:amount"], meta[property="og:price:amount"]"#)
        .unwrap()
});
static OG_CURRENCY_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"meta[property="product:price:currency"], meta[property="og:price:currency"]"#,
    )
    .unwrap()
});

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// A page parsed once and shared by every strategy.
pub struct ProductPage {
    document: Html,
    text: String,
    lowered_text: String,
}

impl ProductPage {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let text = visible_text(&document);
        let lowered_text = text.to_lowercase();
        Self {
            document,
            text,
            lowered_text,
        }
    }

    /// Visible text with whitespace collapsed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lowered_text(&self) -> &str {
        &self.lowered_text
    }
}

/// A named extraction layer for one field.
pub struct Strategy<T> {
    pub name: &'static str,
    pub run: fn(&ProductPage) -> Option<T>,
}

pub const TITLE_STRATEGIES: &[Strategy<String>] = &[
    Strategy {
        name: "title-tag",
        run: title_tag,
    },
    Strategy {
        name: "first-h1",
        run: first_h1,
    },
    Strategy {
        name: "og-title",
        run: og_title,
    },
];

pub const PRICE_STRATEGIES: &[Strategy<PriceQuote>] = &[
    Strategy {
        name: "json-ld",
        run: json_ld_offer,
    },
    Strategy {
        name: "microdata",
        run: microdata_offer,
    },
    Strategy {
        name: "open-graph",
        run: open_graph_offer,
    },
    Strategy {
        name: "visible-text",
        run: visible_text_offer,
    },
];

/// First value produced by the strategies, in order.
pub fn first_match<T>(strategies: &[Strategy<T>], page: &ProductPage) -> Option<T> {
    strategies.iter().find_map(|strategy| {
        let value = (strategy.run)(page);
        if value.is_some() {
            debug!("Strategy {} produced a value", strategy.name);
        }
        value
    })
}

#[derive(Debug, Clone, Default)]
pub struct ProductExtractor {
    phrases: StockPhrases,
    currency_override: Option<String>,
}

impl ProductExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phrases(mut self, phrases: StockPhrases) -> Self {
        self.phrases = phrases;
        self
    }

    /// Use this currency for every record instead of extracting one.
    pub fn with_currency_override(mut self, currency: Option<String>) -> Self {
        self.currency_override = currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
        self
    }

    /// `None` only when the page was never fetched.
    pub fn extract(&self, result: &FetchResult) -> Option<ProductRecord> {
        let html = result.html.as_deref()?;
        Some(self.extract_html(&result.url, html))
    }

    pub fn extract_html(&self, url: &str, html: &str) -> ProductRecord {
        let page = ProductPage::parse(html);
        let mut record = ProductRecord::new(url.to_string());

        record.title = first_match(TITLE_STRATEGIES, &page);

        record.currency = self.currency_override.clone();
        for strategy in PRICE_STRATEGIES {
            if record.price.is_some() && record.currency.is_some() {
                break;
            }
            let Some(quote) = (strategy.run)(&page) else {
                continue;
            };
            if record.price.is_none() && quote.amount.is_some() {
                debug!("Price for {} from {}", url, strategy.name);
                record.price = quote.amount;
            }
            if record.currency.is_none() && quote.currency.is_some() {
                debug!("Currency for {} from {}", url, strategy.name);
                record.currency = quote.currency;
            }
        }

        record.in_stock = self.phrases.classify(page.lowered_text());

        record
    }
}

fn clean_text(s: &str) -> String {
    WHITESPACE_RE.replace_all(s.trim(), " ").to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn visible_text(document: &Html) -> String {
    let mut parts = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    clean_text(&parts.join(" "))
}

fn title_tag(page: &ProductPage) -> Option<String> {
    let element = page.document.select(&TITLE_SEL).next()?;
    non_empty(element_text(element))
}

fn first_h1(page: &ProductPage) -> Option<String> {
    let element = page.document.select(&H1_SEL).next()?;
    non_empty(element_text(element))
}

fn og_title(page: &ProductPage) -> Option<String> {
    page.document
        .select(&OG_TITLE_SEL)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .find(|s| !s.is_empty())
}

fn json_ld_offer(page: &ProductPage) -> Option<PriceQuote> {
    page.document
        .select(&JSON_LD_SEL)
        .filter_map(|script| {
            let raw = script.text().collect::<String>();
            serde_json::from_str::<Value>(raw.trim()).ok()
        })
        .find_map(|value| find_product_offer(&value))
}

/// Walk a JSON-LD value looking for a Product (via its offers) or an Offer.
/// Descends through `@graph`, `mainEntity` and `itemOffered`.
fn find_product_offer(value: &Value) -> Option<PriceQuote> {
    match value {
        Value::Array(items) => items.iter().find_map(find_product_offer),
        Value::Object(map) => {
            let kind = map.get("@type");
            if has_type(kind, "Product")
                && let Some(offers) = map.get("offers")
                && let Some(quote) = offer_quote(offers)
            {
                return Some(quote);
            }
            if (has_type(kind, "Offer") || has_type(kind, "AggregateOffer"))
                && let Some(quote) = offer_quote(value)
            {
                return Some(quote);
            }
            ["@graph", "mainEntity", "itemOffered"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(find_product_offer)
        }
        _ => None,
    }
}

fn has_type(kind: Option<&Value>, wanted: &str) -> bool {
    let matches = |s: &str| {
        s.eq_ignore_ascii_case(wanted)
            || s.rsplit('/').next().is_some_and(|t| t.eq_ignore_ascii_case(wanted))
    };
    match kind {
        Some(Value::String(s)) => matches(s.as_str()),
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn offer_quote(offer: &Value) -> Option<PriceQuote> {
    match offer {
        Value::Array(offers) => offers.iter().find_map(offer_quote),
        Value::Object(map) => {
            let amount = ["price", "lowPrice"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(json_price)
                .or_else(|| map.get("priceSpecification").and_then(offer_price_only));
            let currency = map
                .get("priceCurrency")
                .or_else(|| {
                    map.get("priceSpecification")
                        .and_then(|price_spec| price_spec.get("priceCurrency"))
                })
                .and_then(Value::as_str)
                .map(clean_text)
                .and_then(non_empty);
            let quote = PriceQuote { amount, currency };
            if quote.is_empty() { None } else { Some(quote) }
        }
        _ => None,
    }
}

fn offer_price_only(price_spec: &Value) -> Option<f64> {
    match price_spec {
        Value::Array(price_specs) => price_specs.iter().find_map(offer_price_only),
        Value::Object(map) => map.get("price").and_then(json_price),
        _ => None,
    }
}

fn json_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => normalize_price(s),
        _ => None,
    }
}

/// `content` attribute first, element text otherwise.
fn microdata_value(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("content")
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .or_else(|| non_empty(element_text(element)))
}

fn microdata_offer(page: &ProductPage) -> Option<PriceQuote> {
    let amount = page
        .document
        .select(&ITEMPROP_PRICE_SEL)
        .filter_map(microdata_value)
        .find_map(|raw| normalize_price(&raw));
    let currency = page
        .document
        .select(&ITEMPROP_CURRENCY_SEL)
        .find_map(microdata_value);
    let quote = PriceQuote { amount, currency };
    if quote.is_empty() { None } else { Some(quote) }
}

fn open_graph_offer(page: &ProductPage) -> Option<PriceQuote> {
    let amount = page
        .document
        .select(&OG_AMOUNT_SEL)
        .filter_map(|el| el.value().attr("content"))
        .find_map(normalize_price);
    let currency = page
        .document
        .select(&OG_CURRENCY_SEL)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .find(|s| !s.is_empty());
    let quote = PriceQuote { amount, currency };
    if quote.is_empty() { None } else { Some(quote) }
}

fn visible_text_offer(page: &ProductPage) -> Option<PriceQuote> {
    scan_text_price(page.text())
}
