pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod filter;
pub mod phrases;
pub mod price;
pub mod result;
pub mod sitemap;

pub use error::ScanError;
pub use extractor::ProductExtractor;
pub use fetcher::{PageFetcher, build_client};
pub use filter::UrlFilter;
pub use phrases::StockPhrases;
pub use result::{FetchResult, ProductRecord};
pub use sitemap::{SitemapNode, SitemapResolver, SitemapWalk};
