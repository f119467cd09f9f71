// Catalog aggregation: stock filtering and URL deduplication

use serde::{Deserialize, Serialize};
use sitecat_scanner::ProductRecord;
use std::collections::HashSet;
use tracing::debug;

/// Final, ordered set of rows. URLs are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    records: Vec<ProductRecord>,
}

impl Catalog {
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }
}

/// Collects records one at a time in discovery order.
#[derive(Debug, Default)]
pub struct CatalogAggregator {
    keep_only_in_stock: bool,
    seen: HashSet<String>,
    records: Vec<ProductRecord>,
    dropped_out_of_stock: usize,
    dropped_duplicates: usize,
}

impl CatalogAggregator {
    pub fn new(keep_only_in_stock: bool) -> Self {
        Self {
            keep_only_in_stock,
            ..Self::default()
        }
    }

    /// Returns whether the record was kept.
    ///
    /// Only an explicit `in_stock == Some(false)` is dropped; unknown stock
    /// status is kept.
    pub fn push(&mut self, record: ProductRecord) -> bool {
        if self.keep_only_in_stock && record.in_stock == Some(false) {
            debug!("Dropping out-of-stock {}", record.url);
            self.dropped_out_of_stock += 1;
            return false;
        }

        if !self.seen.insert(record.url.clone()) {
            debug!("Dropping duplicate {}", record.url);
            self.dropped_duplicates += 1;
            return false;
        }

        self.records.push(record);
        true
    }

    pub fn dropped_out_of_stock(&self) -> usize {
        self.dropped_out_of_stock
    }

    pub fn dropped_duplicates(&self) -> usize {
        self.dropped_duplicates
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> Catalog {
        Catalog {
            records: self.records,
        }
    }
}

/// Filter and deduplicate a batch of records into a catalog.
pub fn aggregate<I>(records: I, keep_only_in_stock: bool) -> Catalog
where
    I: IntoIterator<Item = ProductRecord>,
{
    let mut aggregator = CatalogAggregator::new(keep_only_in_stock);
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}
