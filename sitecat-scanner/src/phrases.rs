use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Locale -> phrase -> signal. `false` marks an out-of-stock phrase, `true` an
/// in-stock phrase.
pub type PhraseTable = BTreeMap<String, BTreeMap<String, bool>>;

const DEFAULT_PHRASES: &[(&str, &str, bool)] = &[
    ("en", "out of stock", false),
    ("en", "sold out", false),
    ("en", "not in stock", false),
    ("en", "currently unavailable", false),
    ("en", "temporarily unavailable", false),
    ("en", "in stock", true),
    ("en", "available", true),
    ("en", "add to cart", true),
    ("en", "add to basket", true),
    ("nl", "niet op voorraad", false),
    ("nl", "niet meer op voorraad", false),
    ("nl", "uitverkocht", false),
    ("nl", "niet leverbaar", false),
    ("nl", "op voorraad", true),
];

/// Phrase sets used to classify stock status from lower-cased page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPhrases {
    out_of_stock: Vec<String>,
    in_stock: Vec<String>,
}

impl StockPhrases {
    pub fn from_table(table: &PhraseTable) -> Self {
        let mut out_of_stock = Vec::new();
        let mut in_stock = Vec::new();

        for phrases in table.values() {
            for (phrase, signal) in phrases {
                let phrase = phrase.trim().to_lowercase();
                if phrase.is_empty() {
                    continue;
                }
                let target = if *signal { &mut in_stock } else { &mut out_of_stock };
                if !target.contains(&phrase) {
                    target.push(phrase);
                }
            }
        }

        Self {
            out_of_stock,
            in_stock,
        }
    }

    /// Load a JSON phrase table, e.g. `{"en": {"sold out": false, "in stock": true}}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| ScanError::ParseError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let table: PhraseTable = serde_json::from_str(json)?;
        Ok(Self::from_table(&table))
    }

    pub fn default_table() -> PhraseTable {
        let mut table = PhraseTable::new();
        for (locale, phrase, signal) in DEFAULT_PHRASES {
            table
                .entry(locale.to_string())
                .or_default()
                .insert(phrase.to_string(), *signal);
        }
        table
    }

    pub fn out_of_stock(&self) -> &[String] {
        &self.out_of_stock
    }

    pub fn in_stock(&self) -> &[String] {
        &self.in_stock
    }

    /// Out-of-stock phrases win over in-stock phrases; no match means unknown.
    pub fn classify(&self, lowered_text: &str) -> Option<bool> {
        if self.out_of_stock.iter().any(|p| lowered_text.contains(p.as_str())) {
            return Some(false);
        }
        if self.in_stock.iter().any(|p| lowered_text.contains(p.as_str())) {
            return Some(true);
        }
        None
    }
}

impl Default for StockPhrases {
    fn default() -> Self {
        Self::from_table(&Self::default_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_out_of_stock_wins() {
        let phrases = StockPhrases::default();
        assert_eq!(
            phrases.classify("sold out <button disabled>add to cart</button>"),
            Some(false)
        );
    }

    #[test]
    fn test_in_stock_and_unknown() {
        let phrases = StockPhrases::default();
        assert_eq!(phrases.classify("nog 3 stuks op voorraad"), Some(true));
        assert_eq!(phrases.classify("a fine hammer"), None);
    }

    #[test]
    fn test_default_table_has_both_locales() {
        let table = StockPhrases::default_table();
        assert!(table.contains_key("en"));
        assert_eq!(table["nl"].get("uitverkocht"), Some(&false));
    }

    #[test]
    fn test_from_json_lowercases() {
        let phrases =
            StockPhrases::from_json(r#"{"de": {"Ausverkauft": false, "Auf Lager": true}}"#).unwrap();
        assert_eq!(phrases.out_of_stock(), ["ausverkauft".to_string()]);
        assert_eq!(phrases.in_stock(), ["auf lager".to_string()]);
        assert_eq!(phrases.classify("derzeit ausverkauft"), Some(false));
        // The user table replaces the defaults.
        assert_eq!(phrases.classify("sold out"), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"en": {{"backorder": false}}}}"#).unwrap();

        let phrases = StockPhrases::load(file.path()).unwrap();
        assert_eq!(phrases.classify("on backorder"), Some(false));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();

        let result = StockPhrases::load(file.path());
        assert!(matches!(result, Err(ScanError::ParseError(_))));
    }
}
