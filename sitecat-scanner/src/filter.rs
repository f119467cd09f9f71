use serde::{Deserialize, Serialize};

/// Marker / include / must-include / exclude rules for candidate product URLs.
///
/// Every rule is optional; an unset rule always passes. With no rules at all
/// the filter keeps every URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFilter {
    marker: Option<String>,
    include: Vec<String>,
    must_include: Vec<String>,
    exclude: Vec<String>,
}

impl UrlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-sensitive substring every candidate must contain, e.g. `/product/`.
    pub fn with_marker(mut self, marker: Option<String>) -> Self {
        self.marker = marker.filter(|m| !m.is_empty());
        self
    }

    /// Candidates must contain at least one of these (case-insensitive).
    pub fn with_include<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include = normalize_keywords(keywords);
        self
    }

    /// A second any-of group, required on top of the include group.
    pub fn with_must_include<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.must_include = normalize_keywords(keywords);
        self
    }

    /// Candidates must contain none of these (case-insensitive).
    pub fn with_exclude<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude = normalize_keywords(keywords);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.marker.is_none()
            && self.include.is_empty()
            && self.must_include.is_empty()
            && self.exclude.is_empty()
    }

    pub fn matches(&self, url: &str) -> bool {
        if let Some(ref marker) = self.marker
            && !url.contains(marker.as_str())
        {
            return false;
        }

        if self.include.is_empty() && self.must_include.is_empty() && self.exclude.is_empty() {
            return true;
        }

        let lowered = url.to_lowercase();
        let any_of = |keywords: &[String]| {
            keywords.is_empty() || keywords.iter().any(|k| lowered.contains(k.as_str()))
        };

        if !any_of(&self.include) || !any_of(&self.must_include) {
            return false;
        }

        !self.exclude.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Keep the URLs that pass every rule, in input order.
    pub fn filter<I>(&self, urls: I) -> impl Iterator<Item = I::Item>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        urls.into_iter().filter(move |url| self.matches(url.as_ref()))
    }
}

fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Split a comma-separated keyword list, dropping blanks.
pub fn parse_keyword_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
