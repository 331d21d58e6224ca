//! Client-side payload filter
//!
//! The broker already narrows delivery to the consumer's subjects; this filter
//! runs afterwards on each payload.
//!
//! - Empty query matches everything
//! - Otherwise the query must appear as a contiguous, case-sensitive byte
//!   sequence in the payload
//!
//! # Example
//!
//! ```
//! use jstail_drain::QueryFilter;
//!
//! let filter = QueryFilter::new("order-42");
//! assert!(filter.matches(br#"{"id":"order-42","total":10}"#));
//! assert!(!filter.matches(br#"{"id":"order-43"}"#));
//! ```

/// Substring filter over message payloads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Needle bytes (None = match all)
    query: Option<Vec<u8>>,
}

impl QueryFilter {
    /// Create a filter; an empty query matches everything
    pub fn new(query: &str) -> Self {
        if query.is_empty() {
            return Self::default();
        }
        Self {
            query: Some(query.as_bytes().to_vec()),
        }
    }

    /// Check if filter matches everything
    pub fn is_empty(&self) -> bool {
        self.query.is_none()
    }

    /// Check if a payload passes the filter
    #[inline]
    pub fn matches(&self, payload: &[u8]) -> bool {
        match &self.query {
            None => true,
            Some(needle) => contains(payload, needle),
        }
    }
}

/// Stateless form of [`QueryFilter::matches`]
pub fn matches(payload: &[u8], query: &str) -> bool {
    query.is_empty() || contains(payload, query.as_bytes())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
