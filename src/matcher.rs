//! Description matching against a set of search terms.
use crate::github::RepositoryRecord;
use crate::scan::ConfigurationError;

/// Non-empty, ordered set of search terms, case-folded once up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    original: Vec<String>,
    folded: Vec<String>,
}

impl SearchTerms {
    /// Keeps each term exactly as given and drops later duplicates (compared
    /// case-insensitively). Fails on an empty list or an empty term.
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self, ConfigurationError> {
        if terms.is_empty() {
            return Err(ConfigurationError::NoSearchTerms);
        }
        let mut original = Vec::with_capacity(terms.len());
        let mut folded: Vec<String> = Vec::with_capacity(terms.len());
        for (index, term) in terms.iter().enumerate() {
            let term = term.as_ref();
            if term.is_empty() {
                return Err(ConfigurationError::EmptySearchTerm { index });
            }
            let lower = term.to_lowercase();
            if folded.contains(&lower) {
                continue;
            }
            original.push(term.to_string());
            folded.push(lower);
        }
        Ok(Self { original, folded })
    }

    /// Terms as given (deduplicated), in order.
    pub fn as_slice(&self) -> &[String] {
        &self.original
    }

    /// True if any term occurs in `text`, ignoring case.
    pub fn any_in(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let haystack = text.to_lowercase();
        self.folded.iter().any(|term| haystack.contains(term.as_str()))
    }
}

/// Whether the record's description contains any of the terms.
pub fn matches(record: &RepositoryRecord, terms: &SearchTerms) -> bool {
    terms.any_in(record.description.as_deref().unwrap_or_default())
}
