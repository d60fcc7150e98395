//! Scan orchestration: walks a target's listing page by page, evaluates each
//! repository description and collects per-target and batch results.
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::credentials::{Credentials, CredentialsProvider};
use crate::github::{FetchError, Page, RepoListing};
use crate::matcher::{self, SearchTerms};

/// A scan request that cannot be run. Rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConfigurationError {
    #[error("no search terms given")]
    NoSearchTerms,
    #[error("search term #{} is empty", .index + 1)]
    EmptySearchTerm { index: usize },
    #[error("target is empty")]
    EmptyTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub target: String,
    pub terms: Vec<String>,
    pub credentials: Credentials,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>, terms: Vec<String>, credentials: Credentials) -> Self {
        Self {
            target: target.into(),
            terms,
            credentials,
        }
    }

    fn validate(&self) -> Result<SearchTerms, ConfigurationError> {
        if self.target.trim().is_empty() {
            return Err(ConfigurationError::EmptyTarget);
        }
        SearchTerms::new(&self.terms)
    }
}

/// One event in a scan's transcript. `Display` renders the console/report line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TranscriptEntry {
    ScanStarted { target: String, terms: Vec<String> },
    Rejected { target: String, error: ConfigurationError },
    FetchFailed { error: FetchError },
    MatchesFound { count: usize },
    Matched { url: String },
    NoMatches,
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptEntry::ScanStarted { target, terms } => write!(
                f,
                "Scanning {}'s repositories for descriptions containing any of {:?}...",
                target, terms
            ),
            TranscriptEntry::Rejected { target, error } => {
                write!(f, "Rejected scan request for '{}': {}", target, error)
            }
            TranscriptEntry::FetchFailed { error } => write!(f, "Error: {}", error),
            TranscriptEntry::MatchesFound { .. } => {
                write!(f, "Found matches in the following repositories:")
            }
            TranscriptEntry::Matched { url } => write!(f, "- {}", url),
            TranscriptEntry::NoMatches => write!(f, "No repositories matched the search terms."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ScanStatus {
    Completed,
    FetchFailed(FetchError),
    Rejected(ConfigurationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub target: String,
    pub matched_urls: Vec<String>,
    pub transcript: Vec<TranscriptEntry>,
    pub status: ScanStatus,
    /// Page requests issued, including a failed one.
    pub pages_requested: u32,
    pub repositories_checked: usize,
}

impl ScanResult {
    fn started(target: &str, terms: &SearchTerms) -> Self {
        Self {
            target: target.to_string(),
            matched_urls: Vec::new(),
            transcript: vec![TranscriptEntry::ScanStarted {
                target: target.to_string(),
                terms: terms.as_slice().to_vec(),
            }],
            status: ScanStatus::Completed,
            pages_requested: 0,
            repositories_checked: 0,
        }
    }

    fn rejected(target: &str, error: ConfigurationError) -> Self {
        Self {
            target: target.to_string(),
            matched_urls: Vec::new(),
            transcript: vec![TranscriptEntry::Rejected {
                target: target.to_string(),
                error: error.clone(),
            }],
            status: ScanStatus::Rejected(error),
            pages_requested: 0,
            repositories_checked: 0,
        }
    }

    fn finish(mut self, status: ScanStatus) -> Self {
        if self.matched_urls.is_empty() {
            self.transcript.push(TranscriptEntry::NoMatches);
        } else {
            self.transcript.push(TranscriptEntry::MatchesFound {
                count: self.matched_urls.len(),
            });
            self.transcript.extend(
                self.matched_urls
                    .iter()
                    .map(|url| TranscriptEntry::Matched { url: url.clone() }),
            );
        }
        self.status = status;
        self
    }

    /// At least one matching repository, even if the scan later failed.
    pub fn is_affected(&self) -> bool {
        !self.matched_urls.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.status == ScanStatus::Completed
    }
}

/// Per-target results in input order plus the affected-target summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    results: Vec<ScanResult>,
    affected_count: usize,
    affected_targets: Vec<String>,
}

impl BatchReport {
    pub fn push(&mut self, result: ScanResult) {
        if result.is_affected() {
            self.affected_count += 1;
            self.affected_targets.push(result.target.clone());
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[ScanResult] {
        &self.results
    }

    pub fn affected_count(&self) -> usize {
        self.affected_count
    }

    pub fn affected_targets(&self) -> &[String] {
        &self.affected_targets
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl FromIterator<ScanResult> for BatchReport {
    fn from_iter<I: IntoIterator<Item = ScanResult>>(iter: I) -> Self {
        let mut report = BatchReport::default();
        for result in iter {
            report.push(result);
        }
        report
    }
}

pub struct Scanner<L> {
    listing: L,
    credentials: Box<dyn CredentialsProvider>,
}

impl<L: RepoListing> Scanner<L> {
    pub fn new(listing: L, credentials: Box<dyn CredentialsProvider>) -> Self {
        Self {
            listing,
            credentials,
        }
    }

    /// Build a request for `target` carrying the injected credentials.
    pub fn request(&self, target: impl Into<String>, terms: &[String]) -> ScanRequest {
        ScanRequest::new(target, terms.to_vec(), self.credentials.credentials())
    }

    pub fn requests<I, S>(&self, targets: I, terms: &[String]) -> Vec<ScanRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        targets
            .into_iter()
            .map(|target| self.request(target, terms))
            .collect()
    }

    /// Scan one target to completion or to its first failed page.
    #[instrument(skip_all, fields(target = %request.target))]
    pub async fn scan_one(&self, request: &ScanRequest) -> ScanResult {
        let terms = match request.validate() {
            Ok(terms) => terms,
            Err(error) => {
                warn!(%error, "rejecting scan request");
                return ScanResult::rejected(&request.target, error);
            }
        };

        info!(terms = ?terms.as_slice(), "scan started");
        let mut scan = ScanResult::started(&request.target, &terms);
        let mut page = 1u32;

        let status = loop {
            scan.pages_requested += 1;
            match self
                .listing
                .fetch_page(&request.target, page, &request.credentials)
                .await
            {
                Err(error) => {
                    warn!(%error, "page fetch failed; ending scan");
                    scan.transcript.push(TranscriptEntry::FetchFailed {
                        error: error.clone(),
                    });
                    break ScanStatus::FetchFailed(error);
                }
                Ok(Page::Exhausted) => break ScanStatus::Completed,
                Ok(Page::Items(records)) => {
                    debug!(page, items = records.len(), "evaluating page");
                    for record in records {
                        scan.repositories_checked += 1;
                        if matcher::matches(&record, &terms) {
                            debug!(url = %record.url, "description matched");
                            scan.matched_urls.push(record.url);
                        }
                    }
                    page += 1;
                }
            }
        };

        let scan = scan.finish(status);
        info!(
            pages = scan.pages_requested,
            checked = scan.repositories_checked,
            matched = scan.matched_urls.len(),
            completed = scan.is_completed(),
            "scan finished"
        );
        scan
    }

    /// Scan every request in order. A failed or rejected target never stops the batch.
    pub async fn scan_many(&self, requests: &[ScanRequest]) -> BatchReport {
        self.scan_many_with(requests, |_| {}).await
    }

    /// Like [`Scanner::scan_many`], calling `on_result` as each target finishes.
    pub async fn scan_many_with<F>(&self, requests: &[ScanRequest], mut on_result: F) -> BatchReport
    where
        F: FnMut(&ScanResult),
    {
        let mut report = BatchReport::default();
        for request in requests {
            let result = self.scan_one(request).await;
            on_result(&result);
            report.push(result);
        }
        info!(
            targets = report.len(),
            affected = report.affected_count(),
            "batch finished"
        );
        report
    }
}
