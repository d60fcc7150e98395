use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use repo_scan::credentials::{Credentials, StaticCredentials};
use repo_scan::github::{FetchError, FetchErrorKind, Page, RepoListing, RepositoryRecord};
use repo_scan::scan::{ConfigurationError, ScanRequest, ScanStatus, Scanner, TranscriptEntry};

type PageResponse = Result<Vec<RepositoryRecord>, u16>;

/// Serves scripted pages per target and records every fetch.
#[derive(Clone, Default)]
struct RecordingListing {
    pages: Arc<Mutex<HashMap<String, Vec<PageResponse>>>>,
    calls: Arc<Mutex<Vec<(String, u32)>>>,
}

impl RecordingListing {
    async fn script(&self, target: &str, pages: Vec<PageResponse>) {
        self.pages
            .lock()
            .await
            .insert(target.to_string(), pages);
    }

    async fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl RepoListing for RecordingListing {
    async fn fetch_page(
        &self,
        target: &str,
        page: u32,
        _credentials: &Credentials,
    ) -> Result<Page, FetchError> {
        self.calls.lock().await.push((target.to_string(), page));
        // Indexed by page number so a rescan replays the same listing.
        let next = self
            .pages
            .lock()
            .await
            .get(target)
            .and_then(|pages| pages.get(page as usize - 1).cloned());
        match next {
            None => Ok(Page::Exhausted),
            Some(Ok(items)) => Ok(Page::from_items(items)),
            Some(Err(status)) => Err(FetchError::new(target, page, FetchErrorKind::Status(status))),
        }
    }
}

fn repo(url: &str, description: Option<&str>) -> RepositoryRecord {
    RepositoryRecord::new(url, description)
}

fn creds() -> Credentials {
    Credentials::new("octocat", "tok")
}

fn scanner(listing: &RecordingListing) -> Scanner<RecordingListing> {
    Scanner::new(listing.clone(), Box::new(StaticCredentials(creds())))
}

fn terms(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|t| t.to_string()).collect()
}

async fn alice_and_bob(listing: &RecordingListing) {
    listing
        .script(
            "alice",
            vec![
                Ok(vec![repo("r1", Some("a cool Go tool")), repo("r2", None)]),
                Ok(vec![]),
            ],
        )
        .await;
    listing
        .script(
            "bob",
            vec![
                Ok(vec![
                    repo("b1", Some("python scripts")),
                    repo("b2", Some("dotfiles")),
                    repo("b3", None),
                ]),
                Err(403),
            ],
        )
        .await;
}

#[tokio::test]
async fn single_page_match_completes() {
    let listing = RecordingListing::default();
    alice_and_bob(&listing).await;
    let scanner = scanner(&listing);

    let result = scanner
        .scan_one(&scanner.request("alice", &terms(&["go"])))
        .await;

    assert_eq!(result.matched_urls, vec!["r1"]);
    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.pages_requested, 2);
    assert_eq!(result.repositories_checked, 2);
    assert_eq!(
        result.transcript,
        vec![
            TranscriptEntry::ScanStarted {
                target: "alice".into(),
                terms: terms(&["go"]),
            },
            TranscriptEntry::MatchesFound { count: 1 },
            TranscriptEntry::Matched { url: "r1".into() },
        ]
    );
    assert_eq!(
        listing.calls().await,
        vec![("alice".to_string(), 1), ("alice".to_string(), 2)]
    );
}

#[tokio::test]
async fn failure_on_second_page_stops_scan() {
    let listing = RecordingListing::default();
    alice_and_bob(&listing).await;
    let scanner = scanner(&listing);

    let result = scanner.scan_one(&scanner.request("bob", &terms(&["go"]))).await;

    assert!(result.matched_urls.is_empty());
    let expected_error = FetchError::new("bob", 2, FetchErrorKind::Status(403));
    assert_eq!(result.status, ScanStatus::FetchFailed(expected_error.clone()));
    assert_eq!(result.pages_requested, 2);
    assert!(result.transcript.contains(&TranscriptEntry::FetchFailed {
        error: expected_error
    }));
    let lines: Vec<String> = result.transcript.iter().map(|e| e.to_string()).collect();
    assert!(lines
        .iter()
        .any(|l| l.contains("page 2") && l.contains("403") && l.contains("bob")));
    assert_eq!(result.transcript.last(), Some(&TranscriptEntry::NoMatches));
    assert_eq!(listing.calls().await.len(), 2);
}

#[tokio::test]
async fn batch_tracks_affected_targets() {
    let listing = RecordingListing::default();
    alice_and_bob(&listing).await;
    let scanner = scanner(&listing);

    let requests = scanner.requests(["alice", "bob"], &terms(&["go"]));
    let report = scanner.scan_many(&requests).await;

    assert_eq!(report.len(), 2);
    assert_eq!(report.affected_count(), 1);
    assert_eq!(report.affected_targets(), &["alice".to_string()]);
    let targets: Vec<&str> = report.results().iter().map(|r| r.target.as_str()).collect();
    assert_eq!(targets, vec!["alice", "bob"]);
    assert!(report.results()[0].is_completed());
    assert!(!report.results()[1].is_completed());
}

#[tokio::test]
async fn empty_terms_rejected_before_any_fetch() {
    let listing = RecordingListing::default();
    alice_and_bob(&listing).await;
    let scanner = scanner(&listing);

    let result = scanner.scan_one(&scanner.request("alice", &[])).await;

    assert_eq!(
        result.status,
        ScanStatus::Rejected(ConfigurationError::NoSearchTerms)
    );
    assert_eq!(result.pages_requested, 0);
    assert!(result.matched_urls.is_empty());
    assert!(listing.calls().await.is_empty());
}

#[tokio::test]
async fn empty_target_rejected_without_stopping_batch() {
    let listing = RecordingListing::default();
    alice_and_bob(&listing).await;
    let scanner = scanner(&listing);

    let requests = scanner.requests(["", "alice"], &terms(&["go"]));
    let report = scanner.scan_many(&requests).await;

    assert_eq!(report.len(), 2);
    assert_eq!(
        report.results()[0].status,
        ScanStatus::Rejected(ConfigurationError::EmptyTarget)
    );
    assert_eq!(report.affected_targets(), &["alice".to_string()]);
    assert!(listing.calls().await.iter().all(|(target, _)| target == "alice"));
}

#[tokio::test]
async fn multi_page_matches_keep_listing_order() {
    let listing = RecordingListing::default();
    listing
        .script(
            "carol",
            vec![
                Ok(vec![repo("c1", Some("Miner")), repo("c2", Some("blog"))]),
                Ok(vec![repo("c3", Some("token drainer")), repo("c4", None)]),
                Ok(vec![repo("c5", Some("CPU MINER fork"))]),
                Ok(vec![]),
            ],
        )
        .await;
    let scanner = scanner(&listing);

    let result = scanner
        .scan_one(&scanner.request("carol", &terms(&["miner", "DRAINER"])))
        .await;

    assert_eq!(result.matched_urls, vec!["c1", "c3", "c5"]);
    assert_eq!(result.pages_requested, 4);
    assert_eq!(result.repositories_checked, 5);
    let pages: Vec<u32> = listing.calls().await.into_iter().map(|(_, p)| p).collect();
    assert_eq!(pages, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn failed_scan_keeps_earlier_matches_and_counts_as_affected() {
    let listing = RecordingListing::default();
    listing
        .script(
            "dave",
            vec![
                Ok(vec![repo("d1", Some("go tool"))]),
                Ok(vec![repo("d2", Some("another go thing"))]),
                Err(500),
                Ok(vec![repo("d3", Some("go never seen"))]),
            ],
        )
        .await;
    let scanner = scanner(&listing);

    let report = scanner
        .scan_many(&scanner.requests(["dave"], &terms(&["go"])))
        .await;

    let result = &report.results()[0];
    assert_eq!(result.matched_urls, vec!["d1", "d2"]);
    assert_eq!(result.pages_requested, 3);
    assert!(matches!(result.status, ScanStatus::FetchFailed(ref e) if e.page == 3));
    assert_eq!(
        result.transcript,
        vec![
            TranscriptEntry::ScanStarted {
                target: "dave".into(),
                terms: terms(&["go"]),
            },
            TranscriptEntry::FetchFailed {
                error: FetchError::new("dave", 3, FetchErrorKind::Status(500)),
            },
            TranscriptEntry::MatchesFound { count: 2 },
            TranscriptEntry::Matched { url: "d1".into() },
            TranscriptEntry::Matched { url: "d2".into() },
        ]
    );
    assert_eq!(report.affected_targets(), &["dave".to_string()]);
    assert_eq!(listing.calls().await.len(), 3);
}

#[tokio::test]
async fn failure_on_first_page_yields_empty_result() {
    let listing = RecordingListing::default();
    listing.script("erin", vec![Err(404)]).await;
    let scanner = scanner(&listing);

    let result = scanner.scan_one(&scanner.request("erin", &terms(&["go"]))).await;

    assert_eq!(result.pages_requested, 1);
    assert!(result.matched_urls.is_empty());
    assert_eq!(
        result.transcript[1].to_string(),
        "Error: could not fetch page 1 of erin's repositories: status code 404"
    );
}

#[tokio::test]
async fn duplicate_targets_are_scanned_independently() {
    let listing = RecordingListing::default();
    alice_and_bob(&listing).await;
    let scanner = scanner(&listing);

    let report = scanner
        .scan_many(&scanner.requests(["alice", "bob", "alice"], &terms(&["go"])))
        .await;

    assert_eq!(report.len(), 3);
    assert_eq!(
        report.affected_targets(),
        &["alice".to_string(), "alice".to_string()]
    );
    assert_eq!(report.results()[0], report.results()[2]);
    assert_eq!(listing.calls().await.len(), 2 + 2 + 2);
}

#[tokio::test]
async fn rescanning_unchanged_listing_is_identical() {
    let listing = RecordingListing::default();
    alice_and_bob(&listing).await;
    let scanner = scanner(&listing);
    let request = scanner.request("bob", &terms(&["dot"]));

    let first = scanner.scan_one(&request).await;
    let second = scanner.scan_one(&request).await;

    assert_eq!(first, second);
    assert_eq!(first.matched_urls, vec!["b2"]);
}

#[tokio::test]
async fn scan_many_with_reports_each_target_in_order() {
    let listing = RecordingListing::default();
    alice_and_bob(&listing).await;
    let scanner = scanner(&listing);

    let mut seen = Vec::new();
    let report = scanner
        .scan_many_with(&scanner.requests(["bob", "alice"], &terms(&["go"])), |r| {
            seen.push(r.target.clone())
        })
        .await;

    assert_eq!(seen, vec!["bob", "alice"]);
    assert_eq!(report.affected_targets(), &["alice".to_string()]);
}

#[tokio::test]
async fn requests_carry_injected_credentials() {
    let listing = RecordingListing::default();
    let scanner = scanner(&listing);
    let request = scanner.request("alice", &terms(&["go"]));
    assert_eq!(
        request,
        ScanRequest::new("alice", terms(&["go"]), creds())
    );
}
