use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use recat_core::{filter_will_change, render_link, Document, FileStatus, MutationRequest};
use recat_engine::{
    enumerate_documents, BatchEngine, BatchOptions, DocumentStore, Mutation, MutationGateway,
    NullSink, ProgressSink, Quota, QuotaSource, RateBudget, StopHandle, StoreError, WriteOutcome,
};
use tokio::time::Instant;

#[derive(Default)]
struct MemoryStore {
    pages: Mutex<HashMap<String, String>>,
    rate_limit_once: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    fn with_pages(pages: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        *store.pages.lock().unwrap() = pages
            .iter()
            .map(|(title, body)| (title.to_string(), body.to_string()))
            .collect();
        Arc::new(store)
    }

    fn rate_limit_once(&self, title: &str) {
        self.rate_limit_once
            .lock()
            .unwrap()
            .insert(title.to_string());
    }

    fn body(&self, title: &str) -> Option<String> {
        self.pages.lock().unwrap().get(title).cloned()
    }

    fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read_body(&self, title: &str) -> Result<String, StoreError> {
        if self.rate_limit_once.lock().unwrap().remove(title) {
            return Err(StoreError::RateLimited);
        }
        self.body(title)
            .ok_or_else(|| StoreError::MissingTarget(title.to_string()))
    }

    async fn write(
        &self,
        title: &str,
        body: &str,
        _summary: &str,
    ) -> Result<WriteOutcome, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .insert(title.to_string(), body.to_string());
        Ok(WriteOutcome::Accepted)
    }
}

struct FixedQuota(Quota);

#[async_trait]
impl QuotaSource for FixedQuota {
    async fn fetch_quota(&self) -> Quota {
        self.0
    }
}

fn engine_over(store: Arc<MemoryStore>, quota: Quota, options: BatchOptions) -> BatchEngine {
    BatchEngine::new(
        MutationGateway::new(store),
        Arc::new(FixedQuota(quota)),
        RateBudget::default(),
        options,
    )
}

fn request(add: &[&str], remove: &[&str]) -> MutationRequest {
    MutationRequest::new(
        add.iter().map(|c| c.to_string()).collect(),
        remove.iter().map(|c| c.to_string()).collect(),
    )
    .expect("valid request")
}

fn docs(titles: &[&str]) -> Vec<Document> {
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| Document::new(*title, index as u64 + 1))
        .collect()
}

const WIDE: Quota = Quota {
    allowance: 5,
    window_seconds: 1,
};

const SERIAL: Quota = Quota {
    allowance: 1,
    window_seconds: 1,
};

#[tokio::test]
async fn enumeration_observes_categories_and_reports_unreadable_titles() {
    let store = MemoryStore::with_pages(&[
        ("One", "Text.\n[[Category:Ships]]\n[[Category:Old_Boats]]\n"),
        ("Two", "No links here."),
    ]);
    let titles = vec!["One".to_string(), "Ghost".to_string(), "Two".to_string()];

    let (documents, failures) = enumerate_documents(store.as_ref(), &titles).await;

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].title, "One");
    assert_eq!(documents[0].current_categories, vec!["Ships", "Old_Boats"]);
    assert!(documents[1].current_categories.is_empty());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "Ghost");
    assert_eq!(failures[0].1, StoreError::MissingTarget("Ghost".to_string()));
}

#[tokio::test(start_paused = true)]
async fn adding_a_missing_category_updates_every_document() {
    let store = MemoryStore::with_pages(&[("One", "Text."), ("Two", "More text."), ("Three", "")]);
    let mut engine = engine_over(store.clone(), WIDE, BatchOptions::default());

    let result = engine
        .run(
            docs(&["One", "Two", "Three"]),
            &request(&["Ships"], &[]),
            &NullSink,
        )
        .await;

    assert_eq!(result.total(), 3);
    assert_eq!(result.successful(), 3);
    assert_eq!(result.skipped(), 0);
    assert_eq!(result.failed(), 0);
    assert_eq!(
        result.processed(),
        result.successful() + result.skipped() + result.failed()
    );
    assert!(store.body("One").unwrap().contains("[[Category:Ships]]"));
    assert!(store.body("Three").unwrap().contains("[[Category:Ships]]"));
}

#[tokio::test(start_paused = true)]
async fn already_categorized_document_is_skipped_not_written() {
    let store = MemoryStore::with_pages(&[("One", "Text."), ("Two", "[[Category:Ships]]\n")]);
    let mut engine = engine_over(store.clone(), WIDE, BatchOptions::default());

    let result = engine
        .run(docs(&["One", "Two"]), &request(&["Ships"], &[]), &NullSink)
        .await;

    assert_eq!(result.successful(), 1);
    assert_eq!(result.skipped(), 1);
    assert_eq!(result.failed(), 0);
    assert_eq!(store.write_count(), 1);

    let skipped: Vec<_> = result
        .file_results()
        .iter()
        .filter(|r| r.status == FileStatus::Skipped)
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].document.title, "Two");
}

#[tokio::test(start_paused = true)]
async fn missing_target_is_recorded_and_the_run_continues() {
    let store = MemoryStore::with_pages(&[("One", "Text.")]);
    let mut engine = engine_over(store, WIDE, BatchOptions::default());

    let result = engine
        .run(docs(&["Ghost", "One"]), &request(&["Ships"], &[]), &NullSink)
        .await;

    assert_eq!(result.total(), 2);
    assert_eq!(result.successful(), 1);
    assert_eq!(result.failed(), 1);
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].document.title, "Ghost");
    assert!(result.errors()[0].message.contains("does not exist"));
}

#[tokio::test]
async fn preview_and_execution_agree_on_which_documents_change() {
    let documents = vec![
        Document::new("One", 1).with_categories(vec!["Ships".to_string()]),
        Document::new("Two", 2),
        Document::new("Three", 3).with_categories(vec!["Boats".to_string()]),
    ];
    let pages: Vec<(String, String)> = documents
        .iter()
        .map(|doc| {
            let body = doc
                .current_categories
                .iter()
                .map(|name| render_link(name))
                .collect::<Vec<_>>()
                .join("\n");
            (doc.title.clone(), body)
        })
        .collect();
    let page_refs: Vec<(&str, &str)> = pages
        .iter()
        .map(|(t, b)| (t.as_str(), b.as_str()))
        .collect();
    let store = MemoryStore::with_pages(&page_refs);
    let gateway = MutationGateway::new(store);
    let req = request(&["Ships"], &[]);

    let expected: Vec<String> = filter_will_change(&documents, &req)
        .into_iter()
        .map(|doc| doc.title)
        .collect();

    let mut applied = Vec::new();
    for doc in &documents {
        if gateway.mutate(&doc.title, &req).await.expect("mutate ok") == Mutation::Applied {
            applied.push(doc.title.clone());
        }
    }

    assert_eq!(applied, expected);
    assert_eq!(applied, vec!["Two".to_string(), "Three".to_string()]);
}

struct StopAfterFirst {
    handle: StopHandle,
}

impl ProgressSink for StopAfterFirst {
    fn on_file_complete(&self, _document: &Document, _succeeded: bool) {
        self.handle.stop();
    }
}

#[tokio::test(start_paused = true)]
async fn stop_request_takes_effect_before_the_next_unit_starts() {
    let store = MemoryStore::with_pages(&[("One", ""), ("Two", ""), ("Three", "")]);
    let mut engine = engine_over(store, SERIAL, BatchOptions::default());
    let sink = StopAfterFirst {
        handle: engine.stop_handle(),
    };

    let result = engine
        .run(
            docs(&["One", "Two", "Three"]),
            &request(&["Ships"], &[]),
            &sink,
        )
        .await;

    // Unstarted items are silently left out of `processed`.
    assert_eq!(result.total(), 3);
    assert_eq!(result.processed(), 1);
    assert_eq!(result.successful(), 1);
}

#[tokio::test(start_paused = true)]
async fn run_clears_a_leftover_stop_request() {
    let store = MemoryStore::with_pages(&[("One", ""), ("Two", "")]);
    let mut engine = engine_over(store, WIDE, BatchOptions::default());
    engine.stop();

    let result = engine
        .run(docs(&["One", "Two"]), &request(&["Ships"], &[]), &NullSink)
        .await;

    assert_eq!(result.processed(), 2);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_item_is_dropped_from_accounting_by_default() {
    let store = MemoryStore::with_pages(&[("One", ""), ("Two", ""), ("Three", "")]);
    store.rate_limit_once("Two");
    let mut engine = engine_over(store, WIDE, BatchOptions::default());

    let started = Instant::now();
    let result = engine
        .run(
            docs(&["One", "Two", "Three"]),
            &request(&["Ships"], &[]),
            &NullSink,
        )
        .await;

    // The throttled item is neither counted nor recorded anywhere, while
    // `total` still includes it.
    assert_eq!(result.total(), 3);
    assert_eq!(result.processed(), 2);
    assert_eq!(result.successful(), 2);
    assert!(result.errors().is_empty());
    assert_eq!(result.file_results().len(), 2);
    assert!(started.elapsed() >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_item_is_retried_when_enabled() {
    let store = MemoryStore::with_pages(&[("One", ""), ("Two", ""), ("Three", "")]);
    store.rate_limit_once("Two");
    let mut engine = engine_over(
        store,
        WIDE,
        BatchOptions {
            retry_on_rate_limit: true,
        },
    );

    let result = engine
        .run(
            docs(&["One", "Two", "Three"]),
            &request(&["Ships"], &[]),
            &NullSink,
        )
        .await;

    assert_eq!(result.total(), 3);
    assert_eq!(result.processed(), 3);
    assert_eq!(result.successful(), 3);
}

struct PanickySink;

impl ProgressSink for PanickySink {
    fn on_progress(&self, _percent: f64, _snapshot: &recat_core::BatchResult) {
        panic!("sink exploded");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_sink_does_not_abort_the_run() {
    let store = MemoryStore::with_pages(&[("One", ""), ("Two", "")]);
    let mut engine = engine_over(store, WIDE, BatchOptions::default());

    let result = engine
        .run(docs(&["One", "Two"]), &request(&["Ships"], &[]), &PanickySink)
        .await;

    assert_eq!(result.processed(), 2);
    assert_eq!(result.successful(), 2);
}

#[derive(Default)]
struct RecordingSink {
    percents: Mutex<Vec<f64>>,
    completions: Mutex<Vec<(String, bool)>>,
    failures: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, percent: f64, _snapshot: &recat_core::BatchResult) {
        self.percents.lock().unwrap().push(percent);
    }

    fn on_file_complete(&self, document: &Document, succeeded: bool) {
        self.completions
            .lock()
            .unwrap()
            .push((document.title.clone(), succeeded));
    }

    fn on_error(&self, document: &Document, _error: &StoreError) {
        self.failures.lock().unwrap().push(document.title.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn sink_sees_every_outcome_in_completion_order() {
    let store = MemoryStore::with_pages(&[("One", ""), ("Two", "[[Category:Ships]]")]);
    let mut engine = engine_over(store, SERIAL, BatchOptions::default());
    let sink = RecordingSink::default();

    let result = engine
        .run(
            docs(&["One", "Two", "Ghost"]),
            &request(&["Ships"], &[]),
            &sink,
        )
        .await;

    assert_eq!(result.processed(), 3);
    assert_eq!(
        *sink.completions.lock().unwrap(),
        vec![("One".to_string(), true), ("Two".to_string(), false)]
    );
    assert_eq!(*sink.failures.lock().unwrap(), vec!["Ghost".to_string()]);

    let percents = sink.percents.lock().unwrap().clone();
    let expected: Vec<f64> = vec![100.0 / 3.0, 200.0 / 3.0, 100.0];
    assert_eq!(percents, expected);
}
