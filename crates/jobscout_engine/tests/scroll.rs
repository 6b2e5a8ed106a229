mod support;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use jobscout_engine::{
    scroll_to_convergence, ConvergenceSettings, DriverError, EngineEvent, NullSink, Page,
    PageDriver, Scope,
};
use support::{init_logging, listing_page, Card, RecordingSink, StaticSite, LISTING_URL};

/// Page whose container count follows a script; the last value repeats.
struct ScriptedPage {
    counts: Mutex<VecDeque<usize>>,
    last: Mutex<usize>,
    count_calls: AtomicUsize,
    scrolls: AtomicUsize,
}

impl ScriptedPage {
    fn new(counts: &[usize]) -> Self {
        Self {
            counts: Mutex::new(counts.iter().copied().collect()),
            last: Mutex::new(0),
            count_calls: AtomicUsize::new(0),
            scrolls: AtomicUsize::new(0),
        }
    }

    fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Page for ScriptedPage {
    async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for_selector(&self, _s: &str, _t: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn count(&self, _selector: &str) -> Result<usize, DriverError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.counts.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(*last)
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_texts(
        &self,
        _scope: Scope<'_>,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<Vec<String>, DriverError> {
        Ok(Vec::new())
    }

    async fn read_attribute(
        &self,
        _scope: Scope<'_>,
        _selector: &str,
        _attr: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, DriverError> {
        Ok(None)
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

fn settings() -> ConvergenceSettings {
    ConvergenceSettings {
        settle: Duration::ZERO,
        ..ConvergenceSettings::default()
    }
}

#[tokio::test]
async fn stops_after_stall_limit_once_count_stabilizes() {
    init_logging();
    let page = ScriptedPage::new(&[10, 20, 30]);

    let count = scroll_to_convergence(&page, ".job-wrapper", &settings(), &NullSink)
        .await
        .unwrap();

    assert_eq!(count, 30);
    // Initial count, two growing recounts, then five stalled ones.
    assert_eq!(page.count_calls(), 8);
}

#[tokio::test]
async fn zero_items_end_after_one_pass() {
    init_logging();
    let page = ScriptedPage::new(&[0]);

    let count = scroll_to_convergence(&page, ".job-wrapper", &settings(), &NullSink)
        .await
        .unwrap();

    assert_eq!(count, 0);
    assert_eq!(page.count_calls(), 2);
    assert_eq!(page.scrolls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stops_once_max_items_is_reached() {
    let page = ScriptedPage::new(&[50, 150, 250, 400]);

    let count = scroll_to_convergence(&page, ".job-wrapper", &settings(), &NullSink)
        .await
        .unwrap();

    assert_eq!(count, 250);
    assert_eq!(page.count_calls(), 3);
}

#[tokio::test]
async fn iteration_ceiling_bounds_a_page_that_never_stalls() {
    let growing: Vec<usize> = (1..=100).collect();
    let page = ScriptedPage::new(&growing);
    let settings = ConvergenceSettings {
        max_iterations: 15,
        ..settings()
    };

    let count = scroll_to_convergence(&page, ".job-wrapper", &settings, &NullSink)
        .await
        .unwrap();

    assert_eq!(count, 16);
    assert_eq!(page.scrolls.load(Ordering::SeqCst), 15);
}

#[tokio::test]
async fn a_shrinking_recount_counts_as_a_stall() {
    let page = ScriptedPage::new(&[12, 9, 12, 12, 12, 12]);
    let sink = RecordingSink::new();

    let count = scroll_to_convergence(&page, ".job-wrapper", &settings(), &sink)
        .await
        .unwrap();

    assert_eq!(count, 12);
    assert_eq!(sink.events(), vec![EngineEvent::ListingsFound(12)]);
}

#[tokio::test]
async fn follows_a_listing_page_that_grows_on_scroll() {
    init_logging();
    let first: Vec<Card> = (0..3)
        .map(|i| Card::new(&format!("Job {i}"), &format!("job-{i}-1000000")))
        .collect();
    let more: Vec<Card> = (0..5)
        .map(|i| Card::new(&format!("Job {i}"), &format!("job-{i}-1000000")))
        .collect();
    let site = StaticSite::new().with_snapshots(
        LISTING_URL,
        vec![listing_page(&first), listing_page(&more)],
    );
    let page = site.open_page().await.unwrap();
    page.navigate(LISTING_URL, Duration::from_secs(1))
        .await
        .unwrap();
    let sink = RecordingSink::new();

    let count = scroll_to_convergence(page.as_ref(), ".job-wrapper", &settings(), &sink)
        .await
        .unwrap();

    assert_eq!(count, 5);
    assert_eq!(
        sink.events(),
        vec![EngineEvent::ListingsFound(3), EngineEvent::ListingsFound(5)]
    );
}
