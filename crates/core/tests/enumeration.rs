//! Enumerator behaviour against scripted sources.
//!
//! Covers ordering, the strict failure protocol, deadline expiry and the
//! guarantee that a producer never outlives its scope or its consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rstest::rstest;
use wharf_core::{EnumerationError, Enumerator, ErrorClass, ExecutionScope, ScopeState};
use wharf_ports::{
    EngineError, ImageSummary, ListFilter, Listing, NetworkResource, ResourceKind, ResourceSource,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn image(id: &str) -> ImageSummary {
    ImageSummary {
        id: id.to_owned(),
        ..ImageSummary::default()
    }
}

fn images(ids: &[&str]) -> Vec<ImageSummary> {
    ids.iter().map(|id| image(id)).collect()
}

fn ids(items: &[ImageSummary]) -> Vec<String> {
    items.iter().map(|i| i.id.clone()).collect()
}

/// Sets its flag when dropped; moved into a listing or list call to
/// observe when the producer lets go of it.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

enum Script {
    Items(Vec<ImageSummary>),
    FailList(EngineError),
    FailAfter(Vec<ImageSummary>, EngineError),
    /// The list call never answers.
    Hang,
    /// The listing yields forever.
    Endless,
    /// The listing panics on the first pull.
    Panic,
}

struct ScriptedSource {
    script: Script,
    calls: AtomicUsize,
    released: Arc<AtomicBool>,
    seen_filter: Mutex<Option<ListFilter>>,
}

impl ScriptedSource {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            released: Arc::new(AtomicBool::new(false)),
            seen_filter: Mutex::new(None),
        })
    }

    fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn guarded(&self, listing: Listing<ImageSummary>) -> Listing<ImageSummary> {
        let flag = DropFlag(Arc::clone(&self.released));
        listing
            .map(move |item| {
                let _held = &flag;
                item
            })
            .boxed()
    }
}

#[async_trait]
impl ResourceSource<ImageSummary> for ScriptedSource {
    async fn list(&self, filter: &ListFilter) -> Result<Listing<ImageSummary>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_filter.lock() = Some(filter.clone());
        match &self.script {
            Script::Items(items) => Ok(self.guarded(wharf_ports::listing::from_vec(items.clone()))),
            Script::FailList(err) => Err(err.clone()),
            Script::FailAfter(items, err) => Ok(self.guarded(wharf_ports::listing::failing_after(
                items.clone(),
                err.clone(),
            ))),
            Script::Hang => {
                let _flag = DropFlag(Arc::clone(&self.released));
                futures::future::pending::<()>().await;
                unreachable!("pending never resolves")
            }
            Script::Endless => {
                let mut n = 0_u64;
                Ok(self.guarded(
                    stream::repeat_with(move || {
                        n += 1;
                        Ok(image(&format!("img-{n}")))
                    })
                    .boxed(),
                ))
            }
            Script::Panic => Ok(stream::poll_fn(|_| -> std::task::Poll<Option<_>> {
                panic!("driver bug")
            })
            .boxed()),
        }
    }
}

struct FailingNetworks;

#[async_trait]
impl ResourceSource<NetworkResource> for FailingNetworks {
    async fn list(&self, _filter: &ListFilter) -> Result<Listing<NetworkResource>, EngineError> {
        Err(EngineError::connection("engine unreachable"))
    }
}

async fn settle(flag: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if flag() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    flag()
}

fn scope(label: &str) -> ExecutionScope {
    ExecutionScope::new(label, Duration::from_secs(100))
}

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

#[rstest]
#[case::empty(0)]
#[case::one(1)]
#[case::three(3)]
#[case::more_than_capacity(40)]
#[tokio::test]
async fn relays_every_summary_in_source_order(#[case] n: usize) {
    let expected: Vec<String> = (0..n).map(|i| format!("sha256:{i:04}")).collect();
    let source = ScriptedSource::new(Script::Items(
        expected.iter().map(|id| image(id)).collect(),
    ));
    let enumerator = Enumerator::with_capacity(Arc::clone(&source), 4);
    let scope = scope("ordered");

    let listed: Vec<ImageSummary> = enumerator.list(&scope, ListFilter::all()).await.unwrap();

    assert_eq!(ids(&listed), expected);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(scope.state(), ScopeState::Completed);
}

#[tokio::test]
async fn three_images_listed_without_error() {
    let source = ScriptedSource::new(Script::Items(images(&["A", "B", "C"])));
    let enumerator = Enumerator::new(source);
    let scope = scope("scenario");

    let mut run = enumerator.enumerate::<ImageSummary>(&scope, ListFilter::all());
    let mut seen = Vec::new();
    while let Some(next) = run.next().await {
        seen.push(next.unwrap().id);
    }

    assert_eq!(seen, vec!["A", "B", "C"]);
    assert!(run.producer_finished());
}

#[tokio::test]
async fn filter_reaches_the_source_unchanged() {
    let source = ScriptedSource::new(Script::Items(vec![]));
    let enumerator = Enumerator::new(Arc::clone(&source));
    let filter = ListFilter::all().dangling(true).with_label("env=prod");

    let _: Vec<ImageSummary> = enumerator.list(&scope("filter"), filter.clone()).await.unwrap();

    assert_eq!(source.seen_filter.lock().clone(), Some(filter));
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

#[rstest]
#[case::before_any(0)]
#[case::after_two(2)]
#[case::after_many(30)]
#[tokio::test]
async fn failure_after_k_summaries_fails_the_run(#[case] k: usize) {
    let produced: Vec<ImageSummary> = (0..k).map(|i| image(&format!("i{i}"))).collect();
    let source = ScriptedSource::new(Script::FailAfter(
        produced,
        EngineError::connection("connection reset"),
    ));
    let enumerator = Enumerator::with_capacity(source, 2);
    let scope = scope("partial");

    let outcome = enumerator.list::<ImageSummary>(&scope, ListFilter::all()).await;

    assert_eq!(
        outcome,
        Err(EnumerationError::Source {
            kind: ResourceKind::Image,
            source: EngineError::connection("connection reset"),
        })
    );
    assert_eq!(scope.state(), ScopeState::Failed);
}

#[tokio::test]
async fn connection_reset_after_two_images_reports_detail_only() {
    let source = ScriptedSource::new(Script::FailAfter(
        images(&["A", "B"]),
        EngineError::connection("connection reset"),
    ));
    let enumerator = Enumerator::new(source);

    let err = enumerator
        .list::<ImageSummary>(&scope("reset"), ListFilter::all())
        .await
        .unwrap_err();

    assert_eq!(err.detail(), "connection reset");
    assert_eq!(err.class(), ErrorClass::Enumeration);
}

#[tokio::test]
async fn streaming_consumer_sees_exactly_one_error_then_end() {
    let source = ScriptedSource::new(Script::FailAfter(
        images(&["A", "B"]),
        EngineError::connection("connection reset"),
    ));
    let enumerator = Enumerator::new(source);
    let scope = scope("stream");

    let outcomes: Vec<_> = enumerator
        .enumerate::<ImageSummary>(&scope, ListFilter::all())
        .collect()
        .await;

    let errors = outcomes.iter().filter(|o| o.is_err()).count();
    assert_eq!(errors, 1);
    assert!(outcomes.last().is_some_and(Result::is_err));
}

#[tokio::test(start_paused = true)]
async fn list_call_failure_does_not_block_the_consumer() {
    let source = ScriptedSource::new(Script::FailList(EngineError::connection("no route")));
    let enumerator = Enumerator::new(source);
    let scope = scope("no-items");

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        enumerator.list::<ImageSummary>(&scope, ListFilter::all()),
    )
    .await
    .expect("consumer must not hang when nothing was produced");

    assert_eq!(outcome.unwrap_err().detail(), "no route");
}

#[tokio::test]
async fn error_kind_follows_the_resource() {
    let enumerator = Enumerator::new(Arc::new(FailingNetworks));
    let err = enumerator
        .list::<NetworkResource>(&scope("networks"), ListFilter::all())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ResourceKind::Network);
    assert_eq!(err.to_string(), "failed to list networks: engine unreachable");
}

#[tokio::test]
async fn producer_panic_surfaces_as_aborted() {
    let source = ScriptedSource::new(Script::Panic);
    let enumerator = Enumerator::new(source);

    let err = enumerator
        .list::<ImageSummary>(&scope("panic"), ListFilter::all())
        .await
        .unwrap_err();

    assert!(matches!(err, EnumerationError::Aborted { kind: ResourceKind::Image, .. }));
    assert_eq!(err.class(), ErrorClass::Enumeration);
}

// ---------------------------------------------------------------------------
// Deadline and cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn deadline_expiry_fails_the_run() {
    let source = ScriptedSource::new(Script::Hang);
    let enumerator = Enumerator::new(Arc::clone(&source));
    let scope = ExecutionScope::new("deadline", Duration::from_millis(250));

    let err = enumerator
        .list::<ImageSummary>(&scope, ListFilter::all())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EnumerationError::DeadlineExceeded {
            kind: ResourceKind::Image,
            budget: Duration::from_millis(250),
        }
    );
    assert!(err.is_deadline_exceeded());
    assert_eq!(scope.state(), ScopeState::Failed);
    assert!(source.released());
}

#[tokio::test]
async fn explicit_cancellation_is_observed_as_deadline() {
    let source = ScriptedSource::new(Script::Endless);
    let enumerator = Enumerator::with_capacity(Arc::clone(&source), 1);
    let scope = scope("cancel");

    let mut run = enumerator.enumerate::<ImageSummary>(&scope, ListFilter::all());
    assert!(run.next().await.is_some_and(|r| r.is_ok()));
    scope.cancel();

    let err = run.collect_all().await.unwrap_err();
    assert_eq!(err, EnumerationError::Cancelled { kind: ResourceKind::Image });
    assert_eq!(err.class(), ErrorClass::DeadlineExceeded);
    assert_eq!(scope.state(), ScopeState::Cancelled);
    assert!(settle(|| source.released()).await);
}

#[tokio::test]
async fn releasing_the_scope_stops_a_hanging_producer() {
    let source = ScriptedSource::new(Script::Hang);
    let enumerator = Enumerator::new(Arc::clone(&source));
    let scope = scope("released");
    let observer = scope.observer();

    let mut run = enumerator.enumerate::<ImageSummary>(&scope, ListFilter::all());
    tokio::task::yield_now().await;
    drop(scope);

    let next = run.next().await;
    assert_eq!(
        next,
        Some(Err(EnumerationError::Cancelled { kind: ResourceKind::Image }))
    );
    assert!(run.next().await.is_none());
    assert!(run.producer_finished());
    assert!(source.released());
    assert!(observer.is_released());
    assert_eq!(observer.state(), ScopeState::Cancelled);
}

#[tokio::test]
async fn abandoned_consumer_does_not_leak_the_producer() {
    let source = ScriptedSource::new(Script::Endless);
    let enumerator = Enumerator::with_capacity(Arc::clone(&source), 2);
    let scope = scope("abandoned");

    let mut run = enumerator.enumerate::<ImageSummary>(&scope, ListFilter::all());
    let first: Vec<_> = (&mut run).take(3).collect().await;
    assert_eq!(first.len(), 3);
    drop(run);

    // The scope is still alive: only the closed relay stops the producer.
    assert!(settle(|| source.released()).await);
    assert_eq!(scope.state(), ScopeState::Cancelled);
}

#[tokio::test]
async fn abandoned_before_first_poll_still_terminates() {
    let source = ScriptedSource::new(Script::Hang);
    let enumerator = Enumerator::new(Arc::clone(&source));
    let scope = scope("never-polled");

    drop(enumerator.enumerate::<ImageSummary>(&scope, ListFilter::all()));

    assert!(settle(|| scope.state() == ScopeState::Cancelled).await);
}
