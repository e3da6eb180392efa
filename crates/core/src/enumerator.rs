//! Cancellable fan-in enumeration.
//!
//! [`Enumerator::enumerate`] starts one producer task per run. The task
//! calls the source once and relays every summary through a bounded
//! channel. A failure travels on a separate one-shot channel, so it is
//! never stuck behind backpressure and is always distinguishable from a
//! clean end of the listing.
//!
//! The consumer sees one typed stream, [`Enumeration`]: summaries in
//! source order, then either the end of the stream or exactly one error.
//!
//! The producer stops at its next suspension point when any of these
//! happen: the scope is cancelled or released, the deadline passes, or
//! the [`Enumeration`] is dropped.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Instrument;
use wharf_ports::{ListFilter, Resource, ResourceKind, ResourceSource};

use crate::error::EnumerationError;
use crate::scope::{ExecutionScope, ScopeBinding, ScopeError, ScopeState};

/// Summaries buffered between producer and consumer by default.
pub const DEFAULT_RELAY_CAPACITY: usize = 16;

/// Runs enumerations against a resource source.
pub struct Enumerator<S: ?Sized> {
    source: Arc<S>,
    capacity: usize,
}

impl<S: ?Sized> Clone for Enumerator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            capacity: self.capacity,
        }
    }
}

impl<S: ?Sized> fmt::Debug for Enumerator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enumerator")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<S: ?Sized> Enumerator<S> {
    /// Wrap a source with the default relay capacity.
    pub fn new(source: Arc<S>) -> Self {
        Self::with_capacity(source, DEFAULT_RELAY_CAPACITY)
    }

    /// Wrap a source, buffering at most `capacity` summaries (at least one).
    pub fn with_capacity(source: Arc<S>, capacity: usize) -> Self {
        Self {
            source,
            capacity: capacity.max(1),
        }
    }

    /// Relay capacity in summaries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Start enumerating `R` resources matching `filter`.
    ///
    /// Returns immediately; the single list call happens on a spawned
    /// task bound to `scope`. Must be called within a Tokio runtime.
    pub fn enumerate<R>(&self, scope: &ExecutionScope, filter: ListFilter) -> Enumeration<R>
    where
        R: Resource,
        S: ResourceSource<R> + 'static,
    {
        let (items_tx, items_rx) = mpsc::channel(self.capacity);
        let (error_tx, error_rx) = oneshot::channel();
        let binding = scope.bind();
        binding.transition(ScopeState::Active);

        let span = tracing::debug_span!("enumerate", kind = %R::KIND, scope = binding.label());
        let producer = tokio::spawn(
            produce(Arc::clone(&self.source), filter, binding, items_tx, error_tx).instrument(span),
        );

        Enumeration {
            kind: R::KIND,
            items: items_rx,
            error: Some(error_rx),
            producer: Some(producer),
            done: false,
        }
    }

    /// Enumerate and collect under the strict protocol of
    /// [`Enumeration::collect_all`].
    pub async fn list<R>(
        &self,
        scope: &ExecutionScope,
        filter: ListFilter,
    ) -> Result<Vec<R>, EnumerationError>
    where
        R: Resource,
        S: ResourceSource<R> + 'static,
    {
        self.enumerate(scope, filter).collect_all().await
    }
}

/// How a producer run ended.
enum Relay {
    /// The listing finished.
    Exhausted { relayed: usize },
    /// The consumer dropped its end.
    Abandoned { relayed: usize },
    /// The source failed or the scope stopped the run.
    Failed(EnumerationError),
}

async fn produce<R, S>(
    source: Arc<S>,
    filter: ListFilter,
    scope: ScopeBinding,
    items: mpsc::Sender<R>,
    error: oneshot::Sender<EnumerationError>,
) where
    R: Resource,
    S: ResourceSource<R> + ?Sized,
{
    tracing::debug!(budget = ?scope.budget(), "enumeration started");

    match relay(&*source, &filter, &scope, &items).await {
        Relay::Exhausted { relayed } => {
            scope.transition(ScopeState::Completed);
            tracing::debug!(count = relayed, "enumeration completed");
        }
        Relay::Abandoned { relayed } => {
            scope.transition(ScopeState::Cancelled);
            tracing::debug!(count = relayed, "enumeration abandoned by consumer");
        }
        Relay::Failed(err) => {
            scope.transition(match err {
                EnumerationError::Cancelled { .. } => ScopeState::Cancelled,
                _ => ScopeState::Failed,
            });
            tracing::warn!(class = %err.class(), error = %err, "enumeration failed");
            // Sent while `items` is still open, so a consumer that sees the
            // item channel close never misses the error.
            let _ = error.send(err);
        }
    }
}

async fn relay<R, S>(
    source: &S,
    filter: &ListFilter,
    scope: &ScopeBinding,
    items: &mpsc::Sender<R>,
) -> Relay
where
    R: Resource,
    S: ResourceSource<R> + ?Sized,
{
    let kind = R::KIND;
    let scope_failure = |err: ScopeError| Relay::Failed(EnumerationError::from_scope(kind, err));

    let listed = tokio::select! {
        biased;
        () = items.closed() => return Relay::Abandoned { relayed: 0 },
        listed = scope.guard(source.list(filter)) => listed,
    };
    let mut listing = match listed {
        Ok(Ok(listing)) => listing,
        Ok(Err(source)) => return Relay::Failed(EnumerationError::Source { kind, source }),
        Err(err) => return scope_failure(err),
    };

    let mut relayed = 0;
    loop {
        let next = tokio::select! {
            biased;
            () = items.closed() => return Relay::Abandoned { relayed },
            next = scope.guard(listing.next()) => next,
        };
        let item = match next {
            Ok(Some(Ok(item))) => item,
            Ok(Some(Err(source))) => {
                return Relay::Failed(EnumerationError::Source { kind, source });
            }
            Ok(None) => return Relay::Exhausted { relayed },
            Err(err) => return scope_failure(err),
        };

        match scope.guard(items.send(item)).await {
            Ok(Ok(())) => relayed += 1,
            Ok(Err(_)) => return Relay::Abandoned { relayed },
            Err(err) => return scope_failure(err),
        }
    }
}

/// The consumer side of one enumeration run.
///
/// Yields summaries in source order, then ends (success) or yields one
/// `Err` and ends (failure). Not restartable.
#[must_use = "an enumeration does nothing useful unless polled"]
pub struct Enumeration<R> {
    kind: ResourceKind,
    items: mpsc::Receiver<R>,
    error: Option<oneshot::Receiver<EnumerationError>>,
    producer: Option<JoinHandle<()>>,
    done: bool,
}

impl<R> fmt::Debug for Enumeration<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enumeration")
            .field("kind", &self.kind)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<R> Enumeration<R> {
    /// Resource kind being enumerated.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns `true` once the producer task has exited.
    #[must_use]
    pub fn producer_finished(&self) -> bool {
        self.producer.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Drain the run, keeping the summaries only if it succeeded.
    ///
    /// On failure everything received so far is discarded and the single
    /// terminal error is returned.
    pub async fn collect_all(mut self) -> Result<Vec<R>, EnumerationError>
    where
        R: Send,
    {
        let mut collected = Vec::new();
        while let Some(next) = self.next().await {
            collected.push(next?);
        }
        Ok(collected)
    }

    fn fail(&mut self, err: EnumerationError) -> Poll<Option<Result<R, EnumerationError>>> {
        self.done = true;
        self.error = None;
        self.items.close();
        Poll::Ready(Some(Err(err)))
    }

    /// The item channel closed. The producer sent its error (if any)
    /// before closing it, so the error channel is conclusive now; the
    /// join handle only tells a clean exit from a panic.
    fn poll_end(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<R, EnumerationError>>> {
        if let Some(mut rx) = self.error.take() {
            if let Ok(err) = rx.try_recv() {
                return self.fail(err);
            }
        }

        if let Some(handle) = self.producer.as_mut() {
            let joined = match Pin::new(handle).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(joined) => joined,
            };
            self.producer = None;
            if let Err(join_err) = joined {
                let err = EnumerationError::Aborted {
                    kind: self.kind,
                    reason: join_err.to_string(),
                };
                return self.fail(err);
            }
        }

        self.done = true;
        Poll::Ready(None)
    }
}

impl<R> Stream for Enumeration<R> {
    type Item = Result<R, EnumerationError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        if let Some(rx) = this.error.as_mut() {
            match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(err)) => return this.fail(err),
                // Producer ended without an error.
                Poll::Ready(Err(_)) => this.error = None,
                Poll::Pending => {}
            }
        }

        match this.items.poll_recv(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(Ok(item))),
            Poll::Ready(None) => this.poll_end(cx),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<R> FusedStream for Enumeration<R> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use wharf_ports::{EngineError, ImageSummary, Listing, listing};

    use super::*;

    struct Fixed(Vec<ImageSummary>);

    #[async_trait]
    impl ResourceSource<ImageSummary> for Fixed {
        async fn list(&self, _filter: &ListFilter) -> Result<Listing<ImageSummary>, EngineError> {
            Ok(listing::from_vec(self.0.clone()))
        }
    }

    fn image(id: &str) -> ImageSummary {
        ImageSummary {
            id: id.into(),
            ..ImageSummary::default()
        }
    }

    #[test]
    fn capacity_is_at_least_one() {
        let enumerator = Enumerator::with_capacity(Arc::new(Fixed(vec![])), 0);
        assert_eq!(enumerator.capacity(), 1);
        assert_eq!(
            Enumerator::new(Arc::new(Fixed(vec![]))).capacity(),
            DEFAULT_RELAY_CAPACITY
        );
    }

    #[tokio::test]
    async fn stream_is_fused_after_success() {
        let enumerator = Enumerator::new(Arc::new(Fixed(vec![image("a")])));
        let scope = ExecutionScope::new("fused", Duration::from_secs(5));
        let mut run = enumerator.enumerate::<ImageSummary>(&scope, ListFilter::all());

        assert_eq!(run.next().await.map(|r| r.map(|i| i.id)), Some(Ok("a".to_owned())));
        assert!(run.next().await.is_none());
        assert!(run.is_terminated());
        assert!(run.next().await.is_none());
        assert!(run.producer_finished());
        assert_eq!(scope.state(), ScopeState::Completed);
    }

    #[tokio::test]
    async fn enumerate_marks_scope_active_immediately() {
        let enumerator = Enumerator::new(Arc::new(Fixed(vec![])));
        let scope = ExecutionScope::new("active", Duration::from_secs(5));
        let run = enumerator.enumerate::<ImageSummary>(&scope, ListFilter::all());
        assert_eq!(scope.state(), ScopeState::Active);
        assert_eq!(run.kind(), ResourceKind::Image);
        assert_eq!(run.collect_all().await.map(|v| v.len()), Ok(0));
    }
}
