//! The element stream a single list call hands back.

use futures::stream::{self, BoxStream, StreamExt};

use crate::error::EngineError;

/// Summaries produced by one list call, in engine order.
///
/// A listing may end early with an `Err` element when the engine fails
/// after it already produced some summaries; nothing follows that error.
pub type Listing<R> = BoxStream<'static, Result<R, EngineError>>;

/// Adapt a fully materialized engine answer.
pub fn from_vec<R: Send + 'static>(items: Vec<R>) -> Listing<R> {
    stream::iter(items.into_iter().map(Ok)).boxed()
}

/// A listing that yields `items` and then fails with `error`.
pub fn failing_after<R: Send + 'static>(items: Vec<R>, error: EngineError) -> Listing<R> {
    stream::iter(
        items
            .into_iter()
            .map(Ok)
            .chain(std::iter::once(Err(error))),
    )
    .boxed()
}
