//! Resource source port.
//!
//! The listing side of an engine: one call per enumeration, returning a
//! stream of summaries for one resource kind.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::filter::ListFilter;
use crate::listing::Listing;
use crate::model::Resource;

/// Lists resources of kind `R`.
///
/// A driver implements this once per resource kind it serves, so a single
/// engine client is typically both a `ResourceSource<ImageSummary>` and a
/// `ResourceSource<NetworkResource>`.
///
/// Implementations may be slow and may fail; callers bound them with a
/// deadline. The returned [`Listing`] must not borrow from `self`.
#[async_trait]
pub trait ResourceSource<R: Resource>: Send + Sync {
    /// Start listing resources matching `filter`.
    ///
    /// An `Err` here means the engine failed before producing anything.
    async fn list(&self, filter: &ListFilter) -> Result<Listing<R>, EngineError>;
}
