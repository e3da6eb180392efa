//! Image operations port.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::model::{ImageDeleteResponseItem, ImagePruneReport, ImageRemoveOptions};

/// State-changing image operations.
///
/// Each method is a single engine call. `image` may be an id, an id
/// prefix or a `repository:tag` reference, as the engine accepts.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Remove an image, or only untag it when `image` names one of several tags.
    async fn remove_image(
        &self,
        image: &str,
        options: ImageRemoveOptions,
    ) -> Result<Vec<ImageDeleteResponseItem>, EngineError>;

    /// Point `tag` (`repository[:tag]`) at `image`.
    async fn tag_image(&self, image: &str, tag: &str) -> Result<(), EngineError>;

    /// Delete dangling images no container uses.
    async fn prune_images(&self) -> Result<ImagePruneReport, EngineError>;
}
