//! Update detection for a single container.

use std::sync::Arc;

use log::{debug, info};

use crate::cache::ResultCache;
use crate::error::{CheckError, RuntimeError};
use crate::resolver::{image_reference, ImageReference};
use crate::runtime::ContainerRuntime;
use crate::types::{CheckOutcome, ImageInfo};

/// How a pull of the container's image reference ended, short of a hard
/// failure.
#[derive(Debug)]
enum PullOutcome {
    Pulled(ImageInfo),
    /// No registry knows the reference; the image only exists locally.
    Local(RuntimeError),
}

impl PullOutcome {
    fn classify(result: Result<ImageInfo, RuntimeError>) -> Result<Self, RuntimeError> {
        match result {
            Ok(image) => Ok(PullOutcome::Pulled(image)),
            Err(e) if e.is_unresolvable() => Ok(PullOutcome::Local(e)),
            Err(e) => Err(e),
        }
    }
}

/// Compares running images against their registries and records the
/// result.
#[derive(Clone)]
pub struct UpdateChecker {
    runtime: Arc<dyn ContainerRuntime>,
    cache: Arc<ResultCache>,
}

impl UpdateChecker {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, cache: Arc<ResultCache>) -> Self {
        Self { runtime, cache }
    }

    /// Check the container `id` (or name) for a newer image.
    pub async fn check(&self, id: &str) -> Result<CheckOutcome, CheckError> {
        let container = self.runtime.get_container(id).await?;
        let reference = match image_reference(&container) {
            ImageReference::Named(name) => name,
            ImageReference::Unknown => {
                return Err(CheckError::UnknownImage {
                    container: container.name,
                })
            }
        };
        let current = ImageInfo {
            id: container.image_id.clone(),
            created: container.image_created.clone(),
        };

        let outcome = match PullOutcome::classify(self.runtime.pull_image(&reference).await)? {
            PullOutcome::Pulled(latest) => {
                debug!("Pulled {} for {}: {}", reference, container.name, latest.id);
                CheckOutcome::pulled(&current, &latest)
            }
            PullOutcome::Local(reason) => {
                info!(
                    "Local detection: '{}' not found on registry ({}). Treating as local image.",
                    reference, reason
                );
                CheckOutcome::local(&current)
            }
        };

        self.cache
            .insert(&container.id, &container.name, outcome.clone())
            .await;
        Ok(outcome)
    }
}
