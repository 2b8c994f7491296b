//! Data structures used throughout the staleguard daemon.
//!
//! These types are the transient per-cycle copies of runtime state
//! ([`ContainerDetails`], [`ImageInfo`]) and the values the daemon hands
//! to its HTTP surface ([`ContainerRef`], [`CheckOutcome`]).  They are
//! serialised using [`serde`](https://serde.rs/) where they leave the
//! process.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::resolver;

/// Placeholder used for identities and timestamps that were never
/// resolved.
pub const NOT_AVAILABLE: &str = "n/a";

/// Placeholder for a creation timestamp the runtime did not report.
pub const UNKNOWN: &str = "Unknown";

/// Everything the daemon needs to know about a running container.
///
/// Produced by the runtime for every listing or lookup; the daemon
/// never keeps these across cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDetails {
    /// Full container ID.
    pub id: String,
    /// Display name without the leading slash.
    pub name: String,
    /// Runtime status such as `running`.
    pub status: String,
    /// ID of the image the container is currently running.
    pub image_id: String,
    /// Repository tags of that image, first tag preferred.
    pub image_tags: Vec<String>,
    /// Image reference recorded in the container's creation config.
    pub config_image: Option<String>,
    /// Creation timestamp of the running image.
    pub image_created: Option<String>,
}

impl ContainerDetails {
    /// Truncated container ID, as used for container hostnames.
    pub fn short_id(&self) -> &str {
        resolver::short_identity(&self.id)
    }

    /// Best-effort image reference, see [`resolver::image_reference`].
    pub fn image_reference(&self) -> String {
        resolver::image_reference(self).to_string()
    }
}

/// Identity and creation time of an image as reported by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    pub created: Option<String>,
}

/// Public view of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerRef {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub short_id: String,
}

impl From<&ContainerDetails> for ContainerRef {
    fn from(details: &ContainerDetails) -> Self {
        Self {
            id: details.id.clone(),
            name: details.name.clone(),
            image: details.image_reference(),
            status: details.status.clone(),
            short_id: details.short_id().to_string(),
        }
    }
}

/// A container together with its last cached check, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerView {
    #[serde(flatten)]
    pub container: ContainerRef,
    pub cached_result: Option<CheckOutcome>,
}

/// Result of one update check.
///
/// Only built through [`CheckOutcome::pulled`] and [`CheckOutcome::local`],
/// so a local image is never reported as an available update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub update_available: bool,
    pub is_local: bool,
    pub current_id_short: String,
    pub new_id_short: String,
    pub current_created: String,
    pub new_created: String,
    pub checked_at: DateTime<Utc>,
}

impl CheckOutcome {
    /// Outcome for an image that was pulled from its registry.
    pub fn pulled(current: &ImageInfo, latest: &ImageInfo) -> Self {
        Self {
            update_available: latest.id != current.id,
            is_local: false,
            current_id_short: resolver::short_identity(&current.id).to_string(),
            new_id_short: resolver::short_identity(&latest.id).to_string(),
            current_created: created_or(current, UNKNOWN),
            new_created: created_or(latest, UNKNOWN),
            checked_at: Utc::now(),
        }
    }

    /// Outcome for an image no registry could resolve.
    pub fn local(current: &ImageInfo) -> Self {
        Self {
            update_available: false,
            is_local: true,
            current_id_short: resolver::short_identity(&current.id).to_string(),
            new_id_short: NOT_AVAILABLE.to_string(),
            current_created: created_or(current, UNKNOWN),
            new_created: NOT_AVAILABLE.to_string(),
            checked_at: Utc::now(),
        }
    }

    /// Whether two outcomes agree on everything but the check time.
    #[cfg(test)]
    pub fn same_result(&self, other: &Self) -> bool {
        Self {
            checked_at: other.checked_at,
            ..self.clone()
        } == *other
    }
}

fn created_or(image: &ImageInfo, fallback: &str) -> String {
    image
        .created
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
