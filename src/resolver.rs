//! Image identity helpers.
//!
//! Resolving a human readable image reference for a container, shortening
//! image and container identities for display, and recognising the
//! containers the daemon must never check (itself and its updater helper).

use std::fmt;

use crate::types::ContainerDetails;

/// Length of a shortened identity.
const SHORT_ID_LEN: usize = 12;

/// Marker rendered for containers whose image reference is unknown.
pub const UNKNOWN_IMAGE: &str = "unknown-image";

/// Image reference of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    Named(String),
    /// Neither tags nor creation config name the image. Such a container
    /// cannot be checked.
    Unknown,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::Named(name) => f.write_str(name),
            ImageReference::Unknown => f.write_str(UNKNOWN_IMAGE),
        }
    }
}

/// Resolve the image reference of a container.
///
/// The first tag of the running image wins; otherwise the reference the
/// container was created from is used.
pub fn image_reference(container: &ContainerDetails) -> ImageReference {
    container
        .image_tags
        .iter()
        .find(|tag| !tag.is_empty())
        .or(container.config_image.as_ref().filter(|i| !i.is_empty()))
        .map(|name| ImageReference::Named(name.clone()))
        .unwrap_or(ImageReference::Unknown)
}

/// Shorten an identity such as `sha256:0123…` to its first twelve
/// characters after the last `:`.
pub fn short_identity(id: &str) -> &str {
    let id = id.rsplit(':').next().unwrap_or(id);
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Split an image reference into repository and tag (or digest).
///
/// Registry ports (`localhost:5000/app`) are not mistaken for tags and a
/// missing tag means `latest`.
pub fn split_reference(image: &str) -> (&str, &str) {
    if let Some(at) = image.find('@') {
        return (&image[..at], &image[at + 1..]);
    }
    if let Some(colon) = image.rfind(':') {
        let tag = &image[colon + 1..];
        if !tag.contains('/') {
            return (&image[..colon], tag);
        }
    }
    (image, "latest")
}

/// Name of an image without registry, namespace or tag
/// (`containrrr/watchtower:latest` becomes `watchtower`).
pub fn base_name(image: &str) -> &str {
    let (repository, _) = split_reference(image);
    repository.rsplit('/').next().unwrap_or(repository)
}

/// Whether `container` is the container this process runs in.
///
/// Relies on the container hostname being its short ID, which holds for
/// default Docker networking only.
pub fn is_self(container: &ContainerDetails, host_identity: &str) -> bool {
    let short_id = container.short_id();
    !short_id.is_empty() && host_identity.contains(short_id)
}

/// Whether `container` runs the updater engine itself.
pub fn is_updater(container: &ContainerDetails, updater_image: &str) -> bool {
    let engine = base_name(updater_image);
    !engine.is_empty() && container.image_reference().contains(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(tags: &[&str], config_image: Option<&str>) -> ContainerDetails {
        ContainerDetails {
            id: "4f1c2d3e4b5a69788796a5b4c3d2e1f0".into(),
            name: "web".into(),
            image_tags: tags.iter().map(|t| t.to_string()).collect(),
            config_image: config_image.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn first_tag_wins() {
        let c = container(&["nginx:1.27", "nginx:latest"], Some("nginx"));
        assert_eq!(
            image_reference(&c),
            ImageReference::Named("nginx:1.27".into())
        );
    }

    #[test]
    fn falls_back_to_creation_config() {
        let c = container(&[], Some("registry.local/app:dev"));
        assert_eq!(c.image_reference(), "registry.local/app:dev");
    }

    #[test]
    fn unknown_when_nothing_names_the_image() {
        let c = container(&[], Some(""));
        assert_eq!(image_reference(&c), ImageReference::Unknown);
        assert_eq!(c.image_reference(), UNKNOWN_IMAGE);
    }

    #[test]
    fn short_identity_strips_algorithm() {
        assert_eq!(
            short_identity("sha256:0123456789abcdef0123456789"),
            "0123456789ab"
        );
        assert_eq!(short_identity("abc"), "abc");
        assert_eq!(short_identity(""), "");
    }

    #[test]
    fn split_reference_handles_ports_and_digests() {
        assert_eq!(split_reference("nginx"), ("nginx", "latest"));
        assert_eq!(split_reference("nginx:1.27"), ("nginx", "1.27"));
        assert_eq!(
            split_reference("localhost:5000/app"),
            ("localhost:5000/app", "latest")
        );
        assert_eq!(
            split_reference("localhost:5000/app:v2"),
            ("localhost:5000/app", "v2")
        );
        assert_eq!(
            split_reference("app@sha256:abcd"),
            ("app", "sha256:abcd")
        );
    }

    #[test]
    fn base_name_drops_namespace_and_tag() {
        assert_eq!(base_name("containrrr/watchtower"), "watchtower");
        assert_eq!(base_name("ghcr.io/org/watchtower:1.7"), "watchtower");
    }

    #[test]
    fn self_detection_matches_hostname() {
        let c = container(&["nginx"], None);
        assert!(is_self(&c, "4f1c2d3e4b5a"));
        assert!(!is_self(&c, "build-host"));

        let anonymous = ContainerDetails::default();
        assert!(!is_self(&anonymous, "anything"));
    }

    #[test]
    fn updater_detection_matches_engine_name() {
        let c = container(&["containrrr/watchtower:latest"], None);
        assert!(is_updater(&c, "containrrr/watchtower"));
        let c = container(&["nginx:latest"], None);
        assert!(!is_updater(&c, "containrrr/watchtower"));
    }
}
