use crate::error::RuntimeError;
use crate::types::{ContainerDetails, ImageInfo};
use async_trait::async_trait;

pub mod docker;
pub use docker::DockerRuntime;

#[cfg(test)]
pub mod recording;

/// A one-shot helper container: started, awaited and removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOnce {
    pub image: String,
    pub command: Vec<String>,
    /// Bind mounts in `host:container:mode` form.
    pub binds: Vec<String>,
    /// Environment in `KEY=value` form.
    pub env: Vec<String>,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List the running containers.
    async fn list_running_containers(&self) -> Result<Vec<ContainerDetails>, RuntimeError>;

    /// Look up a single container by ID or name.
    async fn get_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError>;

    /// Pull `reference` from its registry and return the resulting image.
    /// Unresolvable references fail with `NotFound` or `Api`.
    async fn pull_image(&self, reference: &str) -> Result<ImageInfo, RuntimeError>;

    /// Run a helper container to completion.
    async fn run_once(&self, request: RunOnce) -> Result<(), RuntimeError>;
}
