//! Dispatch of the external updater engine.

use std::sync::Arc;

use log::{info, warn};

use crate::error::RuntimeError;
use crate::runtime::{ContainerRuntime, RunOnce};

/// Runs the updater engine image once against a named container.
#[derive(Clone)]
pub struct Updater {
    runtime: Arc<dyn ContainerRuntime>,
    image: String,
    api_version: String,
    socket: String,
}

impl Updater {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        image: impl Into<String>,
        api_version: impl Into<String>,
        socket: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            image: image.into(),
            api_version: api_version.into(),
            socket: socket.into(),
        }
    }

    /// Image reference of the updater engine.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Update `container_name`. A failed refresh of the updater image is
    /// tolerated; only a failure to run it is an error.
    pub async fn dispatch(&self, container_name: &str) -> Result<(), RuntimeError> {
        // An outdated updater negotiates an API version the engine may reject.
        info!("Pulling latest updater image: {}", self.image);
        if let Err(e) = self.runtime.pull_image(&self.image).await {
            warn!("Could not pull latest updater image, using local copy: {}", e);
        }

        self.runtime.run_once(self.request(container_name)).await?;
        info!("Updater finished for {}", container_name);
        Ok(())
    }

    fn request(&self, container_name: &str) -> RunOnce {
        RunOnce {
            image: self.image.clone(),
            command: vec!["--run-once".to_string(), container_name.to_string()],
            binds: vec![format!("{0}:{0}:rw", self.socket)],
            // Pin the API version the updater speaks to the engine.
            env: vec![format!("DOCKER_API_VERSION={}", self.api_version)],
        }
    }
}
