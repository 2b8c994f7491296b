//! In-memory runtime recording every call, for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ContainerRuntime, RunOnce};
use crate::error::RuntimeError;
use crate::types::{ContainerDetails, ImageInfo};

/// What a pull of a given reference does.
#[derive(Debug, Clone)]
pub enum Pull {
    Image(ImageInfo),
    NotFound,
    Api,
    Broken,
}

#[derive(Default)]
struct Inner {
    containers: Mutex<Vec<ContainerDetails>>,
    pulls: Mutex<HashMap<String, Pull>>,
    pulled: Mutex<Vec<String>>,
    runs: Mutex<Vec<RunOnce>>,
    list_calls: Mutex<usize>,
    list_fails: Mutex<bool>,
    run_fails: Mutex<bool>,
}

#[derive(Clone, Default)]
pub struct RecordingRuntime {
    inner: Arc<Inner>,
}

impl RecordingRuntime {
    pub fn with_containers(containers: Vec<ContainerDetails>) -> Self {
        let runtime = Self::default();
        *runtime.inner.containers.lock().unwrap() = containers;
        runtime
    }

    pub fn set_pull(&self, reference: &str, pull: Pull) {
        self.inner
            .pulls
            .lock()
            .unwrap()
            .insert(reference.to_string(), pull);
    }

    pub fn fail_listing(&self, fail: bool) {
        *self.inner.list_fails.lock().unwrap() = fail;
    }

    pub fn fail_runs(&self, fail: bool) {
        *self.inner.run_fails.lock().unwrap() = fail;
    }

    pub fn pulled(&self) -> Vec<String> {
        self.inner.pulled.lock().unwrap().clone()
    }

    pub fn runs(&self) -> Vec<RunOnce> {
        self.inner.runs.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.inner.list_calls.lock().unwrap()
    }
}

/// A running container with a tagged image.
pub fn container(id: &str, name: &str, image: &str, image_id: &str) -> ContainerDetails {
    ContainerDetails {
        id: id.to_string(),
        name: name.to_string(),
        status: "running".to_string(),
        image_id: image_id.to_string(),
        image_tags: vec![image.to_string()],
        config_image: Some(image.to_string()),
        image_created: Some("2024-01-01T00:00:00Z".to_string()),
    }
}

/// An image as returned by a successful pull.
pub fn image(id: &str) -> ImageInfo {
    ImageInfo {
        id: id.to_string(),
        created: Some("2024-06-01T00:00:00Z".to_string()),
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn list_running_containers(&self) -> Result<Vec<ContainerDetails>, RuntimeError> {
        *self.inner.list_calls.lock().unwrap() += 1;
        if *self.inner.list_fails.lock().unwrap() {
            return Err(RuntimeError::Other("engine unreachable".into()));
        }
        Ok(self.inner.containers.lock().unwrap().clone())
    }

    async fn get_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        self.inner
            .containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id || c.name == id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(format!("no such container: {}", id)))
    }

    async fn pull_image(&self, reference: &str) -> Result<ImageInfo, RuntimeError> {
        self.inner
            .pulled
            .lock()
            .unwrap()
            .push(reference.to_string());
        let pull = self.inner.pulls.lock().unwrap().get(reference).cloned();
        match pull.unwrap_or(Pull::NotFound) {
            Pull::Image(info) => Ok(info),
            Pull::NotFound => Err(RuntimeError::NotFound(format!(
                "manifest for {} not found",
                reference
            ))),
            Pull::Api => Err(RuntimeError::Api {
                status: 500,
                message: "pull access denied".into(),
            }),
            Pull::Broken => Err(RuntimeError::Other("connection reset".into())),
        }
    }

    async fn run_once(&self, request: RunOnce) -> Result<(), RuntimeError> {
        if *self.inner.run_fails.lock().unwrap() {
            return Err(RuntimeError::Other("failed to create helper".into()));
        }
        self.inner.runs.lock().unwrap().push(request);
        Ok(())
    }
}
