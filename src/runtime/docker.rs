use super::{ContainerRuntime, RunOnce};
use crate::error::RuntimeError;
use crate::resolver::split_reference;
use crate::types::{ContainerDetails, ImageInfo};
use anyhow::Result;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerWaitResponse, HostConfig};
use bollard::Docker;
use futures_util::stream::StreamExt;
use log::{debug, info, warn};

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self> {
        // Connect to the local Docker daemon using default settings.
        // This handles unix socket on Linux.
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    async fn start_and_wait(&self, id: &str, image: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        info!("Started helper container {} from {}", id, image);

        let opts = WaitContainerOptions {
            condition: "not-running".to_string(),
        };
        let mut stream = self.docker.wait_container(id, Some(opts));
        while let Some(result) = stream.next().await {
            helper_exit(id, result)?;
        }
        Ok(())
    }

    async fn inspect(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let detail = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        let image_id = detail.image.unwrap_or_default();
        let (image_tags, image_created) = match self.docker.inspect_image(&image_id).await {
            Ok(image) => (image.repo_tags.unwrap_or_default(), image.created),
            Err(e) => {
                debug!("Failed to inspect image {} of {}: {}", image_id, id, e);
                (Vec::new(), None)
            }
        };

        Ok(ContainerDetails {
            id: detail.id.unwrap_or_else(|| id.to_string()),
            name: detail
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            status: detail
                .state
                .and_then(|s| s.status)
                .map(|s| s.to_string())
                .unwrap_or_default(),
            image_id,
            image_tags,
            config_image: detail.config.and_then(|c| c.image),
            image_created,
        })
    }

    async fn image_info(&self, reference: &str) -> Result<ImageInfo, RuntimeError> {
        let image = self.docker.inspect_image(reference).await?;
        Ok(ImageInfo {
            id: image.id.unwrap_or_default(),
            created: image.created,
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_running_containers(&self) -> Result<Vec<ContainerDetails>, RuntimeError> {
        let opts = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(opts)).await?;

        let mut running = Vec::with_capacity(containers.len());
        for c in containers {
            let Some(id) = c.id else { continue };
            match self.inspect(&id).await {
                Ok(details) => running.push(details),
                // The container may have exited between listing and inspecting.
                Err(e) => warn!("Failed to inspect container {}: {}", id, e),
            }
        }
        Ok(running)
    }

    async fn get_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        self.inspect(id).await
    }

    async fn pull_image(&self, reference: &str) -> Result<ImageInfo, RuntimeError> {
        let (image, tag) = split_reference(reference);
        let options = CreateImageOptions {
            from_image: image.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        debug!("Pulling image {}", reference);
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            let info = result?;
            if let Some(status) = info.status {
                debug!("Pull {}: {}", reference, status);
            }
        }

        self.image_info(reference).await
    }

    async fn run_once(&self, request: RunOnce) -> Result<(), RuntimeError> {
        let config = Config {
            image: Some(request.image.clone()),
            cmd: Some(request.command),
            env: Some(request.env),
            host_config: Some(HostConfig {
                binds: Some(request.binds),
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await?;
        let id = created.id;

        // The helper is removed only after its exit code has been read, so
        // the wait never races the daemon's cleanup.
        let result = self.start_and_wait(&id, &request.image).await;

        let remove = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self.docker.remove_container(&id, Some(remove)).await {
            warn!("Failed to remove helper container {}: {}", id, e);
        }

        if result.is_ok() {
            debug!("Helper container {} finished", id);
        }
        result
    }
}

/// Interpret one item of a helper container's wait stream. Anything but a
/// zero exit code is a failure, including the container vanishing.
fn helper_exit(
    id: &str,
    result: Result<ContainerWaitResponse, DockerError>,
) -> Result<(), RuntimeError> {
    match result {
        Ok(exit) if exit.status_code != 0 => Err(RuntimeError::Other(format!(
            "helper container {} exited with code {}",
            id, exit.status_code
        ))),
        Ok(_) => Ok(()),
        Err(DockerError::DockerContainerWaitError { error, code }) => {
            Err(RuntimeError::Other(format!(
                "helper container {} exited with code {}: {}",
                id, code, error
            )))
        }
        Err(e) => Err(e.into()),
    }
}
