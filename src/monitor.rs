//! Operations offered to the HTTP surface and the scheduler.
//!
//! A [`Monitor`] is built once at startup and shared by reference; it owns
//! no state besides the result cache it hands to the checker.

use std::sync::Arc;

use log::info;
use serde_json::Value;

use crate::cache::ResultCache;
use crate::checker::UpdateChecker;
use crate::error::{CheckError, RuntimeError, SettingsError};
use crate::resolver;
use crate::runtime::ContainerRuntime;
use crate::settings::{Settings, SettingsStore};
use crate::types::{CheckOutcome, ContainerDetails, ContainerRef, ContainerView};
use crate::updater::Updater;

pub struct Monitor {
    runtime: Arc<dyn ContainerRuntime>,
    cache: Arc<ResultCache>,
    checker: UpdateChecker,
    updater: Updater,
    settings: Arc<dyn SettingsStore>,
    host_identity: String,
}

impl Monitor {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        updater: Updater,
        settings: Arc<dyn SettingsStore>,
        host_identity: impl Into<String>,
    ) -> Self {
        let cache = Arc::new(ResultCache::new());
        Self {
            checker: UpdateChecker::new(Arc::clone(&runtime), Arc::clone(&cache)),
            runtime,
            cache,
            updater,
            settings,
            host_identity: host_identity.into(),
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Running containers, minus this daemon and its updater helper.
    pub async fn eligible_containers(&self) -> Result<Vec<ContainerDetails>, RuntimeError> {
        let containers = self.runtime.list_running_containers().await?;
        Ok(containers
            .into_iter()
            .filter(|c| !resolver::is_self(c, &self.host_identity))
            .filter(|c| !resolver::is_updater(c, self.updater.image()))
            .collect())
    }

    /// Eligible containers with their cached check, if any.
    pub async fn list_containers(&self) -> Result<Vec<ContainerView>, RuntimeError> {
        let containers = self.eligible_containers().await?;
        let mut views = Vec::with_capacity(containers.len());
        for c in &containers {
            views.push(ContainerView {
                container: ContainerRef::from(c),
                cached_result: self.cache.get(&c.id).await,
            });
        }
        Ok(views)
    }

    pub async fn check(&self, id: &str) -> Result<CheckOutcome, CheckError> {
        self.checker.check(id).await
    }

    /// Run the updater against `container_name` and forget what was
    /// cached for it.
    pub async fn trigger_update(&self, container_name: &str) -> Result<(), RuntimeError> {
        self.updater.dispatch(container_name).await?;
        let evicted = self.cache.evict_name(container_name).await;
        info!(
            "Update triggered for {} ({} cached result(s) dropped)",
            container_name, evicted
        );
        Ok(())
    }

    /// Update a container found by the scheduler.
    pub async fn update_container(&self, container: &ContainerDetails) -> Result<(), RuntimeError> {
        self.updater.dispatch(&container.name).await?;
        self.cache.evict(&container.id).await;
        Ok(())
    }

    pub fn get_settings(&self) -> Settings {
        self.settings.load()
    }

    /// Apply a partial settings update and persist it.
    pub fn update_settings(&self, patch: &Value) -> Result<Settings, SettingsError> {
        let mut settings = self.settings.load();
        settings.apply(patch)?;
        if !self.settings.save(&settings) {
            return Err(SettingsError::SaveFailed);
        }
        Ok(settings)
    }
}
