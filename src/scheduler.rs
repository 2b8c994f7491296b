//! Unattended check cycles.
//!
//! The scheduler wakes up every tick, re-reads the settings and decides
//! whether a cycle is due.  Ticks are cheap and frequent so that settings
//! changes apply quickly; cycles are gated by the configured interval,
//! measured from the end of the previous cycle.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use log::{error, info, warn};
use tokio::time::{sleep, Instant};

use crate::monitor::Monitor;
use crate::policy::should_update;
use crate::settings::{CheckMode, Settings};

/// What one tick did.
#[derive(Debug, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Cycle(CycleReport),
    /// The containers could not be enumerated.
    Failed,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub failed: usize,
    pub updated: usize,
}

pub struct Scheduler {
    monitor: Arc<Monitor>,
    tick_interval: Duration,
    backoff: Duration,
    last_cycle: Option<Instant>,
}

impl Scheduler {
    pub fn new(monitor: Arc<Monitor>, tick_interval: Duration, backoff: Duration) -> Self {
        Self {
            monitor,
            tick_interval,
            backoff,
            last_cycle: None,
        }
    }

    /// Tick forever. A panicking tick is logged and followed by a longer
    /// pause instead of ending the worker.
    pub async fn run(mut self) {
        info!("Background worker started.");
        loop {
            let delay = match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(_) => self.tick_interval,
                Err(_) => {
                    error!(
                        "Critical worker error, retrying in {}s",
                        self.backoff.as_secs()
                    );
                    self.backoff
                }
            };
            sleep(delay).await;
        }
    }

    /// Run a cycle if one is due under the current settings.
    pub async fn tick(&mut self) -> Tick {
        let settings = self.monitor.get_settings();

        // Only background mode runs unattended; the other modes leave
        // checks to explicit requests.
        let due = match settings.check_mode {
            CheckMode::Manual | CheckMode::Startup => false,
            CheckMode::Background => {
                let interval = Duration::from_secs(settings.interval_secs());
                self.last_cycle.map_or(true, |last| last.elapsed() >= interval)
            }
        };
        if !due {
            return Tick::Idle;
        }

        info!("Background schedule: Starting check cycle...");
        match self.cycle(&settings).await {
            Some(report) => {
                self.last_cycle = Some(Instant::now());
                info!(
                    "Background cycle finished: {} checked, {} failed, {} updated, {} cached.",
                    report.checked,
                    report.failed,
                    report.updated,
                    self.monitor.cache().len().await
                );
                Tick::Cycle(report)
            }
            None => Tick::Failed,
        }
    }

    async fn cycle(&self, settings: &Settings) -> Option<CycleReport> {
        let containers = match self.monitor.eligible_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                error!("Error during container loop: {}", e);
                return None;
            }
        };

        let mut report = CycleReport::default();
        for c in &containers {
            let outcome = match self.monitor.check(&c.id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Failed to process {}: {}", c.name, e);
                    report.failed += 1;
                    continue;
                }
            };
            report.checked += 1;

            if !should_update(
                settings.auto_update_mode,
                &settings.auto_update_containers,
                &c.name,
                &outcome,
            ) {
                continue;
            }
            info!("Auto-Update triggered for {}", c.name);
            match self.monitor.update_container(c).await {
                Ok(()) => report.updated += 1,
                Err(e) => warn!("Failed to update {}: {}", c.name, e),
            }
        }
        Some(report)
    }
}
