use crate::prelude::*;

use crate::coordinator::Coordinator;

/// Publishes the two refresh commands on a fixed interval so the inverter
/// keeps reporting even when nothing else asks.
#[derive(Clone)]
pub struct Scheduler {
    config: ConfigWrapper,
    coordinator: Coordinator,
}

impl Scheduler {
    pub fn new(config: ConfigWrapper, coordinator: Coordinator) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let Some(scheduler) = self.config.scheduler() else {
            info!("scheduler not configured, skipping");
            return Ok(());
        };
        if !scheduler.enabled() {
            info!("scheduler disabled, skipping");
            return Ok(());
        }

        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(scheduler.interval_secs()));

        loop {
            interval.tick().await;

            if let Err(e) = self.coordinator.request_refresh() {
                error!("refresh request failed: {:?}", e);
            }
        }
    }
}
