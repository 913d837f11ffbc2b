use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};

use super::{ContainerProbe, HostProbe, Sampler, DEFAULT_FRAME_BUDGET, DEFAULT_WINDOW};
use crate::container_management::ContainerManagement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    pub interval: Duration,
    pub window: usize,
    pub frame_budget: Option<u64>,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            window: DEFAULT_WINDOW,
            frame_budget: Some(DEFAULT_FRAME_BUDGET),
        }
    }
}

/// Samples `container_id` every `settings.interval` and posts each new window
/// to `manager`. Returns once the frame budget is spent; aborting the task
/// cancels it and drops the buffer.
pub async fn run_sampler<C, H, M>(
    container_id: String,
    settings: SamplerSettings,
    probe: C,
    mut host: H,
    manager: Arc<Mutex<M>>,
) where
    C: ContainerProbe,
    H: HostProbe,
    M: ContainerManagement + Send,
{
    info!("Start sampling usage of container: {}", container_id);
    let mut sampler = Sampler::new(settings.window, settings.frame_budget);
    let mut ticker = time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if sampler.is_stopped() {
        // A zero budget still tells the view it has nothing to wait for.
        manager
            .lock()
            .await
            .update_usage(sampler.snapshot(&container_id));
    }

    while !sampler.is_stopped() {
        ticker.tick().await;
        let container = probe.container_usage(&container_id).await;
        let host_usage = host.sample();
        if sampler.record(container, host_usage).is_none() {
            break;
        }
        debug!("Usage tick {} for {}", sampler.ticks(), container_id);
        let snapshot = sampler.snapshot(&container_id);
        manager.lock().await.update_usage(snapshot);
    }
    info!(
        "Frame budget spent for {} after {} ticks",
        container_id,
        sampler.ticks()
    );
}
