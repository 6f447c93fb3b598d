use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::registry::{MonitorRegistry, MonitorTicket};
use crate::client::RedditClientError;

/// One feed's fetch/diff/notify cycle, bound once when monitoring starts
#[async_trait]
pub trait PollTarget: Send + Sync + 'static {
    async fn poll(&self) -> Result<(), RedditClientError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    /// Sleep per active monitor between cycles
    pub base_delay: Duration,
    /// Wait before the first cycle, to stagger monitors started together
    pub start_delay: Duration,
}

impl PollSchedule {
    /// Delay before the next cycle when `active` monitors are registered
    pub fn delay_for(&self, active: usize) -> Duration {
        let factor = u32::try_from(active.max(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

pub fn spawn_monitor(
    registry: MonitorRegistry,
    ticket: MonitorTicket,
    predecessor: Option<JoinHandle<()>>,
    target: Arc<dyn PollTarget>,
    schedule: PollSchedule,
) -> JoinHandle<()> {
    tokio::spawn(run_monitor(registry, ticket, predecessor, target, schedule))
}

/// Poll until `ticket` is no longer the live registration for its key.
///
/// `predecessor` is the task of a stopped registration of the same key; it is awaited
/// first so the two never poll at once. A failed cycle keeps the previous snapshot and
/// the loop carries on; only an unrecognized feed ends it early.
pub async fn run_monitor(
    registry: MonitorRegistry,
    ticket: MonitorTicket,
    predecessor: Option<JoinHandle<()>>,
    target: Arc<dyn PollTarget>,
    schedule: PollSchedule,
) {
    if let Some(previous) = predecessor {
        debug!("Monitor {} waiting for its previous poll loop to exit", ticket.key());
        if let Err(err) = previous.await {
            warn!("Previous poll loop for {} ended abnormally: {}", ticket.key(), err);
        }
    }

    if !schedule.start_delay.is_zero() {
        debug!(
            "Monitor {} waiting {:?} before first poll",
            ticket.key(),
            schedule.start_delay
        );
        tokio::time::sleep(schedule.start_delay).await;
    }

    info!("Poll loop for {} running", ticket.key());
    let mut cycles: u64 = 0;

    while registry.is_current(&ticket) {
        cycles += 1;
        match target.poll().await {
            Ok(()) => debug!("Monitor {} completed cycle {}", ticket.key(), cycles),
            Err(RedditClientError::UnrecognizedFeed(feed)) => {
                error!("Monitor {} cannot poll unrecognized feed '{}'", ticket.key(), feed);
                break;
            }
            Err(err) => warn!(
                "Monitor {} cycle {} failed, keeping previous snapshot: {}",
                ticket.key(),
                cycles,
                err
            ),
        }

        tokio::time::sleep(schedule.delay_for(registry.count())).await;
    }

    info!("Poll loop for {} exited after {} cycles", ticket.key(), cycles);
}
