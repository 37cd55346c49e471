//! Periodic tick driver and gateway heartbeat watch.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::schedule::ScheduleEngine;

/// Tracks gateway heartbeat meta-events; the expiry counter is armed by
/// each heartbeat and drained by the ticker.
pub struct HeartbeatWatch {
    enabled: bool,
    expire: AtomicI64,
    warned: AtomicBool,
}

impl HeartbeatWatch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            expire: AtomicI64::new(0),
            warned: AtomicBool::new(false),
        }
    }

    /// A heartbeat arrived with the given interval in seconds.
    pub fn beat(&self, interval_secs: i64) {
        self.expire.store(interval_secs, Ordering::Relaxed);
        self.warned.store(false, Ordering::Relaxed);
    }

    fn elapse(&self, secs: i64) {
        if self.expire.load(Ordering::Relaxed) > 0 {
            self.expire.fetch_sub(secs, Ordering::Relaxed);
        }
    }

    pub fn expired(&self) -> bool {
        self.enabled && self.expire.load(Ordering::Relaxed) <= 0
    }
}

/// Spawn the 1-second ticker driving the schedule engine. The tick
/// itself no-ops unless the wall-clock minute has advanced. Returns the
/// task handle so shutdown can await it with a bound.
pub fn spawn(
    engine: Arc<ScheduleEngine>,
    heartbeat: Arc<HeartbeatWatch>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    heartbeat.elapse(1);
                    if heartbeat.expired() && !heartbeat.warned.swap(true, Ordering::Relaxed) {
                        tracing::warn!("Gateway heartbeat expired");
                    }
                    engine.tick().await;
                }
                _ = shutdown.changed() => {
                    tracing::info!("Ticker stopped");
                    break;
                }
            }
        }
    })
}
