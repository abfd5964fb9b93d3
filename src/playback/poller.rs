//! Position polling while media plays

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;

use super::model::PlaybackModel;
use crate::audio::engine::PlaybackEngine;
use crate::audio::types::PlaybackState;

/// Spawns at most one refresh loop at a time on the given runtime.
pub struct Poller {
    runtime: Handle,
    interval: Duration,
    active: Arc<AtomicBool>,
    loops_started: Arc<AtomicUsize>,
}

impl Poller {
    pub fn new(runtime: Handle, interval: Duration) -> Self {
        Self {
            runtime,
            interval,
            active: Arc::new(AtomicBool::new(false)),
            loops_started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Number of loops spawned over the poller's lifetime.
    #[cfg(test)]
    pub(crate) fn loops_started(&self) -> usize {
        self.loops_started.load(Ordering::Relaxed)
    }

    /// Start the loop unless one is already running.
    pub fn start(&self, engine: Arc<dyn PlaybackEngine>, model: Arc<PlaybackModel>) {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Position poller already running");
            return;
        }
        self.loops_started.fetch_add(1, Ordering::Relaxed);

        let active = Arc::clone(&self.active);
        let interval = self.interval;
        self.runtime
            .spawn(run(engine, model, interval, active));
    }
}

async fn run(
    engine: Arc<dyn PlaybackEngine>,
    model: Arc<PlaybackModel>,
    interval: Duration,
    active: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        while model.state() == PlaybackState::Playing {
            model.refresh_position(&*engine);
            ticker.tick().await;
            model.sync_state(&*engine);
        }
        model.refresh_position(&*engine);

        active.store(false, Ordering::Release);
        // play() may have re-entered Playing after the last check but before
        // the flag was cleared, in which case it relied on this loop.
        if model.state() == PlaybackState::Playing
            && active
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            continue;
        }
        break;
    }
    log::info!("Stopped updating timestamp and waveform index");
}
