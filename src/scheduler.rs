//! Periodic world jobs: the energy sweep and the daily calendar advance.
//!
//! Both jobs are safe to run redundantly. Energy is always re-derivable from
//! elapsed time, so the sweep only keeps idle players' records current; the
//! calendar advance is a no-op until the next real (UTC) day starts. A failed
//! run is logged and simply retried at the next tick.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

use crate::realm::{CalendarSnapshot, RealmService, SweepReport};

/// Scheduler cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSchedulerConfig {
    /// Whether `start` runs the periodic jobs at all
    pub enabled: bool,
    /// Seconds between energy sweeps over every player
    pub energy_sweep_secs: u64,
    /// Seconds between checks for a new real day
    pub calendar_check_secs: u64,
}

impl Default for WorldSchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_sweep_secs: 300,
            calendar_check_secs: 60,
        }
    }
}

/// What one scheduler tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub sweep: Option<SweepReport>,
    pub calendar: Option<CalendarSnapshot>,
}

/// Scheduler state tracker
pub struct WorldScheduler {
    config: WorldSchedulerConfig,
    last_sweep: Option<DateTime<Utc>>,
}

impl WorldScheduler {
    pub fn new(config: WorldSchedulerConfig) -> Self {
        Self {
            config,
            last_sweep: None,
        }
    }

    pub fn config(&self) -> &WorldSchedulerConfig {
        &self.config
    }

    fn sweep_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_sweep {
            None => true,
            Some(last) => now - last >= ChronoDuration::seconds(self.config.energy_sweep_secs as i64),
        }
    }

    /// Run whatever is due at `now`.
    ///
    /// The calendar advance is attempted on every tick because it is
    /// idempotent per real day. The energy sweep runs once per
    /// `energy_sweep_secs`.
    pub fn tick(&mut self, realm: &RealmService, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        match realm.advance_calendar(now) {
            Ok((snapshot, true)) => {
                info!("New day in the realm: {}", snapshot);
                report.calendar = Some(snapshot);
            }
            Ok((_, false)) => {}
            Err(e) => warn!("Calendar advance failed, retrying next tick: {}", e),
        }

        if self.sweep_due(now) {
            match realm.sweep_energy(now) {
                Ok(sweep) => {
                    debug!(
                        "Energy sweep: {} player(s), {} credited, {} failed",
                        sweep.players, sweep.credited, sweep.failed
                    );
                    self.last_sweep = Some(now);
                    report.sweep = Some(sweep);
                }
                Err(e) => warn!("Energy sweep failed, retrying next tick: {}", e),
            }
        }

        report
    }

    /// Tick on a fixed interval until `shutdown` flips to true.
    pub async fn run(mut self, realm: RealmService, mut shutdown: watch::Receiver<bool>) {
        if !self.config.enabled {
            info!("World scheduler disabled by configuration");
            return;
        }
        let period = Duration::from_secs(
            self.config
                .calendar_check_secs
                .min(self.config.energy_sweep_secs)
                .max(1),
        );
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            "World scheduler running (sweep every {}s, calendar check every {}s)",
            self.config.energy_sweep_secs, self.config.calendar_check_secs
        );
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(&realm, Utc::now());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("World scheduler stopping");
                        break;
                    }
                }
            }
        }
    }
}
