//! Periodic idle check over all sessions.
//!
//! Thresholds are compared against wall-clock time at each sweep instead of
//! arming a timer per contact, so detection lags by up to one interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::replies;
use crate::clock::Clock;
use crate::config::BotConfig;
use crate::session::{Session, SharedSessions};
use crate::transport::PacedSender;

/// Idle thresholds for started sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlePolicy {
    pub warning_after: TimeDelta,
    pub close_after: TimeDelta,
}

impl IdlePolicy {
    /// Thresholds from config. Values beyond what `TimeDelta` holds saturate.
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            warning_after: seconds(config.warning_after_seconds),
            close_after: seconds(config.close_after_seconds),
        }
    }

    /// Decide what a sweep at `now` does to this session.
    pub fn evaluate(&self, session: &Session, now: DateTime<Utc>) -> IdleAction {
        if !session.started_by_client() {
            return IdleAction::Keep;
        }

        let idle = session.idle_for(now);
        if idle >= self.close_after {
            IdleAction::Close
        } else if idle >= self.warning_after && !session.idle_warning_sent() {
            IdleAction::Warn
        } else {
            IdleAction::Keep
        }
    }
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self::from_config(&BotConfig::default())
    }
}

fn seconds(value: u64) -> TimeDelta {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    Keep,
    Warn,
    Close,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub warned: usize,
    pub closed: usize,
}

/// Sends idle check-ins and closes abandoned sessions.
pub struct IdleSweeper {
    sessions: SharedSessions,
    sender: PacedSender,
    clock: Arc<dyn Clock>,
    policy: IdlePolicy,
}

impl IdleSweeper {
    pub fn new(
        sessions: SharedSessions,
        sender: PacedSender,
        clock: Arc<dyn Clock>,
        policy: IdlePolicy,
    ) -> Self {
        Self {
            sessions,
            sender,
            clock,
            policy,
        }
    }

    /// One pass over every session.
    pub async fn sweep(&self) -> SweepReport {
        let mut sessions = self.sessions.lock().await;
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for contact_id in sessions.contact_ids() {
            let action = match sessions.get(&contact_id) {
                Some(session) => self.policy.evaluate(session, now),
                None => continue,
            };

            match action {
                IdleAction::Keep => {}
                IdleAction::Close => {
                    sessions.remove(&contact_id);
                    report.closed += 1;
                    info!(contact_id = %contact_id, "Session closed after inactivity");
                    if let Err(e) = self.sender.notify(&contact_id, replies::IDLE_CLOSED).await {
                        warn!(contact_id = %contact_id, error = %e, "Failed to send closing notice");
                    }
                }
                IdleAction::Warn => {
                    if let Some(session) = sessions.get_mut(&contact_id) {
                        session.mark_warned();
                    }
                    report.warned += 1;
                    debug!(contact_id = %contact_id, "Sending idle check-in");
                    if let Err(e) = self.sender.notify(&contact_id, replies::IDLE_WARNING).await {
                        warn!(contact_id = %contact_id, error = %e, "Failed to send idle check-in");
                    }
                }
            }
        }

        report
    }

    /// Sweep every `interval` until `shutdown` flips to true.
    ///
    /// The first sweep happens one full interval after start.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(interval_secs = interval.as_secs(), "Idle sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let report = self.sweep().await;
                    if report != SweepReport::default() {
                        debug!(warned = report.warned, closed = report.closed, "Idle sweep finished");
                    }
                }
            }
        }

        info!("Idle sweeper stopped");
    }
}
