//! ExpirationSweeper - background task enforcing the idle timeout.
//!
//! Each pass asks the store for ACTIVE sessions idle since
//! `now - idle_timeout` and expires them one by one. The store re-checks
//! the idle predicate under its row lock, so a touch racing the sweep wins
//! and duplicate passes (from this or another replica) are no-ops.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 5 min | Time between passes |
//!
//! ## Shutdown
//!
//! [`ExpirationSweeper::run`] stops when the watch channel flips to `true`.
//! A pass in flight is finished first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::session::{ChangeOutcome, SessionChange, SessionError};

use super::gateway::SessionGateway;

/// Configuration for the ExpirationSweeper.
#[derive(Debug, Clone)]
pub struct ExpirationSweeperConfig {
    /// Time between sweep passes.
    pub interval: Duration,
}

impl Default for ExpirationSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
        }
    }
}

impl ExpirationSweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Summary of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates returned by the idle query.
    pub scanned: usize,
    /// Sessions moved to EXPIRED by this pass.
    pub expired: usize,
    /// Candidates that were touched or closed before the pass reached them.
    pub skipped: usize,
    /// Candidates whose expiry failed; retried next pass.
    pub failed: usize,
}

/// Periodic idle-timeout enforcement.
#[derive(Debug, Clone)]
pub struct ExpirationSweeper {
    gateway: SessionGateway,
    config: ExpirationSweeperConfig,
    running: Arc<AtomicBool>,
}

impl ExpirationSweeper {
    pub fn new(gateway: SessionGateway) -> Self {
        Self::with_config(gateway, ExpirationSweeperConfig::default())
    }

    pub fn with_config(gateway: SessionGateway, config: ExpirationSweeperConfig) -> Self {
        Self {
            gateway,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the sweep loop until the shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = self.config.interval.as_secs(), "Expiration sweeper started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Expiration sweeper stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        warn!(error = %e, "Sweep pass failed");
                    }
                }
            }
        }
    }

    /// Run exactly one sweep pass.
    ///
    /// Returns `None` when another pass on this sweeper is still running.
    pub async fn sweep_once(&self) -> Result<Option<SweepReport>, SessionError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous sweep still running, skipping tick");
            return Ok(None);
        }

        let result = self.sweep().await;
        self.running.store(false, Ordering::Release);
        result.map(Some)
    }

    async fn sweep(&self) -> Result<SweepReport, SessionError> {
        let idle_timeout = self.gateway.policy().idle_timeout;
        let cutoff = self.gateway.now().minus(idle_timeout);
        let candidates = self.gateway.store().find_expired_active(cutoff).await?;

        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for candidate in candidates {
            let id = candidate.session_id();
            match self
                .gateway
                .apply(id, SessionChange::Expire { idle_timeout })
                .await
            {
                Ok(stored) if stored.outcome == ChangeOutcome::Changed => {
                    info!(
                        session_id = %id,
                        user_id = %stored.record.user_id(),
                        duration_seconds = stored.record.duration_seconds().unwrap_or_default(),
                        "Session expired"
                    );
                    report.expired += 1;
                }
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    warn!(session_id = %id, error = %e, "Failed to expire session");
                    report.failed += 1;
                }
            }
        }

        if report.scanned > 0 {
            info!(
                scanned = report.scanned,
                expired = report.expired,
                skipped = report.skipped,
                failed = report.failed,
                "Sweep pass complete"
            );
        }
        Ok(report)
    }
}
