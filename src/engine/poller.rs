//! Polling Engine
//!
//! Drives the fast tick (token renewal, active calls, per-trunk gauges)
//! and the slow tick (system status gauges) on a single task, so ticks
//! never overlap and the session needs no locking.

use super::supervisor::{EngineEvent, EngineState, Supervisor};
use super::tally::{TrunkBook, TrunkTally};
use crate::classifier::CallClassifier;
use crate::config::{Config, PabxConfig, PollingConfig};
use crate::error::{AuthError, FetchError};
use crate::metrics::{Gauge, MetricsSink};
use crate::pabx::{PabxClient, SystemSnapshot};
use crate::session::{Session, SessionManager};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// `error` label values of the error-capture gauge
pub const OP_LOGIN: &str = "login";
pub const OP_REFRESH: &str = "getRefreshToken";
pub const OP_ACTIVE_CALLS: &str = "getActiveCalls";
pub const OP_SYSTEM_STATUS: &str = "getSystemInfo";
pub const OP_CLASSIFY: &str = "classifyCall";

/// What a fast tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastTickOutcome {
    /// Renewal was due and failed; nothing fetched
    RenewalFailed,
    Polled {
        /// Server-reported concurrent calls
        total: u64,
        classified: usize,
        unparsable: usize,
    },
}

/// Session, timers and gauge writes for one PABX
pub struct PollingEngine {
    client: PabxClient,
    sessions: SessionManager,
    classifier: CallClassifier,
    sink: Arc<dyn MetricsSink>,
    pabx: PabxConfig,
    polling: PollingConfig,
    session: Session,
    trunks: TrunkBook,
    supervisor: Supervisor,
}

impl PollingEngine {
    /// Create an engine; no request is made until [`run`](Self::run) or
    /// [`bootstrap`](Self::bootstrap)
    pub fn new(config: &Config, sink: Arc<dyn MetricsSink>) -> crate::Result<Self> {
        let client = PabxClient::new(&config.pabx.base_url, config.pabx.request_timeout)?;

        Ok(Self {
            sessions: SessionManager::new(client.clone()),
            client,
            classifier: CallClassifier::new(config.pabx.trunk_id_length),
            sink,
            pabx: config.pabx.clone(),
            polling: config.polling.clone(),
            session: Session::unauthenticated(Instant::now()),
            trunks: TrunkBook::new(),
            supervisor: Supervisor::new(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.supervisor.state()
    }

    pub fn restarts(&self) -> u64 {
        self.supervisor.restarts()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Log in and move the supervisor out of `Bootstrapping`
    pub async fn bootstrap(&mut self) -> Result<(), AuthError> {
        let now = Instant::now();

        match self.sessions.login(&self.pabx.username, &self.pabx.password, now).await {
            Ok(session) => {
                self.session = session;
                self.record_outcome(OP_LOGIN, true);
                info!("Token successfully obtained");
                self.supervisor.handle(EngineEvent::LoginSucceeded);
                Ok(())
            }
            Err(e) => {
                self.session = Session::unauthenticated(now);
                self.record_outcome(OP_LOGIN, false);
                self.supervisor.handle(EngineEvent::LoginFailed);
                Err(e)
            }
        }
    }

    /// Run until shutdown. Returns the login error if the very first login
    /// fails; every later failure is absorbed by the restart policy.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), AuthError> {
        info!(base_url = %self.client.base_url(), "Starting PABX polling engine");

        loop {
            match self.supervisor.state() {
                EngineState::Bootstrapping => {
                    let result = tokio::select! {
                        result = self.bootstrap() => Some(result),
                        _ = shutdown.recv() => None,
                    };

                    match result {
                        None => {
                            self.supervisor.handle(EngineEvent::ShutdownRequested);
                        }
                        Some(Ok(())) => {}
                        Some(Err(e)) if !self.supervisor.has_bootstrapped() => {
                            error!(operation = OP_LOGIN, error = %e, "Could not obtain initial token");
                            return Err(e);
                        }
                        Some(Err(e)) => {
                            error!(
                                operation = OP_LOGIN,
                                error = %e,
                                backoff = ?self.polling.restart_backoff,
                                "Re-login failed, retrying after backoff"
                            );
                        }
                    }
                }
                EngineState::Running => {
                    let event = self.poll(&mut shutdown).await;
                    self.supervisor.handle(event);
                }
                EngineState::Faulted => {
                    let event = tokio::select! {
                        _ = time::sleep(self.polling.restart_backoff) => EngineEvent::BackoffElapsed,
                        _ = shutdown.recv() => EngineEvent::ShutdownRequested,
                    };
                    self.supervisor.handle(event);
                }
                EngineState::Stopped => {
                    info!("Polling engine stopped");
                    return Ok(());
                }
            }
        }
    }

    /// Arm both timers and tick until a fast tick fails or shutdown
    async fn poll(&mut self, shutdown: &mut broadcast::Receiver<()>) -> EngineEvent {
        let fast = self.polling.fast_interval;
        let mut fast_timer = time::interval_at(time::Instant::now() + fast, fast);
        fast_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First slow tick fires immediately
        let mut slow_timer = time::interval(self.polling.slow_interval);
        slow_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            fast_interval = ?self.polling.fast_interval,
            slow_interval = ?self.polling.slow_interval,
            "Polling timers armed"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => return EngineEvent::ShutdownRequested,
                _ = fast_timer.tick() => {
                    if let Err(e) = self.fast_tick().await {
                        if e.is_unauthorized() {
                            warn!(
                                error = %e,
                                backoff = ?self.polling.restart_backoff,
                                "Access token rejected, logging in again after backoff"
                            );
                        } else {
                            error!(
                                operation = OP_ACTIVE_CALLS,
                                error = %e,
                                backoff = ?self.polling.restart_backoff,
                                "Error updating metrics, restarting after backoff"
                            );
                        }
                        return EngineEvent::TickFailed;
                    }
                }
                _ = slow_timer.tick() => {
                    if let Err(e) = self.slow_tick().await {
                        warn!(operation = OP_SYSTEM_STATUS, error = %e, "System status not updated this cycle");
                    }
                }
            }
        }
    }

    /// Renew the token if due, then publish active-call and per-trunk gauges
    pub async fn fast_tick(&mut self) -> Result<FastTickOutcome, FetchError> {
        let now = Instant::now();

        if self.session.is_renewal_due(now, self.polling.renewal_interval) {
            match self.sessions.refresh(&self.session, now).await {
                Ok(session) => {
                    self.session = session;
                    self.record_outcome(OP_REFRESH, true);
                    info!("Token successfully renewed");
                }
                Err(e) => {
                    // Keep the last-known token; a 401 will surface real expiry
                    self.record_outcome(OP_REFRESH, false);
                    error!(
                        operation = OP_REFRESH,
                        error = %e,
                        retry_in = ?self.polling.fast_interval,
                        "Error renewing token, skipping this tick"
                    );
                    return Ok(FastTickOutcome::RenewalFailed);
                }
            }
        }

        let access_token = self
            .session
            .access_token()
            .ok_or(FetchError::Unauthenticated)?
            .to_string();

        let page = match self.client.active_calls(&access_token, self.pabx.active_calls_top).await {
            Ok(page) => page,
            Err(e) => {
                self.record_outcome(OP_ACTIVE_CALLS, false);
                return Err(FetchError::ActiveCalls(e));
            }
        };

        let total = page.total();
        self.sink.set(Gauge::ActiveCalls, total as f64);

        let (records, malformed) = page.records();
        for bad in &malformed {
            warn!(record = %bad.raw, error = %bad.error, "Dropping undecodable active call entry");
        }

        let mut batch = self.classifier.classify_all(&records);
        batch.unparsable += malformed.len();
        self.record_outcome(OP_CLASSIFY, batch.unparsable == 0);

        let tally = TrunkTally::from_calls(&batch.calls);
        for (trunk, count) in self.trunks.apply(&tally) {
            self.sink.set_labeled(Gauge::TrunkCalls, &[trunk.as_str()], count as f64);
        }

        self.record_outcome(OP_ACTIVE_CALLS, true);
        debug!(
            total,
            talking = batch.calls.len(),
            not_talking = batch.not_talking,
            unparsable = batch.unparsable,
            trunks = tally.len(),
            "Active calls updated"
        );

        Ok(FastTickOutcome::Polled {
            total,
            classified: batch.calls.len(),
            unparsable: batch.unparsable,
        })
    }

    /// Fetch the system snapshot and publish one gauge per field
    pub async fn slow_tick(&mut self) -> Result<(), FetchError> {
        let access_token = self
            .session
            .access_token()
            .ok_or(FetchError::Unauthenticated)?
            .to_string();

        match self.client.system_status(&access_token).await {
            Ok(snapshot) => {
                self.publish_system_snapshot(&snapshot);
                self.record_outcome(OP_SYSTEM_STATUS, true);
                debug!(snapshot = ?snapshot, "System information updated");
                Ok(())
            }
            Err(e) => {
                self.record_outcome(OP_SYSTEM_STATUS, false);
                Err(FetchError::SystemStatus(e))
            }
        }
    }

    fn publish_system_snapshot(&self, snapshot: &SystemSnapshot) {
        self.sink.set(Gauge::MaxSimultaneousCalls, snapshot.max_sim_calls);
        self.sink.set(Gauge::DiskUsage, snapshot.disk_usage);
        self.sink.set_labeled(
            Gauge::SystemInfo,
            &[
                snapshot.version.as_str(),
                snapshot.os.as_str(),
                snapshot.ip.as_str(),
                snapshot.fqdn.as_str(),
            ],
            1.0,
        );
        self.sink.set(Gauge::RegisteredTrunks, snapshot.trunks_registered);
        self.sink.set(Gauge::TotalTrunks, snapshot.trunks_total);
        self.sink.set(Gauge::RegisteredExtensions, snapshot.extensions_registered);
        self.sink.set(Gauge::TotalExtensions, snapshot.extensions_total);
        self.sink.set(Gauge::DiskUsageRecording, snapshot.recording_usage_percent());
        self.sink.set(Gauge::DiskUsageChat, snapshot.chat_used_space);
        self.sink.set(Gauge::DiskUsageLog, snapshot.log_used_space);
    }

    fn record_outcome(&self, operation: &str, healthy: bool) {
        let value = if healthy { 0.0 } else { 1.0 };
        self.sink.set_labeled(Gauge::ErrorCapture, &[operation], value);
    }
}
