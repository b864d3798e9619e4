//! Offline Detector
//!
//! Debounced reachability probing against the API's health endpoint, and the
//! tri-state operating mode derived from it.
//!
//! ```text
//! Online --(probe fails)--> AutoOffline --(probe succeeds)--> Online
//! StrictOffline --(explicit exit)--> Online   [never via probe]
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportRequest};

/// Path probed to decide reachability.
pub const HEALTH_PATH: &str = "/health";

// == Offline Mode ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OfflineMode {
    /// Normal operation with network access
    Online,
    /// Entered automatically after a failed probe; left after a good one
    AutoOffline,
    /// Forced by the operator; probes are skipped entirely
    StrictOffline,
}

impl fmt::Display for OfflineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfflineMode::Online => write!(f, "Online"),
            OfflineMode::AutoOffline => write!(f, "Auto-Offline"),
            OfflineMode::StrictOffline => write!(f, "Strict-Offline"),
        }
    }
}

// == Offline State ==
/// Mutable detector state, guarded by one lock.
#[derive(Debug, Clone)]
pub struct OfflineState {
    pub mode: OfflineMode,
    /// When the last probe finished; None until the first probe
    pub last_checked_at: Option<Instant>,
    /// Verdict of the last probe
    pub last_verdict: bool,
    pub network_timeout: Duration,
    pub debounce_window: Duration,
    pub auto_sync_interval: Duration,
}

/// Outcome of one health probe.
enum Probe {
    Reachable,
    Unreachable,
    TimedOut,
}

// == Offline Detector ==
/// Decides whether the remote API is reachable.
///
/// The probe runs while the state lock is held, so concurrent callers wait
/// for one probe instead of each issuing their own.
pub struct OfflineDetector {
    transport: Arc<dyn Transport>,
    state: Mutex<OfflineState>,
}

impl OfflineDetector {
    // == Constructor ==
    pub fn new(
        transport: Arc<dyn Transport>,
        network_timeout: Duration,
        debounce_window: Duration,
        auto_sync_interval: Duration,
    ) -> Self {
        Self {
            transport,
            state: Mutex::new(OfflineState {
                mode: OfflineMode::Online,
                last_checked_at: None,
                last_verdict: true,
                network_timeout,
                debounce_window,
                auto_sync_interval,
            }),
        }
    }

    // == Is Online ==
    /// Returns whether the API is reachable, probing at most once per
    /// debounce window.
    pub async fn is_online(&self) -> bool {
        self.check(None).await
    }

    /// Like [`is_online`](Self::is_online) but never waits past `deadline`
    /// for the probe. A probe cut short by the deadline returns false and
    /// leaves the recorded verdict and mode alone.
    pub async fn is_online_with_deadline(&self, deadline: Instant) -> bool {
        self.check(Some(deadline)).await
    }

    async fn check(&self, deadline: Option<Instant>) -> bool {
        let mut state = self.state.lock().await;

        if state.mode == OfflineMode::StrictOffline {
            return false;
        }

        if let Some(checked) = state.last_checked_at {
            if checked.elapsed() < state.debounce_window {
                return state.last_verdict;
            }
        }

        let mut timeout = state.network_timeout;
        let mut cut_short = false;
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < timeout {
                timeout = remaining;
                cut_short = true;
            }
        }

        // A probe stopped by the caller's deadline says nothing about the API
        let reachable = match self.probe(timeout).await {
            Probe::TimedOut if cut_short => {
                debug!("Caller deadline reached before the health probe finished");
                return false;
            }
            Probe::Reachable => true,
            Probe::Unreachable | Probe::TimedOut => false,
        };
        state.last_checked_at = Some(Instant::now());
        state.last_verdict = reachable;

        match (state.mode, reachable) {
            (OfflineMode::Online, false) => {
                warn!("Remote API unreachable, switching to offline mode");
                state.mode = OfflineMode::AutoOffline;
            }
            (OfflineMode::AutoOffline, true) => {
                info!("Remote API reachable again, switching to online mode");
                state.mode = OfflineMode::Online;
            }
            _ => {}
        }

        reachable
    }

    async fn probe(&self, timeout: Duration) -> Probe {
        if timeout.is_zero() {
            return Probe::TimedOut;
        }

        let request = TransportRequest::get(HEALTH_PATH).with_timeout(timeout);
        match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(Ok(response)) if response.is_success() => Probe::Reachable,
            Ok(Ok(response)) => {
                debug!(status = response.status_code, "Health probe returned an error status");
                Probe::Unreachable
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Health probe failed");
                Probe::Unreachable
            }
            Err(_) => {
                debug!(timeout_ms = timeout.as_millis() as u64, "Health probe timed out");
                Probe::TimedOut
            }
        }
    }

    /// Records a failed call made outside the detector, so later checks
    /// inside the debounce window see the API as down.
    pub async fn report_unreachable(&self) {
        let mut state = self.state.lock().await;
        if state.mode == OfflineMode::StrictOffline {
            return;
        }
        state.last_checked_at = Some(Instant::now());
        state.last_verdict = false;
        if state.mode == OfflineMode::Online {
            warn!("Remote API unreachable, switching to offline mode");
            state.mode = OfflineMode::AutoOffline;
        }
    }

    // == Strict Offline ==
    /// Forces offline operation regardless of connectivity.
    pub async fn enter_strict_offline(&self) {
        let mut state = self.state.lock().await;
        if state.mode != OfflineMode::StrictOffline {
            info!("Entering strict offline mode");
            state.mode = OfflineMode::StrictOffline;
        }
    }

    /// Leaves strict offline mode; the next check probes immediately.
    pub async fn exit_strict_offline(&self) {
        let mut state = self.state.lock().await;
        if state.mode == OfflineMode::StrictOffline {
            info!("Leaving strict offline mode");
            state.mode = OfflineMode::Online;
            state.last_checked_at = None;
            state.last_verdict = true;
        }
    }

    pub async fn mode(&self) -> OfflineMode {
        self.state.lock().await.mode
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> OfflineState {
        self.state.lock().await.clone()
    }

    pub async fn auto_sync_interval(&self) -> Duration {
        self.state.lock().await.auto_sync_interval
    }
}
