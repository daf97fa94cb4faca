// ── Simulated measurement session ──
//
// idle → ping → download → upload → complete → idle
//
// One tokio task drives the phases. Transfer phases spawn a ticker that
// publishes the live speed; the session owns exactly one ticker at a time
// through its timer slot, and installing a new one cancels the old.
//
// The phase work runs in its own task under a supervisor, so a panic or a
// failed commit still brings the session back to idle.

mod profile;

pub use profile::{SessionProfile, TransferProfile};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::result::Figures;
use crate::model::{Server, TestResult};
use crate::storage::KeyValueStore;
use crate::store::{ResultStore, SettingsStore};

// ── Phase ────────────────────────────────────────────────────────

/// Session phase, observable by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Ping,
    Download,
    Upload,
    Complete,
}

impl Phase {
    /// Status line shown by the landing surface.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready to test",
            Self::Ping => "Measuring latency...",
            Self::Download => "Measuring download speed...",
            Self::Upload => "Measuring upload speed...",
            Self::Complete => "Test complete!",
        }
    }

    /// Whether the live speed is meaningful in this phase.
    pub fn is_transfer(self) -> bool {
        matches!(self, Self::Download | Self::Upload)
    }
}

// ── Session ──────────────────────────────────────────────────────

/// Handle to the measurement state machine.
///
/// Cheaply cloneable. At most one run is active at a time; `start` while
/// running is a no-op. Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    profile: SessionProfile,
    history: ResultStore,
    settings: SettingsStore,
    phase: watch::Sender<Phase>,
    live_speed: watch::Sender<f64>,
    last_result: watch::Sender<Option<TestResult>>,
    /// Why the most recent run produced no result, if it failed.
    failure: Mutex<Option<CoreError>>,
    rng: Mutex<StdRng>,
    active: Mutex<Option<ActiveRun>>,
    timer: Mutex<Option<Ticker>>,
}

/// The task driving the current run.
struct ActiveRun {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// The repeating tick of the current transfer phase.
struct Ticker {
    cancel: CancellationToken,
    task: JoinHandle<f64>,
}

impl Session {
    pub fn new(storage: Arc<dyn KeyValueStore>, profile: SessionProfile) -> Self {
        Self::with_rng(storage, profile, StdRng::from_entropy())
    }

    /// Deterministic randomness, for reproducible runs.
    pub fn with_seed(storage: Arc<dyn KeyValueStore>, profile: SessionProfile, seed: u64) -> Self {
        Self::with_rng(storage, profile, StdRng::seed_from_u64(seed))
    }

    fn with_rng(storage: Arc<dyn KeyValueStore>, profile: SessionProfile, rng: StdRng) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        let (live_speed, _) = watch::channel(0.0);
        let (last_result, _) = watch::channel(None);

        Self {
            inner: Arc::new(SessionInner {
                profile,
                history: ResultStore::new(storage.clone()),
                settings: SettingsStore::new(storage),
                phase,
                live_speed,
                last_result,
                failure: Mutex::new(None),
                rng: Mutex::new(rng),
                active: Mutex::new(None),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn profile(&self) -> &SessionProfile {
        &self.inner.profile
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Begin a run. Returns `false` and changes nothing if one is active.
    ///
    /// The server identity is resolved from settings here, once, and
    /// attached to the result by value.
    pub fn start(&self) -> bool {
        let claimed = self.inner.phase.send_if_modified(|phase| {
            if *phase == Phase::Idle {
                *phase = Phase::Ping;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug!("start ignored: session already running");
            return false;
        }

        let prefs = self.inner.settings.load();
        let server = self.inner.settings.selected_server();
        debug!(
            server = %server,
            mode = %prefs.default_connection_mode,
            "session started"
        );

        self.inner.last_result.send_replace(None);
        self.inner.live_speed.send_replace(0.0);
        lock(&self.inner.failure).take();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            Arc::clone(&self.inner),
            server,
            cancel.clone(),
        ));
        *lock(&self.inner.active) = Some(ActiveRun { cancel, task });
        true
    }

    /// Start a run and wait for it to finish.
    ///
    /// Returns `Ok(None)` if a run was already active or this one was torn
    /// down. A result that could not be committed to history is an error,
    /// as is a run whose task died.
    pub async fn run(&self) -> Result<Option<TestResult>, CoreError> {
        let mut phase = self.phase();
        if !self.start() {
            return Ok(None);
        }
        let _ = phase.wait_for(|p| *p == Phase::Idle).await;

        let failure = lock(&self.inner.failure).take();
        match failure {
            Some(e) => Err(e),
            None => Ok(self.last_result()),
        }
    }

    /// Abandon the active run, if any.
    ///
    /// Cancels the run task and its ticker and waits for both to stop, so
    /// no live-speed update is published after this returns. Nothing is
    /// committed to history.
    pub async fn teardown(&self) {
        let run = lock(&self.inner.active).take();
        if let Some(run) = run {
            run.cancel.cancel();
            if let Err(e) = run.task.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }

        self.inner.stop_ticker().await;

        self.inner.live_speed.send_if_modified(|v| {
            let changed = v.abs() > 0.0;
            *v = 0.0;
            changed
        });
        self.inner.phase.send_if_modified(|p| {
            let changed = *p != Phase::Idle;
            *p = Phase::Idle;
            changed
        });
        debug!("session torn down");
    }

    /// Clear the last displayed result. Only allowed while idle.
    pub fn reset(&self) -> bool {
        if self.is_running() {
            return false;
        }
        self.inner.last_result.send_replace(None);
        self.inner.live_speed.send_replace(0.0);
        true
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.inner.phase.subscribe()
    }

    pub fn current_phase(&self) -> Phase {
        *self.inner.phase.borrow()
    }

    /// Live speed in Mbps. Only moves during transfer phases.
    pub fn live_speed(&self) -> watch::Receiver<f64> {
        self.inner.live_speed.subscribe()
    }

    pub fn current_live_speed(&self) -> f64 {
        *self.inner.live_speed.borrow()
    }

    /// The result of the most recent completed run, until reset or restart.
    pub fn last_result(&self) -> Option<TestResult> {
        self.inner.last_result.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.current_phase() != Phase::Idle
    }
}

// ── Run task ─────────────────────────────────────────────────────

/// Supervise one run: cancel the work on request, recover if it dies.
async fn run_session(inner: Arc<SessionInner>, server: Server, cancel: CancellationToken) {
    let mut work = tokio::spawn(drive(Arc::clone(&inner), server, cancel.clone()));

    let joined = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        joined = &mut work => Some(joined),
    };

    let Some(joined) = joined else {
        work.abort();
        let _ = work.await;
        debug!("run cancelled");
        return;
    };

    if let Err(e) = joined {
        warn!(error = %e, "session task ended abnormally");
        inner.stop_ticker().await;
        inner.record_failure(CoreError::Internal(format!("session task failed: {e}")));
        inner.live_speed.send_replace(0.0);
        inner.phase.send_replace(Phase::Idle);
    }
}

async fn drive(inner: Arc<SessionInner>, server: Server, cancel: CancellationToken) {
    let profile = inner.profile;

    sleep(profile.ping_delay).await;

    inner.phase.send_replace(Phase::Download);
    let download = transfer(&inner, &profile.download, &cancel).await;
    debug!(download, "download phase finished");

    inner.phase.send_replace(Phase::Upload);
    let upload = transfer(&inner, &profile.upload, &cancel).await;
    debug!(upload, "upload phase finished");

    // No awaits past this point: a run is either fully committed or not at all.
    inner.phase.send_replace(Phase::Complete);
    inner.live_speed.send_replace(0.0);

    let figures = Figures {
        download,
        upload,
        ping: inner.uniform(profile.ping_min_ms, profile.ping_max_ms),
        jitter: inner.uniform(0.0, profile.jitter_max_ms),
    };
    let previous_id = inner.history.latest().map(|r| r.id);
    let result = TestResult::capture(figures, server, Local::now(), previous_id);

    match inner.history.append(result.clone()) {
        Ok(()) => {
            info!(
                download = result.download,
                upload = result.upload,
                ping = result.ping,
                jitter = result.jitter,
                "result committed"
            );
            inner.last_result.send_replace(Some(result));
        }
        Err(e) => {
            warn!(error = %e, "failed to persist result");
            inner.record_failure(e);
        }
    }

    inner.phase.send_replace(Phase::Idle);
}

/// Run one transfer phase and return its final, floored figure.
async fn transfer(
    inner: &Arc<SessionInner>,
    phase: &TransferProfile,
    cancel: &CancellationToken,
) -> f64 {
    let token = cancel.child_token();
    let task = tokio::spawn(tick_loop(
        Arc::clone(inner),
        phase.tick,
        phase.max_increment,
        token.clone(),
    ));
    inner.install_ticker(Ticker {
        cancel: token,
        task,
    });

    sleep(phase.duration).await;

    let accumulated = inner.stop_ticker().await.unwrap_or(0.0);
    let perturbed = accumulated + inner.uniform(-phase.perturbation, phase.perturbation);
    perturbed.max(phase.floor)
}

/// Advance the accumulator every `period` until cancelled.
async fn tick_loop(
    inner: Arc<SessionInner>,
    period: std::time::Duration,
    max_increment: f64,
    cancel: CancellationToken,
) -> f64 {
    let mut value = 0.0;
    let mut ticks = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticks.tick() => {
                value += inner.uniform(0.0, max_increment);
                inner.live_speed.send_replace(value);
            }
        }
    }

    value
}

impl SessionInner {
    /// Put a ticker in the slot, cancelling whatever was there.
    fn install_ticker(&self, ticker: Ticker) {
        if let Some(previous) = lock(&self.timer).replace(ticker) {
            previous.cancel.cancel();
        }
    }

    /// Cancel the current ticker and wait for it. Returns its accumulator.
    async fn stop_ticker(&self) -> Option<f64> {
        let ticker = lock(&self.timer).take()?;
        ticker.cancel.cancel();
        match ticker.task.await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "ticker ended abnormally");
                None
            }
        }
    }

    fn record_failure(&self, error: CoreError) {
        *lock(&self.failure) = Some(error);
    }

    /// Uniform draw from `[low, high)`; `low` when the range is empty or
    /// either bound is not finite.
    fn uniform(&self, low: f64, high: f64) -> f64 {
        let drawable = low.is_finite() && high.is_finite() && high > low;
        if !drawable {
            return low;
        }
        lock(&self.rng).gen_range(low..high)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::ConnectionMode;
    use crate::storage::MemoryStore;
    use crate::store::HISTORY_KEY;

    fn session_with_seed(seed: u64) -> (Arc<MemoryStore>, Session) {
        let backend = Arc::new(MemoryStore::new());
        let session = Session::with_seed(backend.clone(), SessionProfile::default(), seed);
        (backend, session)
    }

    /// Reads succeed, every write fails.
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), CoreError> {
            Err(CoreError::Storage {
                path: "storage.json".into(),
                reason: "read-only file system".into(),
            })
        }

        fn remove(&self, key: &str) -> Result<(), CoreError> {
            self.inner.remove(key)
        }
    }

    /// Panics when the history key is read, which happens inside the run.
    #[derive(Default)]
    struct BrokenHistoryStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for BrokenHistoryStore {
        fn get(&self, key: &str) -> Option<String> {
            assert_ne!(key, HISTORY_KEY, "history backend unavailable");
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), CoreError> {
            self.inner.remove(key)
        }
    }

    fn short_profile() -> SessionProfile {
        let mut profile = SessionProfile::default();
        profile.ping_delay = Duration::from_millis(10);
        profile.download.duration = Duration::from_millis(300);
        profile.upload.duration = Duration::from_millis(300);
        profile
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_commits_one_result_at_head() {
        let (backend, session) = session_with_seed(7);
        let settings = SettingsStore::new(backend.clone());
        let history = ResultStore::new(backend);
        settings.save(3, ConnectionMode::Single).unwrap();

        let result = session.run().await.unwrap().unwrap();

        let stored = history.load_all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], result);
        assert_eq!(result.server, settings.selected_server());
        assert!((5.0..=35.0).contains(&result.ping), "ping {}", result.ping);
        assert!((0.0..=5.0).contains(&result.jitter), "jitter {}", result.jitter);
        assert!(result.download >= 1.0);
        assert!(result.upload >= 0.5);

        assert_eq!(session.current_phase(), Phase::Idle);
        assert!(session.current_live_speed().abs() < f64::EPSILON);
        assert_eq!(session.last_result(), Some(result));
    }

    #[tokio::test(start_paused = true)]
    async fn later_settings_changes_do_not_touch_history() {
        let (backend, session) = session_with_seed(11);
        let settings = SettingsStore::new(backend.clone());
        let history = ResultStore::new(backend);

        session.run().await.unwrap().unwrap();
        settings.save(4, ConnectionMode::Multi).unwrap();
        session.run().await.unwrap().unwrap();

        let stored = history.load_all();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].server.id, 4);
        assert_eq!(stored[1].server.id, 1);
        assert!(stored[0].id > stored[1].id);
        assert!(stored.iter().all(|r| r.server.is_catalog_entry()));
    }

    #[tokio::test(start_paused = true)]
    async fn floors_hold_when_perturbation_dominates() {
        let mut profile = SessionProfile::default();
        profile.download.max_increment = 0.0;
        profile.upload.max_increment = 0.0;
        profile.download.duration = Duration::from_millis(200);
        profile.upload.duration = Duration::from_millis(300);

        for seed in 0..25 {
            let session = Session::with_seed(Arc::new(MemoryStore::new()), profile, seed);
            let result = session.run().await.unwrap().unwrap();
            assert!(result.download >= 1.0, "seed {seed}: {}", result.download);
            assert!(result.upload >= 0.5, "seed {seed}: {}", result.upload);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn live_speed_rises_during_download() {
        let (_, session) = session_with_seed(3);
        assert!(session.start());

        sleep(Duration::from_millis(1500 + 450)).await;
        assert_eq!(session.current_phase(), Phase::Download);
        let early = session.current_live_speed();
        assert!(early > 0.0);

        sleep(Duration::from_millis(1000)).await;
        assert!(session.current_live_speed() >= early);

        session.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_running_is_noop() {
        let (_, session) = session_with_seed(5);
        assert!(session.start());

        sleep(Duration::from_millis(1500 + 350)).await;
        let phase = session.current_phase();
        let live = session.current_live_speed();
        let mut live_rx = session.live_speed();
        live_rx.borrow_and_update();

        assert!(!session.start());
        assert_eq!(session.current_phase(), phase);
        assert!(!live_rx.has_changed().unwrap());
        assert!((session.current_live_speed() - live).abs() < f64::EPSILON);

        session.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_mid_download_stops_ticks_and_commits_nothing() {
        let (backend, session) = session_with_seed(9);
        let history = ResultStore::new(backend);
        assert!(session.start());

        sleep(Duration::from_millis(1500 + 2000)).await;
        assert_eq!(session.current_phase(), Phase::Download);

        session.teardown().await;
        assert_eq!(session.current_phase(), Phase::Idle);

        let mut live_rx = session.live_speed();
        live_rx.borrow_and_update();
        sleep(session.profile().total_duration() * 2).await;

        assert!(!live_rx.has_changed().unwrap());
        assert!(history.load_all().is_empty());
        assert!(session.last_result().is_none());
        assert_eq!(session.current_phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn session_can_restart_after_teardown() {
        let (backend, session) = session_with_seed(13);
        assert!(session.start());
        sleep(Duration::from_millis(500)).await;
        session.teardown().await;

        let result = session.run().await.unwrap();
        assert!(result.is_some());
        assert_eq!(ResultStore::new(backend).load_all().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_last_result_only_when_idle() {
        let (_, session) = session_with_seed(17);
        session.run().await.unwrap().unwrap();
        assert!(session.last_result().is_some());

        assert!(session.start());
        assert!(!session.reset());
        session.teardown().await;

        assert!(session.reset());
        assert!(session.last_result().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_commit_is_reported_and_publishes_nothing() {
        let session = Session::with_seed(Arc::new(ReadOnlyStore::default()), short_profile(), 21);

        let err = session.run().await.unwrap_err();

        assert!(matches!(err, CoreError::Storage { .. }), "{err}");
        assert!(session.last_result().is_none());
        assert_eq!(session.current_phase(), Phase::Idle);

        // The failure belongs to that run only.
        assert!(session.start());
        session.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_run_returns_to_idle() {
        let session =
            Session::with_seed(Arc::new(BrokenHistoryStore::default()), short_profile(), 23);

        let err = session.run().await.unwrap_err();

        assert!(matches!(err, CoreError::Internal(_)), "{err}");
        assert_eq!(session.current_phase(), Phase::Idle);
        assert!(session.current_live_speed().abs() < f64::EPSILON);
        assert!(session.start());
        session.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn non_finite_ranges_draw_the_lower_bound() {
        let mut profile = short_profile();
        profile.ping_max_ms = f64::NAN;
        profile.jitter_max_ms = f64::INFINITY;
        let session = Session::with_seed(Arc::new(MemoryStore::new()), profile, 29);

        let result = session.run().await.unwrap().unwrap();

        assert!((result.ping - 5.0).abs() < f64::EPSILON, "ping {}", result.ping);
        assert!(result.jitter.abs() < f64::EPSILON, "jitter {}", result.jitter);
        assert_eq!(session.current_phase(), Phase::Idle);
    }

    #[test]
    fn phase_labels_and_names() {
        assert_eq!(Phase::Idle.label(), "Ready to test");
        assert_eq!(Phase::Download.to_string(), "download");
        assert!(Phase::Upload.is_transfer());
        assert!(!Phase::Ping.is_transfer());
    }

    #[test]
    fn default_profile_matches_landing_page_timing() {
        let profile = SessionProfile::default();
        assert_eq!(profile.total_duration(), Duration::from_millis(8500));
        assert_eq!(profile.download.tick, Duration::from_millis(100));
        assert_eq!(profile.upload.tick, Duration::from_millis(150));
    }
}
