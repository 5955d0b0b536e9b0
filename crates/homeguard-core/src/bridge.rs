// ── Installation bridge ──
//
// Lifecycle and scheduling for one installation: periodic state refresh,
// periodic token renewal, command-triggered burst polling and one-shot
// settle refreshes. Every operation that touches the session runs under
// one per-bridge lock, so refresh ticks and commands never interleave
// their remote calls.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use homeguard_api::{
    ArmStatus, HttpTransport, Installation, InstallationOverview, MutationOutcome,
    ReqwestTransport, Session,
};

use crate::command::{self, ArmCommand, BurstCommand, Channel, LockCommand, Payload, Request};
use crate::config::BridgeConfig;
use crate::discovery::{self, DiscoveredDevice};
use crate::distributor::{SnapshotDistributor, SnapshotObserver};
use crate::error::CoreError;
use crate::observer::DeviceEvent;

const EVENT_CHANNEL_SIZE: usize = 256;
const MIN_BURST_INTERVAL: Duration = Duration::from_millis(100);

// ── State ────────────────────────────────────────────────────────────

/// Bridge lifecycle. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Uninitialized,
    Running,
    Disposed,
}

/// Why the bridge is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StatusDetail {
    CommunicationError,
    ConfigurationError,
}

/// Reachability of the installation, observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeStatus {
    Uninitialized,
    Online,
    Offline {
        detail: StatusDetail,
        message: String,
    },
}

// ── Bridge ───────────────────────────────────────────────────────────

/// Polling bridge for one installation.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. [`start`](Self::start) spawns
/// the periodic tasks; [`dispose`](Self::dispose) cancels them and logs
/// out. Background tasks hold clones, so a started bridge lives until it
/// is disposed.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    session: Session,
    distributor: SnapshotDistributor,
    /// Serializes every logical operation against the remote session.
    op_lock: tokio::sync::Mutex<()>,
    lifecycle: Mutex<LifecycleState>,
    status: watch::Sender<BridgeStatus>,
    arm_status: watch::Sender<Option<ArmStatus>>,
    events: broadcast::Sender<DeviceEvent>,
    last_snapshot: ArcSwapOption<InstallationOverview>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    burst: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    /// Validate `config` and build a bridge on the reqwest transport.
    /// Does NOT contact the server.
    pub fn new(config: BridgeConfig) -> Result<Self, CoreError> {
        let transport = ReqwestTransport::new(&config.transport())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Validate `config` and build a bridge on a caller-supplied transport.
    pub fn with_transport(
        config: BridgeConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, CoreError> {
        let endpoints = config.validate()?;
        let session = Session::new(
            endpoints,
            config.username.clone(),
            config.password.clone(),
            transport,
        )
        .with_already_set_codes(config.already_set_codes.iter().cloned());

        let (status, _) = watch::channel(BridgeStatus::Uninitialized);
        let (arm_status, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(BridgeInner {
                config,
                session,
                distributor: SnapshotDistributor::new(),
                op_lock: tokio::sync::Mutex::new(()),
                lifecycle: Mutex::new(LifecycleState::Uninitialized),
                status,
                arm_status,
                events,
                last_snapshot: ArcSwapOption::empty(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                burst: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn lifecycle(&self) -> LifecycleState {
        *lock(&self.inner.lifecycle)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Enter `Running`: refresh now and then at the configured fixed
    /// delay, and renew the token on the renewal schedule.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), CoreError> {
        {
            let mut state = lock(&self.inner.lifecycle);
            if *state != LifecycleState::Uninitialized {
                return Err(CoreError::InvalidState {
                    state: (*state).into(),
                });
            }
            *state = LifecycleState::Running;
        }

        let config = &self.inner.config;
        let cancel = self.inner.cancel.clone();
        self.track(tokio::spawn(refresh_task(
            self.clone(),
            config.refresh_interval(),
            cancel.clone(),
        )));
        self.track(tokio::spawn(renewal_task(
            self.clone(),
            config.timings.renewal_offset,
            config.timings.renewal_period,
            cancel,
        )));

        info!(
            installation = %config.installation,
            refresh_secs = config.refresh_interval_secs,
            "bridge started"
        );
        Ok(())
    }

    /// Enter `Disposed`: cancel every scheduled activity, wait for the
    /// tasks to wind down, then log out. Logout failures are logged, not
    /// returned. Calling this twice is harmless.
    pub async fn dispose(&self) {
        {
            let mut state = lock(&self.inner.lifecycle);
            if *state == LifecycleState::Disposed {
                return;
            }
            *state = LifecycleState::Disposed;
        }
        self.inner.cancel.cancel();

        let mut handles: Vec<JoinHandle<()>> = lock(&self.inner.task_handles).drain(..).collect();
        handles.extend(lock(&self.inner.burst).take());
        for handle in handles {
            let _ = handle.await;
        }

        let _guard = self.inner.op_lock.lock().await;
        match self.inner.session.logout().await {
            Ok(acknowledged) => debug!(acknowledged, "logged out"),
            Err(e) => warn!(error = %e, "logout failed (non-fatal)"),
        }
        info!(installation = %self.inner.config.installation, "bridge disposed");
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Fetch a snapshot, publish the arm status and hand the snapshot to
    /// every observer.
    ///
    /// Failures set the bridge `Offline` and are returned; the periodic
    /// schedule is unaffected and retries on the next tick.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let _guard = self.inner.op_lock.lock().await;
        self.ensure_not_disposed()?;

        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.report_failure(&e);
                return Err(e);
            }
        };
        if self.inner.cancel.is_cancelled() {
            debug!("discarding snapshot fetched during dispose");
            return Ok(());
        }

        let snapshot = Arc::new(snapshot);
        match snapshot.arm_status() {
            Some(status) => {
                self.set_status(BridgeStatus::Online);
                self.inner.arm_status.send_replace(Some(status));
            }
            None => self.set_status(BridgeStatus::Offline {
                detail: StatusDetail::CommunicationError,
                message: "snapshot carried no valid arm status".into(),
            }),
        }
        self.inner.last_snapshot.store(Some(Arc::clone(&snapshot)));

        let report = self.inner.distributor.distribute(&snapshot);
        debug!(
            delivered = report.delivered,
            failed = report.failed.len(),
            "refresh complete"
        );
        Ok(())
    }

    async fn fetch_snapshot(&self) -> Result<InstallationOverview, CoreError> {
        self.ensure_logged_in().await?;
        let snapshot = self
            .inner
            .session
            .installation_overview(&self.inner.config.installation)
            .await?;
        Ok(snapshot)
    }

    /// Force a fresh login regardless of the current token.
    pub async fn renew_token(&self) -> Result<(), CoreError> {
        let _guard = self.inner.op_lock.lock().await;
        self.ensure_not_disposed()?;

        debug!("renewing session token");
        if let Err(e) = self.inner.session.login().await {
            let e = CoreError::from(e);
            self.report_failure(&e);
            return Err(e);
        }
        Ok(())
    }

    /// List the installations visible to the configured account.
    pub async fn installations(&self) -> Result<Vec<Installation>, CoreError> {
        let _guard = self.inner.op_lock.lock().await;
        self.ensure_not_disposed()?;
        self.ensure_logged_in().await?;
        Ok(self.inner.session.installations().await?)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Decode and execute a payload received on `channel`.
    ///
    /// Arm, lock and plug commands run under the session lock and are
    /// followed by a one-shot settle refresh, whether they succeeded or not.
    /// A malformed payload makes no remote call.
    pub async fn handle_command(&self, channel: &Channel, payload: Payload) -> Result<(), CoreError> {
        self.ensure_not_disposed()?;
        let request = command::decode(channel, payload)?;
        let timings = &self.inner.config.timings;

        match request {
            Request::Refresh => {
                self.schedule_refresh(timings.refresh_delay);
                Ok(())
            }
            Request::Burst(burst) => {
                self.start_burst(burst);
                Ok(())
            }
            Request::Arm(command) => {
                let result = self.set_arm_state(command).await;
                self.schedule_refresh(timings.refresh_delay);
                result
            }
            Request::Lock {
                device_label,
                command,
            } => {
                let result = self.set_door_lock(&device_label, command).await;
                self.schedule_refresh(timings.lock_settle_delay);
                result
            }
            Request::Plug { device_label, on } => {
                let result = self.set_smart_plug(&device_label, on).await;
                self.schedule_refresh(timings.refresh_delay);
                result
            }
        }
    }

    async fn set_arm_state(&self, command: ArmCommand) -> Result<(), CoreError> {
        let pin = self.resolve_pin(command.pin.as_deref())?;
        let giid = &self.inner.config.installation;
        let outcome = self
            .mutate(self.inner.session.set_arm_state(giid, pin, command.status))
            .await?;

        debug!(?outcome, status = %command.status, "arm state change accepted");
        self.inner.arm_status.send_replace(Some(command.status));
        Ok(())
    }

    async fn set_door_lock(&self, device_label: &str, command: LockCommand) -> Result<(), CoreError> {
        let pin = self.resolve_pin(command.pin.as_deref())?;
        let giid = &self.inner.config.installation;
        let outcome = self
            .mutate(
                self.inner
                    .session
                    .set_door_lock(giid, device_label, pin, command.status),
            )
            .await?;

        debug!(?outcome, device = device_label, status = %command.status, "door lock change accepted");
        Ok(())
    }

    async fn set_smart_plug(&self, device_label: &str, on: bool) -> Result<(), CoreError> {
        let giid = &self.inner.config.installation;
        let outcome = self
            .mutate(self.inner.session.set_smart_plug(giid, device_label, on))
            .await?;

        debug!(?outcome, device = device_label, on, "smart plug change accepted");
        Ok(())
    }

    /// Run one mutating call under the session lock, logging in first if
    /// needed. The call future is lazy, so it sees the fresh token.
    async fn mutate(
        &self,
        call: impl Future<Output = Result<MutationOutcome, homeguard_api::Error>> + Send,
    ) -> Result<MutationOutcome, CoreError> {
        let result = {
            let _guard = self.inner.op_lock.lock().await;
            self.ensure_not_disposed()?;
            match self.ensure_logged_in().await {
                Ok(()) => call.await.map_err(CoreError::from),
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(outcome) => {
                self.set_status(BridgeStatus::Online);
                Ok(outcome)
            }
            Err(e) => {
                // A rejected command usually means a wrong PIN.
                let detail = match e {
                    CoreError::SessionResponse { .. } => StatusDetail::ConfigurationError,
                    _ => detail_for(&e),
                };
                self.go_offline(detail, &e);
                Err(e)
            }
        }
    }

    fn resolve_pin<'a>(&'a self, pin: Option<&'a str>) -> Result<&'a str, CoreError> {
        match pin.or_else(|| self.inner.config.default_pin()) {
            Some(pin) => Ok(pin),
            None => {
                warn!("command dropped, no PIN available");
                Err(CoreError::MissingPin)
            }
        }
    }

    // ── Scheduling ───────────────────────────────────────────────

    /// Refresh once after `delay`, unless the bridge is disposed first.
    pub fn schedule_refresh(&self, delay: Duration) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        debug!(delay_ms = delay.as_millis(), "scheduling one-shot refresh");

        let bridge = self.clone();
        let cancel = self.inner.cancel.clone();
        self.track(tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if let Err(e) = bridge.refresh().await {
                        warn!(error = %e, "one-shot refresh failed");
                    }
                }
            }
        }));
    }

    /// Poll `count` times at `interval`. Ignored (returns `false`) while a
    /// previous burst is still running.
    pub fn start_burst(&self, burst: BurstCommand) -> bool {
        if self.inner.cancel.is_cancelled() {
            return false;
        }

        let mut slot = lock(&self.inner.burst);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("burst already active, request ignored");
            return false;
        }

        debug!(count = burst.count, interval_ms = burst.interval.as_millis(), "starting burst");
        *slot = Some(tokio::spawn(burst_task(
            self.clone(),
            burst,
            self.inner.cancel.clone(),
        )));
        true
    }

    pub fn is_burst_active(&self) -> bool {
        lock(&self.inner.burst)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ── Observers ────────────────────────────────────────────────

    /// Register `observer` and, on a running bridge, schedule a one-shot
    /// refresh so it sees current state promptly. A duplicate registration
    /// changes nothing and returns `false`.
    pub fn register_observer(&self, observer: Arc<dyn SnapshotObserver>) -> bool {
        self.register_observers([observer]) == 1
    }

    /// Register every observer in `observers`, scheduling at most one
    /// refresh for the whole batch. Returns how many were newly added.
    pub fn register_observers(
        &self,
        observers: impl IntoIterator<Item = Arc<dyn SnapshotObserver>>,
    ) -> usize {
        let mut added = 0;
        for observer in observers {
            let key = observer.key().to_owned();
            if self.inner.distributor.register(observer) {
                debug!(observer = %key, "observer registered");
                added += 1;
            }
        }
        if added > 0 && self.lifecycle() == LifecycleState::Running {
            self.schedule_refresh(self.inner.config.timings.refresh_delay);
        }
        added
    }

    pub fn unregister_observer(&self, key: &str) -> bool {
        self.inner.distributor.unregister(key)
    }

    pub fn observer_count(&self) -> usize {
        self.inner.distributor.len()
    }

    /// Devices present in the last snapshot.
    pub fn discovered_devices(&self) -> Vec<DiscoveredDevice> {
        self.last_snapshot()
            .map(|snapshot| discovery::discover(&snapshot))
            .unwrap_or_default()
    }

    // ── State observation ────────────────────────────────────────

    pub fn status(&self) -> watch::Receiver<BridgeStatus> {
        self.inner.status.subscribe()
    }

    pub fn current_status(&self) -> BridgeStatus {
        self.inner.status.borrow().clone()
    }

    pub fn arm_status(&self) -> watch::Receiver<Option<ArmStatus>> {
        self.inner.arm_status.subscribe()
    }

    /// Subscribe to device observer events.
    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.events.subscribe()
    }

    /// Sender side of the device event channel, for building observers.
    pub fn event_sender(&self) -> broadcast::Sender<DeviceEvent> {
        self.inner.events.clone()
    }

    pub fn last_snapshot(&self) -> Option<Arc<InstallationOverview>> {
        self.inner.last_snapshot.load_full()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.session.is_logged_in()
    }

    // ── Helpers ──────────────────────────────────────────────────

    async fn ensure_logged_in(&self) -> Result<(), CoreError> {
        if !self.inner.session.is_logged_in() {
            self.inner.session.login().await?;
        }
        Ok(())
    }

    fn ensure_not_disposed(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::InvalidState {
                state: LifecycleState::Disposed.into(),
            });
        }
        Ok(())
    }

    fn set_status(&self, status: BridgeStatus) {
        self.inner.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                debug!(?status, "bridge status changed");
                *current = status;
                true
            }
        });
    }

    fn report_failure(&self, error: &CoreError) {
        self.go_offline(detail_for(error), error);
    }

    fn go_offline(&self, detail: StatusDetail, error: &CoreError) {
        warn!(error = %error, %detail, "bridge offline");
        self.set_status(BridgeStatus::Offline {
            detail,
            message: error.to_string(),
        });
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut handles = lock(&self.inner.task_handles);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Refresh immediately, then `every` after each completed refresh.
async fn refresh_task(bridge: Bridge, every: Duration, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        if let Err(e) = bridge.refresh().await {
            warn!(error = %e, "periodic refresh failed");
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(every) => {}
        }
    }
}

/// Re-login after `offset`, then every `period`.
async fn renewal_task(
    bridge: Bridge,
    offset: Duration,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut delay = offset;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
        if let Err(e) = bridge.renew_token().await {
            warn!(error = %e, "token renewal failed");
        }
        delay = period;
    }
}

async fn burst_task(bridge: Bridge, burst: BurstCommand, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(burst.interval.max(MIN_BURST_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for round in 1..=burst.count {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        debug!(round, of = burst.count, "burst refresh");
        if let Err(e) = bridge.refresh().await {
            warn!(error = %e, "burst refresh failed");
        }
    }
    debug!("burst finished");
}

fn detail_for(error: &CoreError) -> StatusDetail {
    if error.is_configuration() {
        StatusDetail::ConfigurationError
    } else {
        StatusDetail::CommunicationError
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
