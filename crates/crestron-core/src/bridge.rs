// ── Bridge abstraction ──
//
// Full lifecycle management for one Crestron Home hub: login, the poll
// loop that feeds the reconciler, command routing, and reactive data
// through the DataStore.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crestron_api::transport::{TlsMode, TransportConfig};
use crestron_api::{CrestronClient, QuickActionRecord, SessionPolicy};

use crate::command::{Action, Command, CommandEnvelope, CommandOutcome, Dispatcher};
use crate::config::{BridgeConfig, TlsVerification};
use crate::error::CoreError;
use crate::fetch::fetch_catalog;
use crate::host::{EntityHandle, EntitySink, NullSink};
use crate::model::{CategorySet, DeviceKind, DeviceSnapshot, RoomIndex};
use crate::reconcile::{CyclePhase, CycleReport, CycleSettings, Reconciler};
use crate::store::DataStore;
use crate::stream::EntityStream;

const COMMAND_CHANNEL_SIZE: usize = 32;

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Polling continues but the hub keeps rejecting fresh session keys.
    Degraded,
    Failed,
}

impl ConnectionState {
    fn accepts_commands(self) -> bool {
        matches!(self, Self::Connected | Self::Degraded)
    }
}

// ── Bridge ───────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. A bridge owns one hub
/// connection, one reconciler, and the host sink it reports entity
/// lifecycle signals to.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: ArcSwap<BridgeConfig>,
    /// Derived from `config`; read once at the start of every cycle.
    settings: ArcSwap<CycleSettings>,
    sink: Arc<dyn EntitySink>,
    store: Arc<DataStore>,
    /// Whether `connect` starts the periodic poll task.
    background: bool,
    client: Mutex<Option<Arc<CrestronClient>>>,
    /// Held for the whole of a cycle so polls never overlap.
    reconciler: Mutex<Reconciler>,
    phase: watch::Receiver<CyclePhase>,
    connection_state: watch::Sender<ConnectionState>,
    command_tx: Mutex<mpsc::Sender<CommandEnvelope>>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    /// Child token for the current connection; replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Create a bridge that reports entity lifecycle to `sink`. Does NOT
    /// connect; call [`connect()`](Self::connect).
    pub fn new(config: BridgeConfig, sink: Arc<dyn EntitySink>) -> Self {
        Self::build(config, sink, true)
    }

    fn build(config: BridgeConfig, sink: Arc<dyn EntitySink>, background: bool) -> Self {
        let reconciler = Reconciler::new();
        let phase = reconciler.subscribe_phase();
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(BridgeInner {
                settings: ArcSwap::from_pointee(CycleSettings::from(&config)),
                config: ArcSwap::from_pointee(config),
                sink,
                store: Arc::new(DataStore::new()),
                background,
                client: Mutex::new(None),
                reconciler: Mutex::new(reconciler),
                phase,
                connection_state,
                command_tx: Mutex::new(command_tx),
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The configuration the next cycle runs with.
    pub fn config(&self) -> Arc<BridgeConfig> {
        self.inner.config.load_full()
    }

    /// Replace the enabled categories. Devices of a category that is no
    /// longer enabled are removed from the host on the next cycle.
    pub fn set_categories(&self, categories: CategorySet) -> Result<(), CoreError> {
        self.reconfigure(|config| config.categories = categories)
    }

    /// Edit the configuration in place; the result is validated before
    /// it is stored.
    ///
    /// Categories, ignore patterns and the room cadence apply from the
    /// next cycle. Connection settings (URL, token, TLS, timeouts, poll
    /// interval) apply on the next [`connect()`](Self::connect).
    pub fn reconfigure(&self, edit: impl FnOnce(&mut BridgeConfig)) -> Result<(), CoreError> {
        let mut next = BridgeConfig::clone(&self.inner.config.load());
        edit(&mut next);
        next.validate()?;

        debug!(categories = ?next.categories, "bridge reconfigured");
        self.inner
            .settings
            .store(Arc::new(CycleSettings::from(&next)));
        self.inner.config.store(Arc::new(next));
        Ok(())
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Log in, run the first poll cycle, and start the background tasks.
    ///
    /// A login failure leaves the bridge `Failed`. A first cycle that
    /// fetched nothing at all is also fatal; anything less comes up
    /// `Connected`, or `Degraded` when some call kept failing auth.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let config = self.inner.config.load_full();
        config.validate()?;

        self.set_state(ConnectionState::Connecting);

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let client = match open_client(&config).await {
            Ok(client) => client,
            Err(e) => {
                self.set_state(ConnectionState::Failed);
                return Err(e);
            }
        };
        *self.inner.client.lock().await = Some(Arc::new(client));

        let auth_failed = match self.poll().await {
            Ok((_, auth_failed)) => auth_failed,
            Err(e) => {
                *self.inner.client.lock().await = None;
                self.set_state(ConnectionState::Failed);
                return Err(e);
            }
        };

        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let bridge = self.clone();
            handles.push(tokio::spawn(command_processor_task(bridge, rx)));
        }

        if self.inner.background {
            let bridge = self.clone();
            handles.push(tokio::spawn(poll_task(bridge, child)));
        }

        if auth_failed {
            warn!("connected with authentication failures; running degraded");
            self.set_state(ConnectionState::Degraded);
        } else {
            self.set_state(ConnectionState::Connected);
        }
        info!(
            url = %config.url,
            devices = self.inner.store.device_count(),
            "connected to hub"
        );
        Ok(())
    }

    /// Stop background tasks and log out. The registry is kept, so a
    /// later `connect` reconciles against what the host already knows.
    pub async fn disconnect(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(client) = self.inner.client.lock().await.take() {
            if let Err(e) = client.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }

        // The processor task consumed the old receiver.
        {
            let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
            *self.inner.command_tx.lock().await = tx;
            *self.inner.command_rx.lock().await = Some(rx);
        }

        self.set_state(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Run one reconciliation cycle now.
    ///
    /// Fails only when every category failed; partial failures are
    /// reported in the returned [`CycleReport`].
    pub async fn poll_once(&self) -> Result<CycleReport, CoreError> {
        let (report, _) = self.poll().await?;
        Ok(report)
    }

    async fn poll(&self) -> Result<(CycleReport, bool), CoreError> {
        let client = self.client().await?;
        let cancel = self.inner.cancel_child.lock().await.clone();
        let settings = self.inner.settings.load_full();
        let store = &self.inner.store;

        let mut rec = self.inner.reconciler.lock().await;
        let include_rooms = rec.rooms_due(&settings);
        rec.begin_fetch();

        let fetch = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                rec.abandon();
                debug!("poll abandoned on shutdown");
                return Err(CoreError::BridgeDisconnected);
            }
            fetch = fetch_catalog(&client, &settings.categories, include_rooms) => fetch,
        };

        let auth_failed = fetch.auth_failed();
        let tracking = TrackingSink {
            host: self.inner.sink.as_ref(),
            store,
        };
        let report = rec.run_cycle(&fetch, &settings, &tracking);
        store.publish_devices(rec.snapshots());
        if report.rooms_synced {
            store.set_rooms(rec.rooms().clone());
        }
        drop(rec);

        store.record_cycle(report.clone());
        self.update_health(auth_failed, &report);

        if fetch.all_failed() {
            if let Some(err) = fetch.into_first_error() {
                return Err(err.into());
            }
        }
        Ok((report, auth_failed))
    }

    fn update_health(&self, auth_failed: bool, report: &CycleReport) {
        let state = *self.inner.connection_state.borrow();
        match state {
            ConnectionState::Connected if auth_failed => {
                warn!(cycle = report.cycle, "hub rejected re-login; bridge degraded");
                self.set_state(ConnectionState::Degraded);
            }
            ConnectionState::Degraded if !auth_failed && report.is_clean() => {
                info!(cycle = report.cycle, "hub accepted credentials again");
                self.set_state(ConnectionState::Connected);
            }
            _ => {}
        }
    }

    // ── Command execution ────────────────────────────────────────────

    /// Execute a command against the hub.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the outcome.
    pub async fn execute(&self, cmd: Command) -> Result<CommandOutcome, CoreError> {
        if !self.inner.connection_state.borrow().accepts_commands() {
            return Err(CoreError::BridgeDisconnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        let command_tx = self.inner.command_tx.lock().await.clone();

        command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::BridgeDisconnected)?;

        rx.await.map_err(|_| CoreError::BridgeDisconnected)?
    }

    /// Execute `action` against the device a host handle was issued for.
    pub async fn invoke(
        &self,
        handle: EntityHandle,
        action: Action,
    ) -> Result<CommandOutcome, CoreError> {
        let key = self
            .inner
            .store
            .key_for_handle(handle)
            .ok_or_else(|| CoreError::validation(format!("unknown entity handle {handle}")))?;
        self.execute(Command::single(key.kind, key.id, action))
            .await
    }

    // ── One-shot convenience ─────────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// No host sink and no background poll; the closure sees the
    /// result of exactly one cycle.
    pub async fn oneshot<F, Fut, T, E>(config: BridgeConfig, f: F) -> Result<T, E>
    where
        F: FnOnce(Bridge) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: From<CoreError>,
    {
        let bridge = Bridge::build(config, Arc::new(NullSink::new()), false);
        bridge.connect().await?;
        let result = f(bridge.clone()).await;
        bridge.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn phase(&self) -> watch::Receiver<CyclePhase> {
        self.inner.phase.clone()
    }

    pub fn last_cycle(&self) -> Option<Arc<CycleReport>> {
        self.inner.store.last_cycle()
    }

    // ── Snapshot accessors (delegate to DataStore) ───────────────────

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<DeviceSnapshot>>> {
        self.inner.store.devices_snapshot()
    }

    pub fn subscribe_devices(&self) -> EntityStream<DeviceSnapshot> {
        self.inner.store.subscribe_devices()
    }

    pub fn device(&self, kind: DeviceKind, id: u32) -> Option<Arc<DeviceSnapshot>> {
        self.inner.store.device(kind, id)
    }

    pub fn rooms(&self) -> Arc<RoomIndex> {
        self.inner.store.rooms()
    }

    // ── Ad-hoc hub calls ─────────────────────────────────────────────

    /// Quick actions are not polled; this lists them on demand.
    pub async fn quick_actions(&self) -> Result<Vec<QuickActionRecord>, CoreError> {
        Ok(self.client().await?.list_quick_actions().await?)
    }

    pub async fn recall_quick_action(&self, id: u32) -> Result<CommandOutcome, CoreError> {
        let resp = self.client().await?.recall_quick_action(id).await?;
        Ok(CommandOutcome::from_response(&[id], &resp))
    }

    /// GET an arbitrary path under the API root, session handled.
    pub async fn raw_get(&self, path: &str) -> Result<Value, CoreError> {
        Ok(self.client().await?.raw_get(path).await?)
    }

    /// Hub firmware version reported at the last login.
    pub async fn hub_version(&self) -> Option<String> {
        let client = self.inner.client.lock().await.clone()?;
        client.hub_version().await
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn client(&self) -> Result<Arc<CrestronClient>, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::BridgeDisconnected)
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_replace(state);
    }
}

// ── Host handle tracking ─────────────────────────────────────────────

/// Forwards to the host sink and keeps the store's handle → device map
/// in step, so `invoke` can resolve handles.
struct TrackingSink<'a> {
    host: &'a dyn EntitySink,
    store: &'a DataStore,
}

impl EntitySink for TrackingSink<'_> {
    fn register(&self, snapshot: &DeviceSnapshot) -> EntityHandle {
        let handle = self.host.register(snapshot);
        self.store.handles.insert(handle, snapshot.key());
        handle
    }

    fn update(&self, handle: EntityHandle, snapshot: &DeviceSnapshot) {
        self.host.update(handle, snapshot);
    }

    fn remove(&self, handle: EntityHandle) {
        self.store.handles.remove(&handle);
        self.host.remove(handle);
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Poll the hub every `poll_interval` until cancelled.
async fn poll_task(bridge: Bridge, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(bridge.inner.config.load().poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = bridge.poll_once().await {
                    warn!(error = %e, "poll cycle failed");
                }
            }
        }
    }
}

/// Process commands from the mpsc channel one at a time.
async fn command_processor_task(bridge: Bridge, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = bridge.inner.cancel_child.lock().await.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&bridge, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

async fn route_command(bridge: &Bridge, cmd: Command) -> Result<CommandOutcome, CoreError> {
    let client = bridge.client().await?;
    Dispatcher::new(&client, &bridge.inner.store)
        .dispatch(cmd)
        .await
}

// ── Helpers ──────────────────────────────────────────────────────────

async fn open_client(config: &BridgeConfig) -> Result<CrestronClient, CoreError> {
    let client = CrestronClient::new(
        config.url.as_str(),
        config.auth_token.clone(),
        &build_transport(config),
        SessionPolicy {
            max_age: config.session_max_age,
        },
    )?;
    client.login().await?;
    Ok(client)
}

/// Build a [`TransportConfig`] from the bridge configuration.
fn build_transport(config: &BridgeConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
