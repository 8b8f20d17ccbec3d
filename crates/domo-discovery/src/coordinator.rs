//! Process-wide coordination of scanners, listeners, and results.

use crate::config::{DiscoveryConfig, ScannerConfig};
use crate::error::{DiscoveryError, Result};
use crate::result::DiscoveryResult;
use crate::scanner::Scanner;
use crate::supervisor::{ResultSink, ScanOutcome, ScanState, ScanSupervisor};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domo_core::types::DeviceInstanceId;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handle identifying a subscribed listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiver of discovery notifications across all scanners.
///
/// Listeners are independent: a panicking listener is contained and the
/// remaining listeners still receive the event.
pub trait DiscoveryListener: Send + Sync {
    /// A device instance was reported for the first time this scan
    fn on_result_new(&self, result: &DiscoveryResult);

    /// An already-known device instance was reported again; the new result
    /// supersedes the old one and its TTL clock restarts.
    fn on_result_updated(&self, result: &DiscoveryResult);

    /// A result's TTL elapsed and it was removed from the result table
    fn on_result_expired(&self, result: &DiscoveryResult);

    /// A scanner's scan terminated
    fn on_scan_finished(&self, scanner_id: &str, outcome: ScanOutcome);
}

/// Event emitted on the coordinator's broadcast channel, mirroring the
/// listener callbacks for consumers that prefer a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DiscoveryEvent {
    /// New device instance discovered
    ResultNew { result: DiscoveryResult },
    /// Known device instance rediscovered
    ResultUpdated { result: DiscoveryResult },
    /// Result removed after its TTL elapsed
    ResultExpired { result: DiscoveryResult },
    /// A scan terminated
    ScanFinished {
        scanner_id: String,
        outcome: ScanOutcome,
    },
}

/// Whether a coordinator-level scan request actually started a scan.
///
/// At this layer an already-running scan is a reported no-op rather than an
/// error: the caller cannot distinguish "already running from my request"
/// from "already running from another caller".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStart {
    /// The scan was started
    Started,
    /// A scan was already running; nothing was changed
    AlreadyRunning,
}

struct TrackedResult {
    result: DiscoveryResult,
    expires_at: Option<Instant>,
}

struct CoordinatorInner {
    config: DiscoveryConfig,
    supervisors: DashMap<String, Arc<ScanSupervisor>>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn DiscoveryListener>)>>,
    results: DashMap<DeviceInstanceId, TrackedResult>,
    event_tx: async_channel::Sender<DiscoveryEvent>,
    event_rx: async_channel::Receiver<DiscoveryEvent>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CoordinatorInner {
    fn track(&self, result: &DiscoveryResult) {
        let expires_at = result.ttl.as_duration().map(|ttl| Instant::now() + ttl);
        self.results.insert(
            result.instance_id.clone(),
            TrackedResult {
                result: result.clone(),
                expires_at,
            },
        );
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        let expired: Vec<DeviceInstanceId> = self
            .results
            .iter()
            .filter(|entry| entry.value().expires_at.is_some_and(|at| at <= now))
            .map(|entry| entry.key().clone())
            .collect();

        for instance_id in expired {
            if let Some((_, tracked)) = self.results.remove(&instance_id) {
                debug!(instance_id = %instance_id, "Discovery result expired");
                self.notify(DiscoveryEvent::ResultExpired {
                    result: tracked.result,
                });
            }
        }
    }

    fn notify(&self, event: DiscoveryEvent) {
        let listeners: Vec<Arc<dyn DiscoveryListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            let delivery = catch_unwind(AssertUnwindSafe(|| match &event {
                DiscoveryEvent::ResultNew { result } => listener.on_result_new(result),
                DiscoveryEvent::ResultUpdated { result } => listener.on_result_updated(result),
                DiscoveryEvent::ResultExpired { result } => listener.on_result_expired(result),
                DiscoveryEvent::ScanFinished {
                    scanner_id,
                    outcome,
                } => listener.on_scan_finished(scanner_id, *outcome),
            }));
            if delivery.is_err() {
                warn!("Discovery listener panicked; continuing with remaining listeners");
            }
        }

        if self.event_tx.try_send(event).is_err() {
            warn!("Discovery event channel full; dropping event");
        }
    }
}

impl ResultSink for CoordinatorInner {
    fn result_new(&self, scanner_id: &str, result: DiscoveryResult) {
        debug!(scanner_id, instance_id = %result.instance_id, "Device discovered");
        self.track(&result);
        self.notify(DiscoveryEvent::ResultNew { result });
    }

    fn result_updated(&self, scanner_id: &str, result: DiscoveryResult) {
        debug!(scanner_id, instance_id = %result.instance_id, "Device rediscovered");
        self.track(&result);
        self.notify(DiscoveryEvent::ResultUpdated { result });
    }

    fn scan_finished(&self, scanner_id: &str, outcome: ScanOutcome) {
        info!(scanner_id, ?outcome, "Scan finished");
        self.notify(DiscoveryEvent::ScanFinished {
            scanner_id: scanner_id.to_string(),
            outcome,
        });
    }
}

/// Supervisors hold this instead of the inner coordinator directly, so the
/// coordinator and its supervisors do not keep each other alive.
struct WeakSink(Weak<CoordinatorInner>);

impl ResultSink for WeakSink {
    fn result_new(&self, scanner_id: &str, result: DiscoveryResult) {
        if let Some(inner) = self.0.upgrade() {
            inner.result_new(scanner_id, result);
        }
    }

    fn result_updated(&self, scanner_id: &str, result: DiscoveryResult) {
        if let Some(inner) = self.0.upgrade() {
            inner.result_updated(scanner_id, result);
        }
    }

    fn scan_finished(&self, scanner_id: &str, outcome: ScanOutcome) {
        if let Some(inner) = self.0.upgrade() {
            inner.scan_finished(scanner_id, outcome);
        }
    }
}

/// Aggregation and fan-out point across all registered scanners.
///
/// Owns one [`ScanSupervisor`] per scanner, the shared result table, and the
/// listener list. All coordinator operations are non-blocking with respect
/// to any in-progress scan.
pub struct DiscoveryCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl DiscoveryCoordinator {
    /// Creates a coordinator with the given configuration
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        config.validate().map_err(DiscoveryError::InvalidConfig)?;

        let (event_tx, event_rx) = async_channel::bounded(config.event_channel_capacity);

        info!(
            default_scan_timeout_secs = config.default_scan_timeout_secs,
            expiry_sweep_interval_secs = config.expiry_sweep_interval_secs,
            "Discovery coordinator created"
        );

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                supervisors: DashMap::new(),
                listeners: RwLock::new(Vec::new()),
                results: DashMap::new(),
                event_tx,
                event_rx,
                sweeper: Mutex::new(None),
            }),
        })
    }

    /// Starts the TTL expiry sweeper. No-op when already started.
    pub fn start(&self) {
        let mut sweeper = self.inner.sweeper.lock();
        if sweeper.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let interval = inner.config.expiry_sweep_interval();
        *sweeper = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tick.tick().await; // the first tick completes immediately
            loop {
                tick.tick().await;
                inner.sweep_expired();
            }
        }));
        debug!("Expiry sweeper started");
    }

    /// Stops all scans, background re-triggering, and the expiry sweeper
    pub fn shutdown(&self) {
        info!("Shutting down discovery coordinator");
        for entry in self.inner.supervisors.iter() {
            entry.value().shutdown();
        }
        if let Some(task) = self.inner.sweeper.lock().take() {
            task.abort();
        }
    }

    /// Registers a scanner under its own supervisor.
    ///
    /// Must be called from within a tokio runtime when the configuration
    /// enables background scans.
    pub fn register(&self, scanner: Arc<dyn Scanner>, config: ScannerConfig) -> Result<()> {
        config.validate().map_err(DiscoveryError::InvalidConfig)?;
        let scanner_id = scanner.scanner_id().to_string();

        match self.inner.supervisors.entry(scanner_id.clone()) {
            Entry::Occupied(_) => Err(DiscoveryError::DuplicateScanner { scanner_id }),
            Entry::Vacant(entry) => {
                let sink: Arc<dyn ResultSink> = Arc::new(WeakSink(Arc::downgrade(&self.inner)));
                let supervisor = Arc::new(ScanSupervisor::new(
                    scanner,
                    config.scan_timeout(self.inner.config.default_scan_timeout()),
                    config.background_interval(),
                    sink,
                ));
                supervisor.enable_background_scans();
                info!(scanner_id = %scanner_id, "Scanner registered");
                entry.insert(supervisor);
                Ok(())
            }
        }
    }

    /// Unregisters a scanner, stopping its scan first if one is running
    pub fn unregister(&self, scanner_id: &str) -> Result<()> {
        let (_, supervisor) = self.inner.supervisors.remove(scanner_id).ok_or_else(|| {
            DiscoveryError::ScannerNotFound {
                scanner_id: scanner_id.to_string(),
            }
        })?;
        supervisor.shutdown();
        info!(scanner_id, "Scanner unregistered");
        Ok(())
    }

    /// Starts a scan on the given scanner.
    ///
    /// An already-running scan is reported as [`ScanStart::AlreadyRunning`],
    /// not an error; the in-progress scan is untouched.
    pub fn start_scan(&self, scanner_id: &str) -> Result<ScanStart> {
        let supervisor = self.supervisor(scanner_id)?;
        match supervisor.start_scan() {
            Ok(()) => Ok(ScanStart::Started),
            Err(DiscoveryError::AlreadyScanning { .. }) => Ok(ScanStart::AlreadyRunning),
            Err(e) => Err(e),
        }
    }

    /// Starts a scan on every idle scanner. Returns how many were started.
    pub fn start_all_scans(&self) -> usize {
        let supervisors: Vec<_> = self
            .inner
            .supervisors
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        supervisors
            .iter()
            .filter(|supervisor| supervisor.start_scan().is_ok())
            .count()
    }

    /// Requests that the given scanner's scan stop
    pub fn stop_scan(&self, scanner_id: &str) -> Result<()> {
        self.supervisor(scanner_id)?.stop_scan();
        Ok(())
    }

    /// Requests that every running scan stop
    pub fn stop_all_scans(&self) {
        for entry in self.inner.supervisors.iter() {
            entry.value().stop_scan();
        }
    }

    /// Subscribes a listener to all discovery notifications
    pub fn subscribe(&self, listener: Arc<dyn DiscoveryListener>) -> ListenerId {
        let id = ListenerId::new();
        self.inner.listeners.write().push((id, listener));
        debug!(listener_id = %id, "Discovery listener subscribed");
        id
    }

    /// Unsubscribes a listener. Returns false if the handle is unknown.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Returns a receiver for the broadcast event stream. Every clone
    /// observes the same shared stream.
    pub fn event_stream(&self) -> async_channel::Receiver<DiscoveryEvent> {
        self.inner.event_rx.clone()
    }

    /// Returns a snapshot of all current (non-expired) results
    pub fn results(&self) -> Vec<DiscoveryResult> {
        self.inner
            .results
            .iter()
            .map(|entry| entry.value().result.clone())
            .collect()
    }

    /// Returns the current result for one device instance
    pub fn result(&self, instance_id: &DeviceInstanceId) -> Option<DiscoveryResult> {
        self.inner
            .results
            .get(instance_id)
            .map(|entry| entry.value().result.clone())
    }

    /// Looks up a result by the instance ID's string form, as received from
    /// an external surface. Fails on a malformed identifier; an unknown but
    /// well-formed one is `Ok(None)`.
    pub fn result_by_str(&self, instance_id: &str) -> Result<Option<DiscoveryResult>> {
        let instance_id: DeviceInstanceId = instance_id.parse()?;
        Ok(self.result(&instance_id))
    }

    /// Returns the identifiers of all registered scanners
    pub fn scanner_ids(&self) -> Vec<String> {
        self.inner
            .supervisors
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Returns the lifecycle state of one scanner
    pub fn scan_state(&self, scanner_id: &str) -> Result<ScanState> {
        Ok(self.supervisor(scanner_id)?.scan_state())
    }

    fn supervisor(&self, scanner_id: &str) -> Result<Arc<ScanSupervisor>> {
        self.inner
            .supervisors
            .get(scanner_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DiscoveryError::ScannerNotFound {
                scanner_id: scanner_id.to_string(),
            })
    }
}

impl Drop for DiscoveryCoordinator {
    fn drop(&mut self) {
        if self.inner.sweeper.lock().is_some() {
            warn!("Discovery coordinator dropped while running");
        }
    }
}
