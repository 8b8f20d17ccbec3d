//! Per-scanner scan lifecycle supervision.

use crate::error::{DiscoveryError, Result};
use crate::result::DiscoveryResult;
use crate::scanner::{ScanContext, Scanner};
use domo_core::types::DeviceInstanceId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Lifecycle state of one scanner's scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    /// No scan in progress
    Idle,
    /// A scan is running
    Scanning,
    /// A stop was requested and the scan is winding down
    Stopping,
}

/// How a scan terminated.
///
/// Every scan terminates with exactly one outcome within its configured
/// timeout bound; a scan never silently hangs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The scanner signalled completion
    Completed,
    /// The watchdog deadline elapsed first
    TimedOut,
    /// The scan was stopped explicitly
    Aborted,
    /// The scanner raised an internal fault
    Failed,
}

/// Receiver of a supervisor's notifications.
///
/// Implemented by the coordinator; kept as a seam so supervisors can be
/// exercised in isolation. Within one supervisor, notifications for the same
/// device instance arrive in emission order, and `scan_finished` arrives
/// only after all result notifications of that scan.
pub trait ResultSink: Send + Sync {
    /// A device instance unseen during this scan was reported
    fn result_new(&self, scanner_id: &str, result: DiscoveryResult);

    /// An already-seen device instance was reported again; the new result
    /// supersedes the previous one.
    fn result_updated(&self, scanner_id: &str, result: DiscoveryResult);

    /// The scan terminated
    fn scan_finished(&self, scanner_id: &str, outcome: ScanOutcome);
}

/// Shared state of one scan: the per-scan dedup set, the cancellation
/// signal, and the active flag that gates emissions.
///
/// Ownership of emitted results transfers to the sink on each emission, so
/// a failing scanner cannot lose already-reported results.
pub(crate) struct ScanSession {
    scanner_id: String,
    active: AtomicBool,
    cancel: CancellationToken,
    seen: Mutex<HashMap<DeviceInstanceId, DiscoveryResult>>,
    sink: Arc<dyn ResultSink>,
}

impl ScanSession {
    fn new(scanner_id: String, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            scanner_id,
            active: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            seen: Mutex::new(HashMap::new()),
            sink,
        }
    }

    pub(crate) fn emit(&self, result: DiscoveryResult) {
        // Only the new-vs-updated decision happens under the seen-set lock.
        // Forwarding runs with no session lock held, so a sink callback may
        // call back into the supervisor (stop the scan, unregister, ...).
        let previous = {
            let mut seen = self.seen.lock();
            if !self.active.load(Ordering::SeqCst) {
                trace!(
                    scanner_id = %self.scanner_id,
                    instance_id = %result.instance_id,
                    "Dropping result emitted outside the scan window"
                );
                return;
            }
            seen.insert(result.instance_id.clone(), result.clone())
        };

        if previous.is_some() {
            self.sink.result_updated(&self.scanner_id, result);
        } else {
            self.sink.result_new(&self.scanner_id, result);
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    fn request_cancel(&self) {
        self.cancel.cancel();
    }

    fn deactivate(&self) {
        // Taking the seen lock fences out emissions mid-decision.
        let _seen = self.seen.lock();
        self.active.store(false, Ordering::SeqCst);
    }
}

struct SupervisorState {
    scan_state: ScanState,
    session: Option<Arc<ScanSession>>,
    scan_task: Option<JoinHandle<()>>,
    background_task: Option<JoinHandle<()>>,
}

/// Lifecycle controller for one scanner.
///
/// State machine `Idle → Scanning → (completed | timed out | stopped |
/// failed) → Idle`. The scan runs on its own tokio task; the supervisor
/// enforces the watchdog timeout independently of scanner cooperation, so
/// control always returns within the configured bound even for a
/// non-cooperative scanner, whose late results are dropped rather than
/// delivered.
pub struct ScanSupervisor {
    scanner: Arc<dyn Scanner>,
    scanner_id: String,
    timeout: Duration,
    background_interval: Option<Duration>,
    sink: Arc<dyn ResultSink>,
    state: Mutex<SupervisorState>,
}

impl ScanSupervisor {
    /// Creates a supervisor for the given scanner
    pub fn new(
        scanner: Arc<dyn Scanner>,
        timeout: Duration,
        background_interval: Option<Duration>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let scanner_id = scanner.scanner_id().to_string();
        Self {
            scanner,
            scanner_id,
            timeout,
            background_interval,
            sink,
            state: Mutex::new(SupervisorState {
                scan_state: ScanState::Idle,
                session: None,
                scan_task: None,
                background_task: None,
            }),
        }
    }

    /// Returns the supervised scanner's identifier
    pub fn scanner_id(&self) -> &str {
        &self.scanner_id
    }

    /// Returns the current lifecycle state
    pub fn scan_state(&self) -> ScanState {
        self.state.lock().scan_state
    }

    /// Starts a scan.
    ///
    /// Fails with [`DiscoveryError::AlreadyScanning`] when the previous
    /// scan's boundary is still open; the in-progress scan is not affected.
    pub fn start_scan(self: &Arc<Self>) -> Result<()> {
        let mut st = self.state.lock();
        if st.scan_state != ScanState::Idle {
            return Err(DiscoveryError::AlreadyScanning {
                scanner_id: self.scanner_id.clone(),
            });
        }

        debug!(
            scanner_id = %self.scanner_id,
            timeout_secs = self.timeout.as_secs(),
            "Starting scan"
        );

        let session = Arc::new(ScanSession::new(
            self.scanner_id.clone(),
            Arc::clone(&self.sink),
        ));
        st.scan_state = ScanState::Scanning;
        st.session = Some(Arc::clone(&session));

        let me = Arc::clone(self);
        st.scan_task = Some(tokio::spawn(async move {
            let ctx = ScanContext::new(Arc::clone(&session));
            let scanner = Arc::clone(&me.scanner);
            let scan = scanner.scan(ctx);

            let outcome = tokio::select! {
                biased;

                // A stop request wins over the scan completing, so a scan
                // that only notices cancellation is reported as aborted.
                _ = session.cancelled() => ScanOutcome::Aborted,

                res = tokio::time::timeout(me.timeout, scan) => match res {
                    Ok(Ok(())) => ScanOutcome::Completed,
                    Ok(Err(e)) => {
                        warn!(scanner_id = %me.scanner_id, error = %e, "Scan failed");
                        ScanOutcome::Failed
                    }
                    Err(_) => {
                        debug!(
                            scanner_id = %me.scanner_id,
                            timeout_secs = me.timeout.as_secs(),
                            "Scan timed out"
                        );
                        session.request_cancel();
                        ScanOutcome::TimedOut
                    }
                },
            };

            session.deactivate();
            {
                let mut st = me.state.lock();
                st.scan_state = ScanState::Idle;
                st.session = None;
                st.scan_task = None;
            }
            me.sink.scan_finished(&me.scanner_id, outcome);
        }));

        Ok(())
    }

    /// Requests that the running scan stop.
    ///
    /// Results already forwarded stand; anything emitted after the stop
    /// request is discarded. No-op when no scan is running.
    pub fn stop_scan(&self) {
        let session = {
            let mut st = self.state.lock();
            if st.scan_state != ScanState::Scanning {
                return;
            }
            st.scan_state = ScanState::Stopping;
            st.session.clone()
        };

        if let Some(session) = session {
            info!(scanner_id = %self.scanner_id, "Stopping scan");
            session.deactivate();
            session.request_cancel();
        }
    }

    /// Starts re-triggering scans on the configured background interval
    /// while the supervisor is idle. No-op when no interval is configured
    /// or background scanning is already enabled.
    pub fn enable_background_scans(self: &Arc<Self>) {
        let Some(interval) = self.background_interval else {
            return;
        };

        let mut st = self.state.lock();
        if st.background_task.is_some() {
            return;
        }

        info!(
            scanner_id = %self.scanner_id,
            interval_secs = interval.as_secs(),
            "Background scans enabled"
        );

        // Holding only a weak reference lets a supervisor that is dropped
        // without shutdown() be reclaimed; the loop exits on its next tick.
        let me = Arc::downgrade(self);
        st.background_task = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tick.tick().await; // the first tick completes immediately
            loop {
                tick.tick().await;
                let Some(me) = me.upgrade() else {
                    break;
                };
                match me.start_scan() {
                    Ok(()) => debug!(scanner_id = %me.scanner_id, "Background scan started"),
                    Err(e) => {
                        trace!(scanner_id = %me.scanner_id, error = %e, "Skipping background scan")
                    }
                }
            }
        }));
    }

    /// Stops background re-triggering. A scan already in flight keeps
    /// running.
    pub fn disable_background_scans(&self) {
        if let Some(task) = self.state.lock().background_task.take() {
            task.abort();
            debug!(scanner_id = %self.scanner_id, "Background scans disabled");
        }
    }

    /// Stops the running scan (if any) and background re-triggering
    pub fn shutdown(&self) {
        self.disable_background_scans();
        self.stop_scan();
    }
}

impl Drop for ScanSupervisor {
    fn drop(&mut self) {
        let st = self.state.lock();
        if st.scan_state != ScanState::Idle {
            warn!(scanner_id = %self.scanner_id, "Supervisor dropped while scanning");
        }
        if let Some(task) = &st.background_task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultTtl;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use domo_core::types::DeviceTypeId;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum SinkEvent {
        New(String),
        Updated(String),
        Finished(ScanOutcome),
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<SinkEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().clone()
        }
    }

    impl ResultSink for RecordingSink {
        fn result_new(&self, _scanner_id: &str, result: DiscoveryResult) {
            self.events
                .lock()
                .push(SinkEvent::New(result.instance_id.to_string()));
        }

        fn result_updated(&self, _scanner_id: &str, result: DiscoveryResult) {
            self.events
                .lock()
                .push(SinkEvent::Updated(result.instance_id.to_string()));
        }

        fn scan_finished(&self, _scanner_id: &str, outcome: ScanOutcome) {
            self.events.lock().push(SinkEvent::Finished(outcome));
        }
    }

    fn result(segment: &str) -> DiscoveryResult {
        let type_id = DeviceTypeId::new("fake", "device").unwrap();
        let id = DeviceInstanceId::new(type_id, segment).unwrap();
        DiscoveryResult::builder(id)
            .ttl(ResultTtl::Seconds(60))
            .build()
    }

    /// Emits the given instance segments, then completes
    struct EmittingScanner {
        segments: Vec<&'static str>,
    }

    #[async_trait]
    impl Scanner for EmittingScanner {
        fn scanner_id(&self) -> &str {
            "emitting"
        }

        async fn scan(&self, ctx: ScanContext) -> anyhow::Result<()> {
            for segment in &self.segments {
                ctx.emit(result(segment));
            }
            Ok(())
        }
    }

    /// Waits cooperatively until cancelled
    struct CooperativeScanner;

    #[async_trait]
    impl Scanner for CooperativeScanner {
        fn scanner_id(&self) -> &str {
            "cooperative"
        }

        async fn scan(&self, ctx: ScanContext) -> anyhow::Result<()> {
            ctx.emit(result("coop-1"));
            ctx.cancelled().await;
            Ok(())
        }
    }

    /// Never completes and ignores cancellation
    struct StubbornScanner;

    #[async_trait]
    impl Scanner for StubbornScanner {
        fn scanner_id(&self) -> &str {
            "stubborn"
        }

        async fn scan(&self, _ctx: ScanContext) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// Spawns a detached task that keeps emitting past the deadline, the
    /// way a blocking I/O offshoot would.
    struct StragglerScanner;

    #[async_trait]
    impl Scanner for StragglerScanner {
        fn scanner_id(&self) -> &str {
            "straggler"
        }

        async fn scan(&self, ctx: ScanContext) -> anyhow::Result<()> {
            let late_ctx = ctx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                late_ctx.emit(result("too-late"));
            });
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct FailingScanner;

    #[async_trait]
    impl Scanner for FailingScanner {
        fn scanner_id(&self) -> &str {
            "failing"
        }

        async fn scan(&self, _ctx: ScanContext) -> anyhow::Result<()> {
            Err(anyhow!("bridge unreachable"))
        }
    }

    fn supervisor(
        scanner: Arc<dyn Scanner>,
        timeout: Duration,
        sink: &Arc<RecordingSink>,
    ) -> Arc<ScanSupervisor> {
        let sink: Arc<dyn ResultSink> = Arc::clone(sink) as _;
        Arc::new(ScanSupervisor::new(scanner, timeout, None, sink))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_start_while_scanning_fails_without_disturbing_scan() {
        let sink = Arc::new(RecordingSink::default());
        let sup = supervisor(Arc::new(CooperativeScanner), Duration::from_secs(5), &sink);

        sup.start_scan().unwrap();
        settle().await;
        assert_eq!(sup.scan_state(), ScanState::Scanning);

        let err = sup.start_scan().unwrap_err();
        assert!(matches!(err, DiscoveryError::AlreadyScanning { .. }));
        assert_eq!(sup.scan_state(), ScanState::Scanning);

        sup.stop_scan();
        settle().await;
        assert_eq!(sup.scan_state(), ScanState::Idle);
        // The result emitted before the stop request stands.
        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::New("fake:device:coop-1".to_string()),
                SinkEvent::Finished(ScanOutcome::Aborted),
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_emission_is_new_then_updated() {
        let sink = Arc::new(RecordingSink::default());
        let sup = supervisor(
            Arc::new(EmittingScanner {
                segments: vec!["a", "a", "b"],
            }),
            Duration::from_secs(5),
            &sink,
        );

        sup.start_scan().unwrap();
        settle().await;

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::New("fake:device:a".to_string()),
                SinkEvent::Updated("fake:device:a".to_string()),
                SinkEvent::New("fake:device:b".to_string()),
                SinkEvent::Finished(ScanOutcome::Completed),
            ]
        );
        assert_eq!(sup.scan_state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn test_non_cooperative_scanner_times_out() {
        let sink = Arc::new(RecordingSink::default());
        let sup = supervisor(Arc::new(StubbornScanner), Duration::from_millis(100), &sink);

        sup.start_scan().unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(sup.scan_state(), ScanState::Idle);
        assert_eq!(sink.events(), vec![SinkEvent::Finished(ScanOutcome::TimedOut)]);

        // The boundary is closed; a new scan may start.
        sup.start_scan().unwrap();
        sup.stop_scan();
    }

    #[tokio::test]
    async fn test_results_after_deadline_are_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let sup = supervisor(Arc::new(StragglerScanner), Duration::from_millis(100), &sink);

        sup.start_scan().unwrap();
        // Wait past both the deadline and the straggler's emission.
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(sink.events(), vec![SinkEvent::Finished(ScanOutcome::TimedOut)]);
    }

    #[tokio::test]
    async fn test_scanner_failure_returns_to_idle() {
        let sink = Arc::new(RecordingSink::default());
        let sup = supervisor(Arc::new(FailingScanner), Duration::from_secs(5), &sink);

        sup.start_scan().unwrap();
        settle().await;

        assert_eq!(sup.scan_state(), ScanState::Idle);
        assert_eq!(sink.events(), vec![SinkEvent::Finished(ScanOutcome::Failed)]);

        // The supervisor remains usable after a scanner fault.
        sup.start_scan().unwrap();
        settle().await;
        assert_eq!(sup.scan_state(), ScanState::Idle);
    }

    /// Sink that reacts to the first result by stopping the scan, the way a
    /// listener acting on a discovery would.
    #[derive(Default)]
    struct StoppingSink {
        supervisor: Mutex<Option<Arc<ScanSupervisor>>>,
        events: Mutex<Vec<SinkEvent>>,
    }

    impl ResultSink for StoppingSink {
        fn result_new(&self, _scanner_id: &str, result: DiscoveryResult) {
            self.events
                .lock()
                .push(SinkEvent::New(result.instance_id.to_string()));
            if let Some(sup) = self.supervisor.lock().as_ref() {
                sup.stop_scan();
            }
        }

        fn result_updated(&self, _scanner_id: &str, result: DiscoveryResult) {
            self.events
                .lock()
                .push(SinkEvent::Updated(result.instance_id.to_string()));
        }

        fn scan_finished(&self, _scanner_id: &str, outcome: ScanOutcome) {
            self.events.lock().push(SinkEvent::Finished(outcome));
        }
    }

    #[tokio::test]
    async fn test_sink_may_stop_scan_from_result_callback() {
        let sink = Arc::new(StoppingSink::default());
        let sink_dyn: Arc<dyn ResultSink> = Arc::clone(&sink) as _;
        let sup = Arc::new(ScanSupervisor::new(
            Arc::new(CooperativeScanner),
            Duration::from_secs(5),
            None,
            sink_dyn,
        ));
        *sink.supervisor.lock() = Some(Arc::clone(&sup));

        sup.start_scan().unwrap();
        settle().await;

        assert_eq!(sup.scan_state(), ScanState::Idle);
        assert_eq!(
            sink.events.lock().clone(),
            vec![
                SinkEvent::New("fake:device:coop-1".to_string()),
                SinkEvent::Finished(ScanOutcome::Aborted),
            ]
        );
    }

    #[tokio::test]
    async fn test_background_task_does_not_keep_supervisor_alive() {
        let sink = Arc::new(RecordingSink::default());
        let sink_dyn: Arc<dyn ResultSink> = Arc::clone(&sink) as _;
        let sup = Arc::new(ScanSupervisor::new(
            Arc::new(EmittingScanner { segments: vec![] }),
            Duration::from_secs(5),
            Some(Duration::from_millis(100)),
            sink_dyn,
        ));
        sup.enable_background_scans();

        let weak = Arc::downgrade(&sup);
        drop(sup);
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_background_scans_retrigger_while_idle() {
        let sink = Arc::new(RecordingSink::default());
        let scanner: Arc<dyn Scanner> = Arc::new(EmittingScanner { segments: vec![] });
        let sink_dyn: Arc<dyn ResultSink> = Arc::clone(&sink) as _;
        let sup = Arc::new(ScanSupervisor::new(
            scanner,
            Duration::from_secs(5),
            Some(Duration::from_millis(100)),
            sink_dyn,
        ));

        sup.enable_background_scans();
        tokio::time::sleep(Duration::from_millis(450)).await;
        sup.disable_background_scans();

        let finishes = sink
            .events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Finished(ScanOutcome::Completed)))
            .count();
        assert!(finishes >= 2, "expected repeated background scans, got {finishes}");

        let count_after = sink.events().len();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(sink.events().len(), count_after);
    }
}
