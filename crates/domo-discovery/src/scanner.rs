//! The scanner capability implemented by bindings.

use crate::result::DiscoveryResult;
use crate::supervisor::ScanSession;
use async_trait::async_trait;
use std::sync::Arc;

/// A binding-supplied procedure that searches for candidate devices.
///
/// Scanners are registered with the
/// [`DiscoveryCoordinator`](crate::DiscoveryCoordinator) and run under a
/// [`ScanSupervisor`](crate::ScanSupervisor) on their own task, so a slow or
/// blocking scanner cannot stall other scanners or the coordinator.
///
/// Cancellation is cooperative: a scanner looping over long blocking
/// operations must poll [`ScanContext::is_cancelled`] (or await
/// [`ScanContext::cancelled`]) at reasonable intervals. A single long
/// blocking call is expected to be bounded by its own transport-level
/// timeout; the supervisor will not wait for it past the scan deadline and
/// discards anything it emits afterwards.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Stable identifier of this scanner, unique per coordinator
    fn scanner_id(&self) -> &str;

    /// Runs one scan, emitting every candidate device found through the
    /// context. Returning an error marks the scan as failed; the supervisor
    /// logs it and returns to idle.
    async fn scan(&self, ctx: ScanContext) -> anyhow::Result<()>;
}

/// Handle a scanner uses to report results and observe cancellation
#[derive(Clone)]
pub struct ScanContext {
    session: Arc<ScanSession>,
}

impl ScanContext {
    pub(crate) fn new(session: Arc<ScanSession>) -> Self {
        Self { session }
    }

    /// Reports a candidate device.
    ///
    /// The first result for a device instance during a scan is forwarded as
    /// *new*; a later result for the same instance supersedes it and is
    /// forwarded as *updated* (latest wins). Results emitted after the scan
    /// has been stopped or timed out are discarded.
    pub fn emit(&self, result: DiscoveryResult) {
        self.session.emit(result);
    }

    /// Returns true once the scan has been cancelled (stop request or
    /// timeout). Long-running scanners must poll this between operations.
    pub fn is_cancelled(&self) -> bool {
        self.session.is_cancelled()
    }

    /// Completes once the scan has been cancelled. Convenient for async
    /// scanners that want to `select!` against their own work.
    pub async fn cancelled(&self) {
        self.session.cancelled().await;
    }
}
