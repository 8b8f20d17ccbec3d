//! Device discovery engine for the Domo platform.
//!
//! Bindings contribute [`Scanner`] implementations that search a physical or
//! network address space for candidate devices. This crate supervises those
//! scanners and aggregates what they find:
//!
//! - Each registered scanner runs under its own [`ScanSupervisor`]: a small
//!   state machine (`Idle → Scanning → Stopping → Idle`) that starts the scan
//!   on its own task, enforces a watchdog timeout, deduplicates emitted
//!   results per scan, and drops anything a scanner emits after its deadline.
//! - The [`DiscoveryCoordinator`] owns all supervisors, fans result
//!   notifications out to subscribed listeners, keeps the shared result
//!   table, and periodically sweeps results whose TTL has elapsed.
//!
//! Scanners are cancelled cooperatively: the supervisor signals the scan
//! context and stops listening, it never force-kills binding code. Scanners
//! doing long blocking calls are expected to bound them with their own
//! transport-level timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use domo_core::types::{DeviceInstanceId, DeviceTypeId};
//! use domo_discovery::{
//!     DiscoveryConfig, DiscoveryCoordinator, DiscoveryResult, ScanContext, Scanner,
//!     ScannerConfig,
//! };
//!
//! struct DemoScanner;
//!
//! #[async_trait]
//! impl Scanner for DemoScanner {
//!     fn scanner_id(&self) -> &str {
//!         "demo"
//!     }
//!
//!     async fn scan(&self, ctx: ScanContext) -> anyhow::Result<()> {
//!         let type_id = DeviceTypeId::new("demo", "lamp")?;
//!         let id = DeviceInstanceId::new(type_id, "0001")?;
//!         ctx.emit(DiscoveryResult::builder(id).label("Demo lamp").build());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let coordinator = DiscoveryCoordinator::new(DiscoveryConfig::default())?;
//!     coordinator.start();
//!     coordinator.register(Arc::new(DemoScanner), ScannerConfig::default())?;
//!     coordinator.start_all_scans();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod result;
pub mod scanner;
pub mod supervisor;

pub use config::{DiscoveryConfig, ScannerConfig};
pub use coordinator::{
    DiscoveryCoordinator, DiscoveryEvent, DiscoveryListener, ListenerId, ScanStart,
};
pub use error::{DiscoveryError, Result};
pub use result::{DiscoveryResult, DiscoveryResultBuilder, ResultTtl};
pub use scanner::{ScanContext, Scanner};
pub use supervisor::{ResultSink, ScanOutcome, ScanState, ScanSupervisor};
