//! # Nexible - Declarative NX-OS Feature Configuration
//!
//! Nexible manages individual feature areas of Cisco NX-OS switches (SNMP
//! communities, PIM interface settings, ...) declaratively over the NX-API
//! HTTP/HTTPS interface. Each invocation reconciles one feature on one device:
//! the desired configuration fragment is compared against the device's actual
//! state and the minimal set of CLI commands that closes the gap is computed
//! and applied.
//!
//! ## Core Concepts
//!
//! - **Canonical state mapping**: normalized field -> value representation,
//!   comparable between desired and actual configuration
//! - **Delta**: the minimal field set needed to move actual state toward
//!   desired state (asymmetric - fields only present on the device never
//!   force a change)
//! - **Command plan**: ordered, possibly context-nested, list of device CLI
//!   commands implementing a delta or reset
//! - **Feature module**: per-feature normalizer, proposed-state builder and
//!   command planner behind a common trait
//! - **Reconciler**: the apply/report driver honoring check mode
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     CLI Interface                          │
//! │               (clap-based command parsing)                 │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Reconciler                            │
//! │   validate → preconditions → read → normalize → build      │
//! │          → delta → plan → (check | submit + re-read)       │
//! └────────────────────────────────────────────────────────────┘
//!              │                                │
//!              ▼                                ▼
//! ┌────────────────────────┐      ┌────────────────────────────┐
//! │    Feature Modules     │      │       Device Client        │
//! │  (snmp_community,      │      │   (NX-API over reqwest)    │
//! │   pim_interface)       │      │                            │
//! └────────────────────────┘      └────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use nexible::prelude::*;
//!
//! fn main() -> nexible::Result<()> {
//!     let device = NxapiClient::new(DeviceConfig::from_env()?)?;
//!     let module = SnmpCommunityModule::from_value(serde_json::json!({
//!         "community": "ops",
//!         "access": "ro",
//!         "state": "present",
//!     }))?;
//!
//!     let report = Reconciler::new().run(&module, &device)?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::command::{CommandGroup, CommandPlan};
    pub use crate::device::nxapi::NxapiClient;
    pub use crate::device::{DeviceClient, DeviceConfig, InterfaceLayer};
    pub use crate::engine::{ReconcileReport, Reconciler};
    pub use crate::error::{Error, Result};
    pub use crate::features::pim_interface::PimInterfaceModule;
    pub use crate::features::snmp_community::SnmpCommunityModule;
    pub use crate::features::{DesiredState, FeatureModule};
    pub use crate::state::{delta, FieldValue, StateMap};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for reconciliation operations.
///
/// Distinguishes validation failures (before any device I/O), precondition
/// failures (after read-only device calls), device command rejections and
/// transport failures.
pub mod error;

/// Canonical state mappings and the delta calculator.
///
/// Desired and actual configuration are both normalized into ordered
/// field -> value mappings over a closed, feature-defined field enum, then
/// compared pairwise. The asymmetric set difference is the minimal change
/// set the planner turns into commands.
pub mod state;

/// Ordered command plans with context nesting and payload serialization.
pub mod command;

/// Device client interface and the NX-API transport implementation.
pub mod device;

/// Feature modules: per-feature normalizer, builder and planner.
///
/// Each NX-OS feature area implements [`FeatureModule`](features::FeatureModule)
/// with its own typed parameters, canonical field enum and command grammar.
pub mod features;

/// The apply/report driver orchestrating one reconciliation pass.
pub mod engine;

pub use error::{Error, Result};

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of Nexible.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
