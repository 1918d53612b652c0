//! The apply/report driver.
//!
//! One reconciliation pass per call: validate parameters, probe
//! preconditions, read and normalize existing state, build the proposed
//! state, compute the delta, plan commands, then either report (check mode)
//! or submit the whole plan as one payload and re-read the device.
//!
//! The driver holds no state across passes and performs no local locking;
//! serializing concurrent changes to the same device is the caller's
//! responsibility.

use crate::device::DeviceClient;
use crate::error::Result;
use crate::features::FeatureModule;
use crate::state::delta;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of one reconciliation pass.
///
/// `final` equals the re-normalized post-apply state when a payload was
/// submitted, else the pre-apply existing state. `changed` is true iff a
/// non-empty payload was actually submitted; in check mode it reports the
/// would-be value.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub proposed: serde_json::Map<String, serde_json::Value>,
    pub existing: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "final")]
    pub end_state: serde_json::Map<String, serde_json::Value>,
    pub commands: Vec<String>,
    pub changed: bool,
}

/// Drives one feature module against one device.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    check_mode: bool,
    settle_delay: Option<Duration>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report what would change without submitting anything.
    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Fixed wait between submission and the post-apply re-read, giving the
    /// device's control plane time to converge. A pragmatic wait, not a
    /// correctness guarantee.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    /// Run one reconciliation pass.
    ///
    /// Errors abort the pass: validation failures before any device I/O,
    /// precondition failures after read-only calls, submission failures
    /// verbatim from the device with no retry, no partial rollback and no
    /// post-failure re-read.
    pub fn run<M: FeatureModule>(
        &self,
        module: &M,
        device: &dyn DeviceClient,
    ) -> Result<ReconcileReport> {
        module.validate()?;
        module.preconditions(device)?;

        let read_command = module.read_command();
        let raw = device.read_feature_state(&read_command)?;
        let (existing, flags) = module.normalize_existing(raw.as_ref())?;
        let proposed = module.build_proposed()?;
        let pending = delta(&proposed, &existing);

        debug!(
            feature = module.name(),
            state = %module.desired_state(),
            existing = existing.len(),
            proposed = proposed.len(),
            delta = pending.len(),
            "computed delta"
        );

        let plan = module.plan(&pending, &existing, &flags)?;
        let commands = plan.flatten();

        if commands.is_empty() {
            debug!(feature = module.name(), "already converged");
            return Ok(ReconcileReport {
                proposed: proposed.to_json(),
                existing: existing.to_json(),
                end_state: existing.to_json(),
                commands,
                changed: false,
            });
        }

        if self.check_mode {
            info!(
                feature = module.name(),
                commands = commands.len(),
                "check mode: reporting without applying"
            );
            return Ok(ReconcileReport {
                proposed: proposed.to_json(),
                existing: existing.to_json(),
                end_state: existing.to_json(),
                commands,
                changed: true,
            });
        }

        info!(
            feature = module.name(),
            commands = commands.len(),
            "submitting configuration"
        );
        device.submit(&plan.payload())?;

        if let Some(delay) = self.settle_delay {
            std::thread::sleep(delay);
        }

        let raw_after = device.read_feature_state(&read_command)?;
        let (end_state, _) = module.normalize_existing(raw_after.as_ref())?;

        Ok(ReconcileReport {
            proposed: proposed.to_json(),
            existing: existing.to_json(),
            end_state: end_state.to_json(),
            commands,
            changed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_final_key() {
        let report = ReconcileReport {
            proposed: serde_json::Map::new(),
            existing: serde_json::Map::new(),
            end_state: serde_json::Map::new(),
            commands: vec![],
            changed: false,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("final").is_some());
        assert!(json.get("end_state").is_none());
    }
}
