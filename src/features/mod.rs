//! Feature modules.
//!
//! Each NX-OS feature area (SNMP community, PIM interface, ...) implements
//! [`FeatureModule`]: it normalizes the device's raw state and the user's
//! parameters into the same canonical mapping, and translates a delta plus
//! the requested state intent into an ordered command plan. The reconciler
//! in [`crate::engine`] drives these hooks; nothing here performs I/O except
//! the read-only precondition probes.

pub mod pim_interface;
pub mod snmp_community;

use crate::command::CommandPlan;
use crate::device::DeviceClient;
use crate::error::Result;
use crate::state::{Field, StateMap};
use serde::{Deserialize, Serialize};

/// Requested state intent for one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Converge the supplied fields onto the device.
    #[default]
    Present,
    /// Remove the entity's configuration.
    Absent,
    /// Reset every resettable field to its device-level default.
    Default,
}

impl std::fmt::Display for DesiredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesiredState::Present => write!(f, "present"),
            DesiredState::Absent => write!(f, "absent"),
            DesiredState::Default => write!(f, "default"),
        }
    }
}

/// One feature area's reconciliation hooks.
///
/// A module instance holds its already-validated, typed parameters and the
/// requested [`DesiredState`]. `Field` is the feature's closed canonical
/// field enum; `Flags` carries side-channel state extracted by the
/// normalizer that changes which commands are legal or required without
/// being part of the delta.
pub trait FeatureModule {
    type Field: Field;
    type Flags: Default + std::fmt::Debug;

    /// Feature name, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// The requested state intent.
    fn desired_state(&self) -> DesiredState;

    /// Cross-parameter validation. Runs before any device I/O.
    fn validate(&self) -> Result<()>;

    /// Read-only device probes that must pass before planning (required
    /// feature enabled, correct interface layer). The default accepts.
    fn preconditions(&self, device: &dyn DeviceClient) -> Result<()> {
        let _ = device;
        Ok(())
    }

    /// The `show` command whose structured body describes this entity.
    fn read_command(&self) -> String;

    /// Map the raw device body into the canonical existing-state mapping
    /// plus side-channel flags. `None` (entity unconfigured) yields an empty
    /// mapping.
    fn normalize_existing(
        &self,
        raw: Option<&serde_json::Value>,
    ) -> Result<(StateMap<Self::Field>, Self::Flags)>;

    /// Map user parameters into the canonical proposed-state mapping.
    /// Contains only fields the user explicitly supplied; enumerated-value
    /// translation and unit rescaling happen here, not later.
    fn build_proposed(&self) -> Result<StateMap<Self::Field>>;

    /// Translate the delta, existing state and side-channel flags into an
    /// ordered command plan for the requested intent. An empty plan is a
    /// true no-op.
    fn plan(
        &self,
        delta: &StateMap<Self::Field>,
        existing: &StateMap<Self::Field>,
        flags: &Self::Flags,
    ) -> Result<CommandPlan>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_desired_state_serde() {
        assert_eq!(
            serde_json::from_str::<DesiredState>(r#""present""#).unwrap(),
            DesiredState::Present
        );
        assert_eq!(
            serde_json::from_str::<DesiredState>(r#""absent""#).unwrap(),
            DesiredState::Absent
        );
        assert_eq!(
            serde_json::from_str::<DesiredState>(r#""default""#).unwrap(),
            DesiredState::Default
        );
        assert!(serde_json::from_str::<DesiredState>(r#""gone""#).is_err());
    }

    #[test]
    fn test_desired_state_default_is_present() {
        assert_eq!(DesiredState::default(), DesiredState::Present);
    }
}
