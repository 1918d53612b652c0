//! PIM interface feature module.
//!
//! Manages `ip pim` settings on one layer-3 interface: sparse mode, DR
//! priority, hello interval and authentication, border, and neighbor /
//! join-prune policies. PIM interface state has no atomic removal, so
//! `absent` is the default-reset sequence followed by disabling sparse mode.
//!
//! Requires `feature pim` on the device; both precondition probes run before
//! any plan is computed so a misconfigured target is rejected whole.

use super::{DesiredState, FeatureModule};
use crate::command::CommandPlan;
use crate::device::{DeviceClient, InterfaceLayer};
use crate::error::{Error, Result};
use crate::state::{Field, FieldValue, StateMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-level default DR priority.
const DEFAULT_DR_PRIO: &str = "1";

/// Device-level default hello interval, in milliseconds.
const DEFAULT_HELLO_INTERVAL_MS: &str = "30000";

/// Canonical fields of PIM state on one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PimField {
    Sparse,
    DrPrio,
    HelloInterval,
    Border,
    NeighborPolicy,
    NeighborType,
    JpPolicyIn,
    JpTypeIn,
    JpPolicyOut,
    JpTypeOut,
}

impl fmt::Display for PimField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PimField::Sparse => "sparse",
            PimField::DrPrio => "dr_prio",
            PimField::HelloInterval => "hello_interval",
            PimField::Border => "border",
            PimField::NeighborPolicy => "neighbor_policy",
            PimField::NeighborType => "neighbor_type",
            PimField::JpPolicyIn => "jp_policy_in",
            PimField::JpTypeIn => "jp_type_in",
            PimField::JpPolicyOut => "jp_policy_out",
            PimField::JpTypeOut => "jp_type_out",
        };
        write!(f, "{}", name)
    }
}

impl Field for PimField {}

/// How a policy name is referenced in commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    Prefix,
    Routemap,
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyType::Prefix => write!(f, "prefix"),
            PolicyType::Routemap => write!(f, "routemap"),
        }
    }
}

impl PolicyType {
    fn from_canonical(value: &FieldValue) -> Option<PolicyType> {
        match value.as_str() {
            Some("prefix") => Some(PolicyType::Prefix),
            Some("routemap") => Some(PolicyType::Routemap),
            _ => None,
        }
    }
}

/// Side-channel state extracted by the normalizer.
///
/// Hello authentication is never value-comparable (the key cannot be read
/// back), and a bidirectional join-prune policy changes the removal grammar.
/// When both are set the join-prune fields are excluded from the comparable
/// mapping and the policy is retained here for removal planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PimFlags {
    pub auth_configured: bool,
    pub jp_bidir: bool,
    pub bidir_policy: Option<(String, PolicyType)>,
}

/// User parameters, already schema-typed by the caller. `hello_interval` is
/// given in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PimInterfaceParams {
    pub interface: String,
    #[serde(default)]
    pub sparse: Option<bool>,
    #[serde(default)]
    pub dr_prio: Option<i64>,
    #[serde(default)]
    pub hello_auth_key: Option<String>,
    #[serde(default)]
    pub hello_interval: Option<i64>,
    #[serde(default)]
    pub border: Option<bool>,
    #[serde(default)]
    pub neighbor_policy: Option<String>,
    #[serde(default)]
    pub neighbor_type: Option<PolicyType>,
    #[serde(default)]
    pub jp_policy_in: Option<String>,
    #[serde(default)]
    pub jp_type_in: Option<PolicyType>,
    #[serde(default)]
    pub jp_policy_out: Option<String>,
    #[serde(default)]
    pub jp_type_out: Option<PolicyType>,
    #[serde(default)]
    pub state: DesiredState,
}

/// Feature module for PIM settings on one interface.
pub struct PimInterfaceModule {
    params: PimInterfaceParams,
}

impl PimInterfaceModule {
    pub fn new(params: PimInterfaceParams) -> Self {
        Self { params }
    }

    /// Build from a JSON parameter object as produced by the schema loader.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let params: PimInterfaceParams = serde_json::from_value(value)
            .map_err(|e| Error::Validation(format!("pim_interface parameters: {}", e)))?;
        Ok(Self::new(params))
    }

    /// The `ROW_iod` object for this interface, tolerating both the bare and
    /// the vrf-wrapped table layout.
    fn interface_row(raw: &serde_json::Value) -> Option<&serde_json::Value> {
        let row = raw
            .pointer("/TABLE_iod/ROW_iod")
            .or_else(|| raw.pointer("/TABLE_vrf/ROW_vrf/TABLE_iod/ROW_iod"))?;
        match row {
            serde_json::Value::Array(rows) => rows.first(),
            other => Some(other),
        }
    }

    fn neighbor_command(name: &str, policy_type: PolicyType) -> String {
        match policy_type {
            PolicyType::Prefix => format!("ip pim neighbor-policy prefix-list {}", name),
            PolicyType::Routemap => format!("ip pim neighbor-policy {}", name),
        }
    }

    fn jp_command(name: &str, policy_type: PolicyType, direction: Option<&str>) -> String {
        let mut cmd = match policy_type {
            PolicyType::Prefix => format!("ip pim jp-policy prefix-list {}", name),
            PolicyType::Routemap => format!("ip pim jp-policy {}", name),
        };
        if let Some(direction) = direction {
            cmd.push(' ');
            cmd.push_str(direction);
        }
        cmd
    }

    /// Reset every currently-set, resettable field back to its device
    /// default. Sparse mode is the enable flag and is not part of this
    /// sequence. Fields already at their default are skipped.
    fn default_reset_commands(existing: &StateMap<PimField>, flags: &PimFlags) -> Vec<String> {
        let mut commands = Vec::new();

        if let Some(prio) = existing.get(PimField::DrPrio) {
            if prio.as_str() != Some(DEFAULT_DR_PRIO) {
                commands.push("no ip pim dr-priority".to_string());
            }
        }
        if let Some(interval) = existing.get(PimField::HelloInterval) {
            if interval.as_str() != Some(DEFAULT_HELLO_INTERVAL_MS) {
                commands.push("no ip pim hello-interval".to_string());
            }
        }
        if flags.auth_configured {
            commands.push("no ip pim hello-authentication ah-md5".to_string());
        }
        if existing.get(PimField::Border).and_then(FieldValue::as_bool) == Some(true) {
            commands.push("no ip pim border".to_string());
        }
        if let (Some(name), Some(ptype)) = (
            existing.get(PimField::NeighborPolicy).and_then(FieldValue::as_str),
            existing
                .get(PimField::NeighborType)
                .and_then(PolicyType::from_canonical),
        ) {
            commands.push(format!("no {}", Self::neighbor_command(name, ptype)));
        }

        if flags.jp_bidir {
            // A bidirectional policy is removed once, without a direction.
            if let Some((name, ptype)) = &flags.bidir_policy {
                commands.push(format!("no {}", Self::jp_command(name, *ptype, None)));
            }
        } else {
            for (policy_field, type_field, direction) in [
                (PimField::JpPolicyIn, PimField::JpTypeIn, "in"),
                (PimField::JpPolicyOut, PimField::JpTypeOut, "out"),
            ] {
                if let (Some(name), Some(ptype)) = (
                    existing.get(policy_field).and_then(FieldValue::as_str),
                    existing.get(type_field).and_then(PolicyType::from_canonical),
                ) {
                    commands.push(format!(
                        "no {}",
                        Self::jp_command(name, ptype, Some(direction))
                    ));
                }
            }
        }

        commands
    }

    /// Commands setting exactly the delta fields for a `present` pass.
    fn present_commands(&self, delta: &StateMap<PimField>, flags: &PimFlags) -> Vec<String> {
        let mut commands = Vec::new();

        if let Some(sparse) = delta.get(PimField::Sparse).and_then(FieldValue::as_bool) {
            commands.push(if sparse {
                "ip pim sparse-mode".to_string()
            } else {
                "no ip pim sparse-mode".to_string()
            });
        }
        if let Some(prio) = delta.get(PimField::DrPrio) {
            commands.push(format!("ip pim dr-priority {}", prio.as_command_arg()));
        }
        if let Some(interval) = delta.get(PimField::HelloInterval) {
            commands.push(format!("ip pim hello-interval {}", interval.as_command_arg()));
        }
        if let Some(border) = delta.get(PimField::Border).and_then(FieldValue::as_bool) {
            commands.push(if border {
                "ip pim border".to_string()
            } else {
                "no ip pim border".to_string()
            });
        }

        // Policy name and type render as one command; a change to either
        // member of the pair re-emits it.
        if delta.contains(PimField::NeighborPolicy) || delta.contains(PimField::NeighborType) {
            if let (Some(name), Some(ptype)) =
                (&self.params.neighbor_policy, self.params.neighbor_type)
            {
                commands.push(Self::neighbor_command(name, ptype));
            }
        }
        if delta.contains(PimField::JpPolicyIn) || delta.contains(PimField::JpTypeIn) {
            if let (Some(name), Some(ptype)) = (&self.params.jp_policy_in, self.params.jp_type_in) {
                commands.push(Self::jp_command(name, ptype, Some("in")));
            }
        }
        if delta.contains(PimField::JpPolicyOut) || delta.contains(PimField::JpTypeOut) {
            if let (Some(name), Some(ptype)) = (&self.params.jp_policy_out, self.params.jp_type_out)
            {
                commands.push(Self::jp_command(name, ptype, Some("out")));
            }
        }

        // The key is never readable back, so it is applied whenever supplied
        // on an interface that does not already have authentication.
        if let Some(key) = &self.params.hello_auth_key {
            if !flags.auth_configured {
                commands.push(format!("ip pim hello-authentication ah-md5 {}", key));
            }
        }

        commands
    }
}

/// Reads a value NX-OS reports either as a JSON bool or as "true"/"false".
fn row_bool(row: &serde_json::Value, key: &str) -> bool {
    match row.get(key) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => s == "true",
        _ => false,
    }
}

/// Reads a value NX-OS reports either as a JSON number or a string. Empty
/// strings and the literal "none" mean unset.
fn row_string(row: &serde_json::Value, key: &str) -> Option<String> {
    match row.get(key) {
        Some(serde_json::Value::String(s)) if !s.is_empty() && s != "none" => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn policy_type_of(row: &serde_json::Value, prefix_list_key: &str) -> PolicyType {
    if row_bool(row, prefix_list_key) {
        PolicyType::Prefix
    } else {
        PolicyType::Routemap
    }
}

impl FeatureModule for PimInterfaceModule {
    type Field = PimField;
    type Flags = PimFlags;

    fn name(&self) -> &'static str {
        "pim_interface"
    }

    fn desired_state(&self) -> DesiredState {
        self.params.state
    }

    fn validate(&self) -> Result<()> {
        for (policy, ptype, policy_name, type_name) in [
            (
                self.params.neighbor_policy.is_some(),
                self.params.neighbor_type.is_some(),
                "neighbor_policy",
                "neighbor_type",
            ),
            (
                self.params.jp_policy_in.is_some(),
                self.params.jp_type_in.is_some(),
                "jp_policy_in",
                "jp_type_in",
            ),
            (
                self.params.jp_policy_out.is_some(),
                self.params.jp_type_out.is_some(),
                "jp_policy_out",
                "jp_type_out",
            ),
        ] {
            if policy != ptype {
                return Err(Error::Validation(format!(
                    "{} and {} must be supplied together",
                    policy_name, type_name
                )));
            }
        }

        if let Some(interval) = self.params.hello_interval {
            if !(1..=18724).contains(&interval) {
                return Err(Error::Validation(format!(
                    "hello_interval must be 1-18724 seconds, got {}",
                    interval
                )));
            }
        }
        if let Some(prio) = self.params.dr_prio {
            if prio < 1 {
                return Err(Error::Validation(format!(
                    "dr_prio must be at least 1, got {}",
                    prio
                )));
            }
        }

        Ok(())
    }

    fn preconditions(&self, device: &dyn DeviceClient) -> Result<()> {
        if !device.feature_enabled("pim")? {
            return Err(Error::Precondition(
                "feature pim is not enabled on the device".to_string(),
            ));
        }
        if device.interface_layer(&self.params.interface)? != InterfaceLayer::Layer3 {
            return Err(Error::Precondition(format!(
                "interface {} is a layer2 port; PIM requires a layer3 interface",
                self.params.interface
            )));
        }
        Ok(())
    }

    fn read_command(&self) -> String {
        format!("show ip pim interface {}", self.params.interface)
    }

    fn normalize_existing(
        &self,
        raw: Option<&serde_json::Value>,
    ) -> Result<(StateMap<PimField>, PimFlags)> {
        let mut existing = StateMap::new();
        let mut flags = PimFlags::default();

        let Some(row) = raw.and_then(Self::interface_row) else {
            return Ok((existing, flags));
        };

        existing.insert(PimField::Sparse, row_bool(row, "is-pim-enabled"));
        existing.insert_opt(PimField::DrPrio, row_string(row, "dr-priority"));
        existing.insert_opt(PimField::HelloInterval, row_string(row, "hello-interval"));
        existing.insert(PimField::Border, row_bool(row, "is-border"));

        if let Some(name) = row_string(row, "nbr-policy-name") {
            let ptype = policy_type_of(row, "is-nbr-policy-prefix-list");
            existing.insert(PimField::NeighborPolicy, name);
            existing.insert(PimField::NeighborType, ptype.to_string());
        }
        if let Some(name) = row_string(row, "jp-in-policy-name") {
            let ptype = policy_type_of(row, "is-jp-in-policy-prefix-list");
            existing.insert(PimField::JpPolicyIn, name);
            existing.insert(PimField::JpTypeIn, ptype.to_string());
        }
        if let Some(name) = row_string(row, "jp-out-policy-name") {
            let ptype = policy_type_of(row, "is-jp-out-policy-prefix-list");
            existing.insert(PimField::JpPolicyOut, name);
            existing.insert(PimField::JpTypeOut, ptype.to_string());
        }

        flags.auth_configured = row_bool(row, "is-hello-auth-configured");
        flags.jp_bidir = row_bool(row, "is-jp-bidir");
        if flags.jp_bidir {
            flags.bidir_policy = existing
                .get(PimField::JpPolicyIn)
                .and_then(FieldValue::as_str)
                .map(|name| {
                    (
                        name.to_string(),
                        policy_type_of(row, "is-jp-in-policy-prefix-list"),
                    )
                });
        }

        // Bidirectional policy plus authentication is a compound state that
        // is converged by command sequencing, not value comparison.
        if flags.jp_bidir && flags.auth_configured {
            existing.remove(PimField::JpPolicyIn);
            existing.remove(PimField::JpTypeIn);
            existing.remove(PimField::JpPolicyOut);
            existing.remove(PimField::JpTypeOut);
        }

        Ok((existing, flags))
    }

    fn build_proposed(&self) -> Result<StateMap<PimField>> {
        let mut proposed = StateMap::new();
        proposed.insert_opt(PimField::Sparse, self.params.sparse);
        proposed.insert_opt(
            PimField::DrPrio,
            self.params.dr_prio.map(|v| v.to_string()),
        );
        // The device reports the hello interval in milliseconds; rescale the
        // user's seconds here so comparison is purely structural.
        proposed.insert_opt(
            PimField::HelloInterval,
            self.params.hello_interval.map(|v| (v * 1000).to_string()),
        );
        proposed.insert_opt(PimField::Border, self.params.border);
        proposed.insert_opt(PimField::NeighborPolicy, self.params.neighbor_policy.clone());
        proposed.insert_opt(
            PimField::NeighborType,
            self.params.neighbor_type.map(|t| t.to_string()),
        );
        proposed.insert_opt(PimField::JpPolicyIn, self.params.jp_policy_in.clone());
        proposed.insert_opt(
            PimField::JpTypeIn,
            self.params.jp_type_in.map(|t| t.to_string()),
        );
        proposed.insert_opt(PimField::JpPolicyOut, self.params.jp_policy_out.clone());
        proposed.insert_opt(
            PimField::JpTypeOut,
            self.params.jp_type_out.map(|t| t.to_string()),
        );
        Ok(proposed)
    }

    fn plan(
        &self,
        delta: &StateMap<PimField>,
        existing: &StateMap<PimField>,
        flags: &PimFlags,
    ) -> Result<CommandPlan> {
        let mut plan = CommandPlan::new();

        let commands = match self.params.state {
            DesiredState::Present => self.present_commands(delta, flags),
            DesiredState::Default => Self::default_reset_commands(existing, flags),
            DesiredState::Absent => {
                let mut commands = Self::default_reset_commands(existing, flags);
                if existing.get(PimField::Sparse).and_then(FieldValue::as_bool) == Some(true) {
                    commands.push("no ip pim sparse-mode".to_string());
                }
                commands
            }
        };

        plan.push_nested(format!("interface {}", self.params.interface), commands);
        Ok(plan)
    }
}
