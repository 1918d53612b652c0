//! SNMP community feature module.
//!
//! Manages one `snmp-server community` entry: its group binding (directly or
//! through the `ro`/`rw` access shorthand) and an optional ACL filter.
//! Communities support atomic removal, so `absent` is a single `no` command.

use super::{DesiredState, FeatureModule};
use crate::command::CommandPlan;
use crate::error::{Error, Result};
use crate::state::{Field, StateMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Group bound to read-only communities.
const RO_GROUP: &str = "network-operator";

/// Group bound to read-write communities.
const RW_GROUP: &str = "network-admin";

/// Access-level shorthand, expanded to a concrete group name at
/// proposed-state build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Ro,
    Rw,
}

impl AccessLevel {
    fn group_name(self) -> &'static str {
        match self {
            AccessLevel::Ro => RO_GROUP,
            AccessLevel::Rw => RW_GROUP,
        }
    }
}

/// Canonical fields of one community entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnmpField {
    Group,
    Acl,
}

impl fmt::Display for SnmpField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpField::Group => write!(f, "group"),
            SnmpField::Acl => write!(f, "acl"),
        }
    }
}

impl Field for SnmpField {}

/// User parameters, already schema-typed by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnmpCommunityParams {
    pub community: String,
    #[serde(default)]
    pub access: Option<AccessLevel>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub acl: Option<String>,
    #[serde(default)]
    pub state: DesiredState,
}

/// Feature module for one SNMP community.
pub struct SnmpCommunityModule {
    params: SnmpCommunityParams,
}

impl SnmpCommunityModule {
    pub fn new(params: SnmpCommunityParams) -> Self {
        Self { params }
    }

    /// Build from a JSON parameter object as produced by the schema loader.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let params: SnmpCommunityParams = serde_json::from_value(value)
            .map_err(|e| Error::Validation(format!("snmp_community parameters: {}", e)))?;
        Ok(Self::new(params))
    }

    /// The group the proposed state binds the community to.
    fn proposed_group(&self) -> Option<String> {
        self.params
            .group
            .clone()
            .or_else(|| self.params.access.map(|a| a.group_name().to_string()))
    }

    /// Rows of `show snmp community`, single object or array.
    fn community_rows(raw: &serde_json::Value) -> Vec<&serde_json::Value> {
        match raw.pointer("/TABLE_snmp_community/ROW_snmp_community") {
            Some(serde_json::Value::Array(rows)) => rows.iter().collect(),
            Some(row @ serde_json::Value::Object(_)) => vec![row],
            _ => Vec::new(),
        }
    }
}

impl FeatureModule for SnmpCommunityModule {
    type Field = SnmpField;
    type Flags = ();

    fn name(&self) -> &'static str {
        "snmp_community"
    }

    fn desired_state(&self) -> DesiredState {
        self.params.state
    }

    fn validate(&self) -> Result<()> {
        match (&self.params.access, &self.params.group) {
            (Some(_), Some(_)) => Err(Error::Validation(
                "access and group are mutually exclusive".to_string(),
            )),
            (None, None) => Err(Error::Validation(
                "one of access or group is required".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn read_command(&self) -> String {
        "show snmp community".to_string()
    }

    fn normalize_existing(
        &self,
        raw: Option<&serde_json::Value>,
    ) -> Result<(StateMap<SnmpField>, ())> {
        let mut existing = StateMap::new();
        let Some(raw) = raw else {
            return Ok((existing, ()));
        };

        for row in Self::community_rows(raw) {
            let name = row.get("community_name").and_then(|v| v.as_str());
            if name != Some(self.params.community.as_str()) {
                continue;
            }
            if let Some(group) = row.get("grouporaccess").and_then(|v| v.as_str()) {
                if !group.is_empty() {
                    existing.insert(SnmpField::Group, group);
                }
            }
            if let Some(acl) = row.get("aclfilter").and_then(|v| v.as_str()) {
                if !acl.is_empty() {
                    existing.insert(SnmpField::Acl, acl);
                }
            }
            break;
        }

        Ok((existing, ()))
    }

    fn build_proposed(&self) -> Result<StateMap<SnmpField>> {
        let mut proposed = StateMap::new();
        proposed.insert_opt(SnmpField::Group, self.proposed_group());
        proposed.insert_opt(SnmpField::Acl, self.params.acl.clone());
        Ok(proposed)
    }

    fn plan(
        &self,
        delta: &StateMap<SnmpField>,
        existing: &StateMap<SnmpField>,
        _flags: &(),
    ) -> Result<CommandPlan> {
        let community = &self.params.community;
        let mut plan = CommandPlan::new();

        match self.params.state {
            DesiredState::Present => {
                let mut commands = Vec::new();
                if let Some(group) = delta.get(SnmpField::Group) {
                    commands.push(format!(
                        "snmp-server community {} group {}",
                        community,
                        group.as_command_arg()
                    ));
                }
                if let Some(acl) = delta.get(SnmpField::Acl) {
                    commands.push(format!(
                        "snmp-server community {} use-acl {}",
                        community,
                        acl.as_command_arg()
                    ));
                }
                plan.push_flat(commands);
            }
            DesiredState::Absent => {
                // Atomic removal; nothing to do for an unconfigured entry.
                if !existing.is_empty() {
                    plan.push_flat(vec![format!("no snmp-server community {}", community)]);
                }
            }
            DesiredState::Default => {
                // The group binding is the entry itself; the ACL filter is
                // the only resettable field.
                if let Some(acl) = existing.get(SnmpField::Acl) {
                    plan.push_flat(vec![format!(
                        "no snmp-server community {} use-acl {}",
                        community,
                        acl.as_command_arg()
                    )]);
                }
            }
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::delta;
    use pretty_assertions::assert_eq;

    fn module(params: serde_json::Value) -> SnmpCommunityModule {
        SnmpCommunityModule::from_value(params).unwrap()
    }

    fn show_body(rows: serde_json::Value) -> serde_json::Value {
        serde_json::json!({"TABLE_snmp_community": {"ROW_snmp_community": rows}})
    }

    #[test]
    fn test_validate_mutual_exclusion() {
        let m = module(serde_json::json!({
            "community": "ops", "access": "ro", "group": "network-admin"
        }));
        assert!(matches!(m.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_one_required() {
        let m = module(serde_json::json!({"community": "ops"}));
        assert!(matches!(m.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_access_expands_to_group() {
        let m = module(serde_json::json!({"community": "ops", "access": "ro"}));
        let proposed = m.build_proposed().unwrap();
        assert_eq!(
            proposed.get(SnmpField::Group).unwrap().as_str(),
            Some("network-operator")
        );

        let m = module(serde_json::json!({"community": "ops", "access": "rw"}));
        let proposed = m.build_proposed().unwrap();
        assert_eq!(
            proposed.get(SnmpField::Group).unwrap().as_str(),
            Some("network-admin")
        );
    }

    #[test]
    fn test_unset_fields_never_appear() {
        let m = module(serde_json::json!({"community": "ops", "access": "ro"}));
        let proposed = m.build_proposed().unwrap();
        assert!(!proposed.contains(SnmpField::Acl));
    }

    #[test]
    fn test_normalize_matching_row() {
        let m = module(serde_json::json!({"community": "ops", "access": "ro"}));
        let raw = show_body(serde_json::json!([
            {"community_name": "other", "grouporaccess": "network-admin", "aclfilter": ""},
            {"community_name": "ops", "grouporaccess": "network-operator", "aclfilter": "mgmt"}
        ]));
        let (existing, ()) = m.normalize_existing(Some(&raw)).unwrap();
        assert_eq!(existing.get(SnmpField::Group).unwrap().as_str(), Some("network-operator"));
        assert_eq!(existing.get(SnmpField::Acl).unwrap().as_str(), Some("mgmt"));
    }

    #[test]
    fn test_normalize_single_row_object() {
        let m = module(serde_json::json!({"community": "ops", "access": "ro"}));
        let raw = show_body(serde_json::json!(
            {"community_name": "ops", "grouporaccess": "network-operator"}
        ));
        let (existing, ()) = m.normalize_existing(Some(&raw)).unwrap();
        assert_eq!(existing.len(), 1);
    }

    #[test]
    fn test_normalize_unconfigured_is_empty() {
        let m = module(serde_json::json!({"community": "ops", "access": "ro"}));
        let (existing, ()) = m.normalize_existing(None).unwrap();
        assert!(existing.is_empty());
    }

    #[test]
    fn test_present_plan_covers_delta_only() {
        let m = module(serde_json::json!({
            "community": "ops", "access": "ro", "acl": "mgmt"
        }));
        let proposed = m.build_proposed().unwrap();
        let raw = show_body(serde_json::json!(
            {"community_name": "ops", "grouporaccess": "network-operator", "aclfilter": ""}
        ));
        let (existing, ()) = m.normalize_existing(Some(&raw)).unwrap();
        let d = delta(&proposed, &existing);
        let plan = m.plan(&d, &existing, &()).unwrap();
        assert_eq!(
            plan.flatten(),
            vec!["snmp-server community ops use-acl mgmt"]
        );
    }

    #[test]
    fn test_present_converged_is_noop() {
        let m = module(serde_json::json!({"community": "ops", "access": "ro"}));
        let proposed = m.build_proposed().unwrap();
        let raw = show_body(serde_json::json!(
            {"community_name": "ops", "grouporaccess": "network-operator"}
        ));
        let (existing, ()) = m.normalize_existing(Some(&raw)).unwrap();
        let d = delta(&proposed, &existing);
        assert!(d.is_empty());
        assert!(m.plan(&d, &existing, &()).unwrap().is_empty());
    }

    #[test]
    fn test_absent_removes_existing() {
        let m = module(serde_json::json!({
            "community": "ops", "access": "ro", "state": "absent"
        }));
        let raw = show_body(serde_json::json!(
            {"community_name": "ops", "grouporaccess": "network-operator"}
        ));
        let (existing, ()) = m.normalize_existing(Some(&raw)).unwrap();
        let plan = m.plan(&StateMap::new(), &existing, &()).unwrap();
        assert_eq!(plan.flatten(), vec!["no snmp-server community ops"]);
    }

    #[test]
    fn test_absent_unconfigured_is_noop() {
        let m = module(serde_json::json!({
            "community": "ops", "access": "ro", "state": "absent"
        }));
        let (existing, ()) = m.normalize_existing(None).unwrap();
        let plan = m.plan(&StateMap::new(), &existing, &()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_default_resets_acl_only() {
        let m = module(serde_json::json!({
            "community": "ops", "access": "ro", "state": "default"
        }));
        let raw = show_body(serde_json::json!(
            {"community_name": "ops", "grouporaccess": "network-operator", "aclfilter": "mgmt"}
        ));
        let (existing, ()) = m.normalize_existing(Some(&raw)).unwrap();
        let plan = m.plan(&StateMap::new(), &existing, &()).unwrap();
        assert_eq!(
            plan.flatten(),
            vec!["no snmp-server community ops use-acl mgmt"]
        );
    }
}
