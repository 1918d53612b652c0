//! Ordered command plans with context nesting.
//!
//! A plan is a sequence of command groups. A group is either a flat list of
//! commands executed at the top configuration level, or a nested list: a
//! context-entry command (e.g. `interface Ethernet1/33`) followed by
//! sub-commands executed inside that context. Group order is significant and
//! preserved through serialization; default-reset groups are appended before
//! reconfiguration groups when both apply in one pass.

use serde::Serialize;

/// Delimiter used to flatten an ordered plan into the single command-string
/// payload NX-API expects.
pub const PAYLOAD_DELIMITER: &str = " ; ";

/// One ordered group of device CLI commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandGroup {
    /// Commands executed at the top configuration level.
    Flat(Vec<String>),
    /// A context-entry command followed by sub-commands executed inside it.
    Nested {
        context: String,
        commands: Vec<String>,
    },
}

impl CommandGroup {
    fn is_empty(&self) -> bool {
        match self {
            CommandGroup::Flat(commands) => commands.is_empty(),
            // A context entry with nothing under it is not a command.
            CommandGroup::Nested { commands, .. } => commands.is_empty(),
        }
    }
}

/// An ordered sequence of command groups implementing a delta or reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandPlan {
    groups: Vec<CommandGroup>,
}

impl CommandPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a flat group. Empty groups are dropped.
    pub fn push_flat(&mut self, commands: Vec<String>) {
        let group = CommandGroup::Flat(commands);
        if !group.is_empty() {
            self.groups.push(group);
        }
    }

    /// Append a context-nested group. Dropped when there are no sub-commands,
    /// so a bare context entry is never emitted.
    pub fn push_nested(&mut self, context: impl Into<String>, commands: Vec<String>) {
        let group = CommandGroup::Nested {
            context: context.into(),
            commands,
        };
        if !group.is_empty() {
            self.groups.push(group);
        }
    }

    /// True when no group contains any command: the pass is a no-op.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(CommandGroup::is_empty)
    }

    pub fn groups(&self) -> &[CommandGroup] {
        &self.groups
    }

    /// Flatten into ordered command lines. The context-entry line immediately
    /// precedes its nested lines; group append order is preserved.
    pub fn flatten(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for group in &self.groups {
            match group {
                CommandGroup::Flat(commands) => lines.extend(commands.iter().cloned()),
                CommandGroup::Nested { context, commands } => {
                    lines.push(context.clone());
                    lines.extend(commands.iter().cloned());
                }
            }
        }
        lines
    }

    /// Serialize into the single delimiter-joined payload submitted to the
    /// device in one config RPC.
    pub fn payload(&self) -> String {
        self.flatten().join(PAYLOAD_DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_plan() {
        let plan = CommandPlan::new();
        assert!(plan.is_empty());
        assert!(plan.flatten().is_empty());
        assert_eq!(plan.payload(), "");
    }

    #[test]
    fn test_flat_group_order() {
        let mut plan = CommandPlan::new();
        plan.push_flat(vec!["snmp-server community ops group network-operator".to_string()]);
        plan.push_flat(vec!["snmp-server community ops use-acl mgmt".to_string()]);
        assert_eq!(
            plan.flatten(),
            vec![
                "snmp-server community ops group network-operator",
                "snmp-server community ops use-acl mgmt",
            ]
        );
    }

    #[test]
    fn test_nested_context_first() {
        let mut plan = CommandPlan::new();
        plan.push_nested(
            "interface Ethernet1/33",
            vec![
                "no ip pim border".to_string(),
                "ip pim dr-priority 20".to_string(),
            ],
        );
        let lines = plan.flatten();
        assert_eq!(lines[0], "interface Ethernet1/33");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_bare_context_dropped() {
        let mut plan = CommandPlan::new();
        plan.push_nested("interface Ethernet1/33", vec![]);
        plan.push_flat(vec![]);
        assert!(plan.is_empty());
        assert!(plan.groups().is_empty());
    }

    #[test]
    fn test_payload_delimiter() {
        let mut plan = CommandPlan::new();
        plan.push_nested(
            "interface Ethernet1/33",
            vec!["ip pim sparse-mode".to_string()],
        );
        assert_eq!(
            plan.payload(),
            "interface Ethernet1/33 ; ip pim sparse-mode"
        );
    }
}
