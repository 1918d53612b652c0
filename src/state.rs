//! Canonical state mappings and the delta calculator.
//!
//! Existing and proposed configuration are both normalized into a
//! [`StateMap`] over a closed, feature-defined field enum before comparison.
//! A key present in one mapping but absent in the other means "no constraint
//! from the absent side": the delta only surfaces proposed pairs not already
//! satisfied by the device.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;

/// Marker trait for a feature's closed set of canonical field names.
///
/// Implemented by a per-feature enum so that field typos are unrepresentable.
/// `Display` renders the wire-facing field name used in reports.
pub trait Field: Copy + Eq + Hash + fmt::Display {}

/// A canonical field value: a primitive comparable between desired and
/// actual configuration. Unit conversions and enumerated-value translations
/// happen before a value lands here, so comparison is purely structural.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
        }
    }
}

impl FieldValue {
    /// The string form used when the value is interpolated into a command.
    pub fn as_command_arg(&self) -> String {
        self.to_string()
    }

    /// Returns the boolean if this value is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string slice if this value is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// An insertion-ordered mapping from canonical field to value.
///
/// Keys omitted are treated as absent ("no constraint"), never as an
/// explicit empty value. Constructed fresh per reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMap<F: Field> {
    entries: IndexMap<F, FieldValue>,
}

impl<F: Field> Default for StateMap<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Field> StateMap<F> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Insert a field value, replacing any previous value for the field.
    pub fn insert(&mut self, field: F, value: impl Into<FieldValue>) {
        self.entries.insert(field, value.into());
    }

    /// Insert only when the optional value is present. Fields the user left
    /// unset must never appear in a proposed mapping.
    pub fn insert_opt<V: Into<FieldValue>>(&mut self, field: F, value: Option<V>) {
        if let Some(v) = value {
            self.entries.insert(field, v.into());
        }
    }

    pub fn get(&self, field: F) -> Option<&FieldValue> {
        self.entries.get(&field)
    }

    /// Remove a field from the mapping, returning its value if present.
    pub fn remove(&mut self, field: F) -> Option<FieldValue> {
        self.entries.shift_remove(&field)
    }

    pub fn contains(&self, field: F) -> bool {
        self.entries.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &FieldValue)> {
        self.entries.iter().map(|(f, v)| (*f, v))
    }

    /// Serialize into a JSON object keyed by wire-facing field names, for
    /// inclusion in a reconciliation report.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (field, value) in self.iter() {
            let json = match value {
                FieldValue::Str(s) => serde_json::Value::String(s.clone()),
                FieldValue::Bool(b) => serde_json::Value::Bool(*b),
                FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            };
            map.insert(field.to_string(), json);
        }
        map
    }
}

impl<F: Field> FromIterator<(F, FieldValue)> for StateMap<F> {
    fn from_iter<I: IntoIterator<Item = (F, FieldValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Compute the minimal field set that must change to move `existing` toward
/// `proposed`.
///
/// Implemented as an asymmetric set difference over (field, value) pairs: a
/// pair from `proposed` survives iff that exact pair is not present in
/// `existing`. Fields only in `existing` never appear. Pure: identical
/// inputs always yield identical output, which is the idempotence contract
/// the rest of the system relies on to avoid redundant device writes.
pub fn delta<F: Field>(proposed: &StateMap<F>, existing: &StateMap<F>) -> StateMap<F> {
    proposed
        .iter()
        .filter(|(field, value)| existing.get(*field) != Some(*value))
        .map(|(field, value)| (field, value.clone()))
        .collect()
}
