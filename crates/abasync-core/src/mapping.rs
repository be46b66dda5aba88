//! CRM field mapping types.
//!
//! A mapping says which combined-record field feeds which Pipedrive field on
//! which entity. Mappings are configured by users and consumed by the CRM
//! write side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CRM entity a mapping targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Person,
    Deal,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Organization, Self::Person, Self::Deal];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Person => "person",
            Self::Deal => "deal",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" => Ok(Self::Organization),
            "person" => Ok(Self::Person),
            "deal" => Ok(Self::Deal),
            other => Err(format!("invalid entity type: {other}")),
        }
    }
}

/// One source field to CRM field assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field name in the combined record (e.g. `ADR_NAME`).
    pub source: String,
    /// Pipedrive field key (e.g. `name` or a custom field hash).
    pub target: String,
    pub entity: EntityKind,
}

impl FieldMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>, entity: EntityKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            entity,
        }
    }
}

/// Switches controlling how records are pushed to the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Look up organizations by name before creating one.
    #[serde(default = "default_true")]
    pub check_organizations: bool,
    /// Look up persons by name before creating one.
    #[serde(default = "default_true")]
    pub check_persons: bool,
    /// Push records one after another, stopping at the first failure.
    #[serde(default = "default_true")]
    pub sequential_status: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            check_organizations: true,
            check_persons: true,
            sequential_status: true,
        }
    }
}
