//! Access attempt records and the aggregate report built from them.
use chrono::{DateTime, Utc};
use gatehouse_authz::{ActorId, DenialReason};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessResource {
    Page,
    Module,
    SidebarSection,
    Widget,
}

impl AccessResource {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessResource::Page => "page",
            AccessResource::Module => "module",
            AccessResource::SidebarSection => "sidebar_section",
            AccessResource::Widget => "widget",
        }
    }
}

impl std::fmt::Display for AccessResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluated access check. `denial_reason` is set exactly when
/// `granted` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAttemptLog {
    pub actor: ActorId,
    pub resource: AccessResource,
    pub key: String,
    pub granted: bool,
    pub denial_reason: Option<DenialReason>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeniedKeyCount {
    pub resource: AccessResource,
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessReport {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub granted: u64,
    pub denied: u64,
    pub unique_actors: u64,
    /// Most denied keys, highest count first; ties ordered by resource then key.
    pub top_denied: Vec<DeniedKeyCount>,
}
