//! Permission change request records.
//!
//! # Purpose
//! Defines the reviewable proposal an actor files to change an actor's,
//! profile's, or role's capabilities, and its `pending → approved | rejected`
//! lifecycle.
use chrono::{DateTime, Utc};
use gatehouse_authz::{ActorId, Dimension, ProfileId, RoleId};
use serde::{Deserialize, Serialize};

pub type RequestId = u64;

/// What a change request edits.
///
/// Serialized as `{"type": "actor", "id": "alice"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ChangeTarget {
    Actor(ActorId),
    Profile(ProfileId),
    Role(RoleId),
}

impl ChangeTarget {
    /// Audit subject key for this target, e.g. `actor:alice`.
    pub fn subject(&self) -> String {
        match self {
            ChangeTarget::Actor(id) => format!("actor:{id}"),
            ChangeTarget::Profile(id) => format!("profile:{id}"),
            ChangeTarget::Role(id) => format!("role:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    AddPage,
    RemovePage,
    AddWidget,
    RemoveWidget,
    ChangeRole,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::AddPage => "add_page",
            RequestKind::RemovePage => "remove_page",
            RequestKind::AddWidget => "add_widget",
            RequestKind::RemoveWidget => "remove_widget",
            RequestKind::ChangeRole => "change_role",
        }
    }

    /// Capability dimension edited by this kind; `None` for role swaps.
    pub fn dimension(self) -> Option<Dimension> {
        match self {
            RequestKind::AddPage | RequestKind::RemovePage => Some(Dimension::Pages),
            RequestKind::AddWidget | RequestKind::RemoveWidget => Some(Dimension::HomeWidgets),
            RequestKind::ChangeRole => None,
        }
    }

    pub fn is_removal(self) -> bool {
        matches!(self, RequestKind::RemovePage | RequestKind::RemoveWidget)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChangeRequest {
    pub id: RequestId,
    pub requester: ActorId,
    pub target: ChangeTarget,
    pub kind: RequestKind,
    pub value: String,
    pub justification: String,
    pub status: RequestStatus,
    pub reviewer: Option<ActorId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Submission payload; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewChangeRequest {
    pub requester: ActorId,
    pub target: ChangeTarget,
    pub kind: RequestKind,
    pub value: String,
    pub justification: String,
    pub created_at: DateTime<Utc>,
}

impl NewChangeRequest {
    pub fn into_request(self, id: RequestId) -> PermissionChangeRequest {
        PermissionChangeRequest {
            id,
            requester: self.requester,
            target: self.target,
            kind: self.kind,
            value: self.value,
            justification: self.justification,
            status: RequestStatus::Pending,
            reviewer: None,
            reviewed_at: None,
            created_at: self.created_at,
        }
    }
}
