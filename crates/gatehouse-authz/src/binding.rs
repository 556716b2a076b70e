use crate::{ActorId, ProfileId, RoleId};
use serde::{Deserialize, Serialize};

/// Links one actor to its permission sources.
///
/// `is_admin` is the single admin-bypass site: every resolver function checks
/// it before anything else. `role_label` is the coarse label used to look up
/// rows of the visibility matrices; it never grants capability on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccessBinding {
    pub actor_id: ActorId,
    #[serde(default)]
    pub profile_id: Option<ProfileId>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_role_label")]
    pub role_label: String,
    #[serde(default)]
    pub version: u64,
}

impl UserAccessBinding {
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            profile_id: None,
            role_ids: Vec::new(),
            is_admin: false,
            role_label: default_role_label(),
            version: 0,
        }
    }

    pub fn with_profile(mut self, profile_id: ProfileId) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    pub fn with_role(mut self, role_id: RoleId) -> Self {
        if !self.role_ids.contains(&role_id) {
            self.role_ids.push(role_id);
        }
        self
    }

    pub fn with_role_label(mut self, label: impl Into<String>) -> Self {
        self.role_label = label.into();
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn references_role(&self, role_id: &RoleId) -> bool {
        self.role_ids.contains(role_id)
    }

    pub fn references_profile(&self, profile_id: &ProfileId) -> bool {
        self.profile_id.as_ref() == Some(profile_id)
    }
}

fn default_role_label() -> String {
    "user".to_string()
}
