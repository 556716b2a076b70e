use crate::AuthzError;
use serde::{Deserialize, Serialize};

/// Per-module access level.
///
/// Variants are declared in ascending order so the derived `Ord` gives
/// `blocked < read < write < admin`, which the aggregator relies on when it
/// keeps the maximum level per module.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Blocked,
    Read,
    Write,
    Admin,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Blocked => "blocked",
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Admin => "admin",
        }
    }

    /// Whether this level satisfies `required`.
    pub fn satisfies(self, required: AccessLevel) -> bool {
        self >= required
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "blocked" => Ok(AccessLevel::Blocked),
            "read" => Ok(AccessLevel::Read),
            "write" => Ok(AccessLevel::Write),
            "admin" => Ok(AccessLevel::Admin),
            other => Err(AuthzError::UnknownLevel(other.to_string())),
        }
    }
}
