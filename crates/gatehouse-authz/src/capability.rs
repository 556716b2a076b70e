//! Capability sets and per-dimension grants.
//!
//! # Purpose
//! Defines the three string-keyed capability dimensions shared by profiles and
//! custom roles, and the [`Grant`] type that the aggregator produces for each
//! dimension once all sources are merged.
//!
//! # Key invariants
//! - Persisted sets are plain string arrays (sorted, de-duplicated).
//! - [`WILDCARD`] anywhere in a source set means "every key" for that
//!   dimension; once a grant is [`Grant::All`] nothing can narrow it.
use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Pages,
    SidebarSections,
    HomeWidgets,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [
        Dimension::Pages,
        Dimension::SidebarSections,
        Dimension::HomeWidgets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Pages => "pages",
            Dimension::SidebarSections => "sidebar_sections",
            Dimension::HomeWidgets => "home_widgets",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pages, sidebar sections, and home widgets granted by one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    #[serde(default)]
    pub pages: BTreeSet<String>,
    #[serde(default)]
    pub sidebar_sections: BTreeSet<String>,
    #[serde(default)]
    pub home_widgets: BTreeSet<String>,
}

impl CapabilitySet {
    pub fn with_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with(Dimension::Pages, pages)
    }

    /// Builder-style insert of several keys into one dimension.
    pub fn with<I, S>(mut self, dimension: Dimension, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_mut(dimension)
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn get(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::Pages => &self.pages,
            Dimension::SidebarSections => &self.sidebar_sections,
            Dimension::HomeWidgets => &self.home_widgets,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut BTreeSet<String> {
        match dimension {
            Dimension::Pages => &mut self.pages,
            Dimension::SidebarSections => &mut self.sidebar_sections,
            Dimension::HomeWidgets => &mut self.home_widgets,
        }
    }

    pub fn is_empty(&self) -> bool {
        Dimension::ALL.iter().all(|dim| self.get(*dim).is_empty())
    }

    /// Reject blank keys; they would otherwise read as "public".
    pub fn validate(&self) -> AuthzResult<()> {
        for dimension in Dimension::ALL {
            if let Some(key) = self.get(dimension).iter().find(|key| key.trim().is_empty()) {
                return Err(AuthzError::InvalidKey {
                    dimension: dimension.as_str(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Merged grant for a single dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "keys", rename_all = "snake_case")]
pub enum Grant {
    All,
    Only(BTreeSet<String>),
}

impl Default for Grant {
    fn default() -> Self {
        Grant::Only(BTreeSet::new())
    }
}

impl Grant {
    pub fn is_all(&self) -> bool {
        matches!(self, Grant::All)
    }

    pub fn contains(&self, key: &str) -> bool {
        match self {
            Grant::All => true,
            Grant::Only(keys) => keys.contains(key),
        }
    }

    /// Union `keys` into this grant. Stops at the first wildcard.
    pub(crate) fn absorb<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Grant::Only(current) = self else {
            return;
        };
        let mut saw_wildcard = false;
        for key in keys {
            let key = key.as_ref();
            if key == WILDCARD {
                saw_wildcard = true;
                break;
            }
            current.insert(key.to_string());
        }
        if saw_wildcard {
            *self = Grant::All;
        }
    }
}
