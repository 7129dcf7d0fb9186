//! Usage: Entitlement flags, allow-lists, and the user id -> flag mapping policy.
//!
//! Gating consults the premium and owner lists in that order; the first list a user
//! appears in decides the single flag pushed. The bug-hunter list is carried for the
//! metadata schema but never grants a flag on its own.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntitlementFlag {
    LumiPremium,
    ServerOwner,
    BugHunter,
}

impl EntitlementFlag {
    pub const ALL: [EntitlementFlag; 3] = [Self::LumiPremium, Self::ServerOwner, Self::BugHunter];

    /// Lists that admit a user, highest priority first.
    pub const GATING_PRIORITY: [EntitlementFlag; 2] = [Self::LumiPremium, Self::ServerOwner];

    /// Metadata key as registered with the platform.
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::LumiPremium => "lumipremium",
            Self::ServerOwner => "serverowner",
            Self::BugHunter => "bughunter",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_key().eq_ignore_ascii_case(key.trim()))
    }
}

impl std::fmt::Display for EntitlementFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Flag values pushed as role-connection metadata. Serializes as `{"key": bool, ...}`
/// containing only the flags that were set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitlementFlags {
    values: BTreeMap<EntitlementFlag, bool>,
}

impl EntitlementFlags {
    pub fn single(flag: EntitlementFlag) -> Self {
        let mut flags = Self::default();
        flags.set(flag, true);
        flags
    }

    pub fn set(&mut self, flag: EntitlementFlag, value: bool) {
        self.values.insert(flag, value);
    }

    pub fn get(&self, flag: EntitlementFlag) -> Option<bool> {
        self.values.get(&flag).copied()
    }
}

impl Serialize for EntitlementFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (flag, value) in &self.values {
            map.serialize_entry(flag.as_key(), value)?;
        }
        map.end()
    }
}

const DEFAULT_LUMIPREMIUM_USER_IDS: &[&str] = &["563697359423406082", "811314363830501427"];
const DEFAULT_SERVEROWNER_USER_IDS: &[&str] = &["811314363830501427"];
const DEFAULT_BUGHUNTER_USER_IDS: &[&str] = &["1167048853451706439"];

/// Immutable per-flag sets of qualifying user ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowLists {
    pub lumipremium: BTreeSet<String>,
    pub serverowner: BTreeSet<String>,
    pub bughunter: BTreeSet<String>,
}

impl Default for AllowLists {
    fn default() -> Self {
        fn to_set(ids: &[&str]) -> BTreeSet<String> {
            ids.iter().map(|id| id.to_string()).collect()
        }
        Self {
            lumipremium: to_set(DEFAULT_LUMIPREMIUM_USER_IDS),
            serverowner: to_set(DEFAULT_SERVEROWNER_USER_IDS),
            bughunter: to_set(DEFAULT_BUGHUNTER_USER_IDS),
        }
    }
}

impl AllowLists {
    pub fn empty() -> Self {
        Self {
            lumipremium: BTreeSet::new(),
            serverowner: BTreeSet::new(),
            bughunter: BTreeSet::new(),
        }
    }

    pub fn members(&self, flag: EntitlementFlag) -> &BTreeSet<String> {
        match flag {
            EntitlementFlag::LumiPremium => &self.lumipremium,
            EntitlementFlag::ServerOwner => &self.serverowner,
            EntitlementFlag::BugHunter => &self.bughunter,
        }
    }

    /// Replace one list; ids are trimmed and empty entries dropped.
    pub fn with_members<I, S>(mut self, flag: EntitlementFlag, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        match flag {
            EntitlementFlag::LumiPremium => self.lumipremium = set,
            EntitlementFlag::ServerOwner => self.serverowner = set,
            EntitlementFlag::BugHunter => self.bughunter = set,
        }
        self
    }

    pub fn contains(&self, flag: EntitlementFlag, user_id: &str) -> bool {
        self.members(flag).contains(user_id)
    }

    /// Flags pushed for `user_id`, or `None` when no gating list admits the user.
    pub fn resolve(&self, user_id: &str) -> Option<EntitlementFlags> {
        EntitlementFlag::GATING_PRIORITY
            .into_iter()
            .find(|flag| self.contains(*flag, user_id))
            .map(EntitlementFlags::single)
    }
}
