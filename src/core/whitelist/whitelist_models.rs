// Whitelist domain models - plain data, no Discord or SQL types.
//
// An entry is keyed by the external user id. The nickname is whatever label the
// operator typed when adding it and is never used for lookups.

use std::fmt;
use std::str::FromStr;

/// Status tag stored alongside each entry.
///
/// Only `Whitelisted` exists today; the column is kept as text so pending/revoked
/// variants can be added without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistStatus {
    Whitelisted,
}

impl WhitelistStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhitelistStatus::Whitelisted => "wl",
        }
    }
}

impl fmt::Display for WhitelistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WhitelistStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wl" => Ok(WhitelistStatus::Whitelisted),
            other => Err(format!("unknown whitelist status: {other}")),
        }
    }
}

/// A persisted whitelist row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub user_id: String,
    pub nickname: String,
    pub status: WhitelistStatus,
}

/// What a store is asked to insert. Built by the service after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWhitelistEntry {
    pub user_id: String,
    pub nickname: String,
    pub status: WhitelistStatus,
}

impl NewWhitelistEntry {
    pub fn whitelisted(user_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            nickname: nickname.into(),
            status: WhitelistStatus::Whitelisted,
        }
    }
}

impl From<NewWhitelistEntry> for WhitelistEntry {
    fn from(entry: NewWhitelistEntry) -> Self {
        Self {
            user_id: entry.user_id,
            nickname: entry.nickname,
            status: entry.status,
        }
    }
}

/// Result of an add. A conflict is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new row was written.
    Added,
    /// A row with this user id already existed; nothing was written.
    AlreadyExists,
}
