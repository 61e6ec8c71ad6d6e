//! Capability permissions.
//!
//! Permissions form a closed enumeration; anything else arriving at the
//! boundary (request payload or database row) is rejected rather than carried
//! along as an opaque string. An operation's capability check passes when the
//! caller's set intersects the operation's required set.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors produced when building a [`PermissionSet`] from untrusted input.
#[derive(thiserror::Error, Debug, Clone)]
pub enum PermissionError {
    /// A token outside the closed enumeration.
    #[error("unknown permission: {0}")]
    Unknown(String),
    /// Every identity carries at least one permission.
    #[error("permission set cannot be empty")]
    Empty,
}

/// A single capability an identity may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Full access; satisfies every capability check it is named in.
    Admin,
    /// Baseline permission granted at signup.
    User,
    ItemCreate,
    ItemUpdate,
    ItemDelete,
    /// May replace another identity's permission set.
    PermissionUpdate,
}

impl Permission {
    /// All permissions, in display order.
    pub const ALL: [Self; 6] = [
        Self::Admin,
        Self::User,
        Self::ItemCreate,
        Self::ItemUpdate,
        Self::ItemDelete,
        Self::PermissionUpdate,
    ];

    /// The wire/storage token for this permission.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
            Self::ItemCreate => "ITEM_CREATE",
            Self::ItemUpdate => "ITEM_UPDATE",
            Self::ItemDelete => "ITEM_DELETE",
            Self::PermissionUpdate => "PERMISSION_UPDATE",
        }
    }

    /// Parse a wire/storage token.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Unknown`] for any token outside the
    /// enumeration.
    pub fn parse(s: &str) -> Result<Self, PermissionError> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            "ITEM_CREATE" => Ok(Self::ItemCreate),
            "ITEM_UPDATE" => Ok(Self::ItemUpdate),
            "ITEM_DELETE" => Ok(Self::ItemDelete),
            "PERMISSION_UPDATE" => Ok(Self::PermissionUpdate),
            other => Err(PermissionError::Unknown(other.to_owned())),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A non-empty, duplicate-free set of [`Permission`]s.
///
/// Small enough that a sorted `Vec` beats a hash set; serializes as a JSON
/// array of tokens and stores as `TEXT[]` in Postgres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet(Vec<Permission>);

impl PermissionSet {
    /// The set every new identity starts with: `{USER}`.
    #[must_use]
    pub fn default_user() -> Self {
        Self(vec![Permission::User])
    }

    /// Build a set from permissions, deduplicating.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Empty`] if no permissions are supplied.
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Result<Self, PermissionError> {
        let mut inner: Vec<Permission> = permissions.into_iter().collect();
        inner.sort_by_key(|p| p.as_str());
        inner.dedup();

        if inner.is_empty() {
            return Err(PermissionError::Empty);
        }

        Ok(Self(inner))
    }

    /// Build a set from wire/storage tokens, rejecting unknown ones.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Unknown`] for any unrecognized token and
    /// [`PermissionError::Empty`] for an empty list.
    pub fn from_tokens<S: AsRef<str>>(
        tokens: impl IntoIterator<Item = S>,
    ) -> Result<Self, PermissionError> {
        let parsed = tokens
            .into_iter()
            .map(|t| Permission::parse(t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    /// Whether this set contains a specific permission.
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// The capability check: does this set intersect the required set?
    #[must_use]
    pub fn intersects(&self, required: &[Permission]) -> bool {
        required.iter().any(|p| self.contains(*p))
    }

    /// Iterate over the permissions.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// The wire/storage tokens for this set, for `TEXT[]` binding.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.0.iter().map(|p| p.as_str().to_owned()).collect()
    }
}

impl TryFrom<Vec<Permission>> for PermissionSet {
    type Error = PermissionError;

    fn try_from(permissions: Vec<Permission>) -> Result<Self, Self::Error> {
        Self::new(permissions)
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for p in Permission::ALL {
            assert_eq!(Permission::parse(p.as_str()).unwrap(), p);
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            Permission::parse("SUPERUSER"),
            Err(PermissionError::Unknown(_))
        ));
        // Tokens are case-sensitive on the wire
        assert!(Permission::parse("admin").is_err());
    }

    #[test]
    fn test_default_user() {
        let set = PermissionSet::default_user();
        assert!(set.contains(Permission::User));
        assert!(!set.contains(Permission::Admin));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            PermissionSet::new([]),
            Err(PermissionError::Empty)
        ));
    }

    #[test]
    fn test_deduplicates() {
        let set = PermissionSet::new([Permission::User, Permission::User]).unwrap();
        assert_eq!(set.tokens(), vec!["USER".to_owned()]);
    }

    #[test]
    fn test_intersects() {
        let set = PermissionSet::new([Permission::User, Permission::ItemDelete]).unwrap();
        assert!(set.intersects(&[Permission::Admin, Permission::ItemDelete]));
        assert!(!set.intersects(&[Permission::Admin, Permission::PermissionUpdate]));
        assert!(!set.intersects(&[]));
    }

    #[test]
    fn test_from_tokens() {
        let set = PermissionSet::from_tokens(["ADMIN", "USER"]).unwrap();
        assert!(set.contains(Permission::Admin));

        assert!(matches!(
            PermissionSet::from_tokens(["USER", "ROOT"]),
            Err(PermissionError::Unknown(_))
        ));
    }

    #[test]
    fn test_serde_as_token_array() {
        let set = PermissionSet::new([Permission::Admin, Permission::User]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[\"ADMIN\",\"USER\"]");

        let parsed: PermissionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
    }

    #[test]
    fn test_serde_rejects_empty() {
        assert!(serde_json::from_str::<PermissionSet>("[]").is_err());
    }

    #[test]
    fn test_serde_rejects_unknown() {
        assert!(serde_json::from_str::<PermissionSet>("[\"ROOT\"]").is_err());
    }
}
