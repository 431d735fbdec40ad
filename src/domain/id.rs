//! Typed identifiers
//!
//! A single generic `Id<K>` tagged by a zero-sized kind marker. Identifiers of
//! different kinds share one representation but never unify:
//!
//! ```compile_fail
//! use points_ledger::domain::{AccountId, MemberId};
//!
//! let member = MemberId::generate();
//! let account: AccountId = member;
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::error::ValueError;

/// Marker for an identifier kind.
pub trait IdKind {
    /// Name used in error messages and `Debug` output.
    const NAME: &'static str;
}

/// Kind marker for points accounts.
#[derive(Debug)]
pub enum AccountKind {}

impl IdKind for AccountKind {
    const NAME: &'static str = "AccountId";
}

/// Kind marker for loyalty members.
#[derive(Debug)]
pub enum MemberKind {}

impl IdKind for MemberKind {
    const NAME: &'static str = "MemberId";
}

pub type AccountId = Id<AccountKind>;
pub type MemberId = Id<MemberKind>;

/// Opaque 128-bit identifier of kind `K`.
///
/// The nil UUID is the "empty" identifier. It exists only so that unassigned
/// fields have a value; aggregate operations reject it.
pub struct Id<K: IdKind> {
    value: Uuid,
    _kind: PhantomData<fn() -> K>,
}

impl<K: IdKind> Id<K> {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub fn from_uuid(value: Uuid) -> Self {
        Self {
            value,
            _kind: PhantomData,
        }
    }

    pub fn empty() -> Self {
        Self::from_uuid(Uuid::nil())
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }

    pub fn kind_name() -> &'static str {
        K::NAME
    }
}

impl<K: IdKind> Clone for Id<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: IdKind> Copy for Id<K> {}

impl<K: IdKind> PartialEq for Id<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K: IdKind> Eq for Id<K> {}

impl<K: IdKind> PartialOrd for Id<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: IdKind> Ord for Id<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<K: IdKind> Hash for Id<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K: IdKind> Default for Id<K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: IdKind> fmt::Debug for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", K::NAME, self.value)
    }
}

impl<K: IdKind> fmt::Display for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<K: IdKind> FromStr for Id<K> {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self::from_uuid)
            .map_err(|_| ValueError::MalformedId {
                kind: K::NAME,
                value: s.to_string(),
            })
    }
}

impl<K: IdKind> From<Uuid> for Id<K> {
    fn from(value: Uuid) -> Self {
        Self::from_uuid(value)
    }
}

impl<K: IdKind> Serialize for Id<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, K: IdKind> Deserialize<'de> for Id<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_is_unique_and_non_empty() {
        let a = AccountId::generate();
        let b = AccountId::generate();

        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_default_is_empty() {
        let id = MemberId::default();
        assert!(id.is_empty());
        assert_eq!(id, MemberId::empty());
    }

    #[test]
    fn test_parse_round_trip() {
        let id = AccountId::generate();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_malformed_names_kind() {
        let result = "not-a-uuid".parse::<MemberId>();
        assert_eq!(
            result,
            Err(ValueError::MalformedId {
                kind: "MemberId",
                value: "not-a-uuid".to_string(),
            })
        );
    }

    #[test]
    fn test_same_bits_equal_within_kind() {
        let uuid = Uuid::new_v4();
        let mut set = HashSet::new();
        set.insert(AccountId::from_uuid(uuid));
        assert!(set.contains(&AccountId::from(uuid)));
    }

    #[test]
    fn test_debug_shows_kind() {
        let id = AccountId::empty();
        assert_eq!(
            format!("{:?}", id),
            "AccountId(00000000-0000-0000-0000-000000000000)"
        );
    }

    #[test]
    fn test_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&MemberId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));

        let back: MemberId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_uuid(), &uuid);
    }
}
