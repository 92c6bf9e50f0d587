//! Snapshot and view identifiers.
//!
//! A `ViewId` is derived from (object identity, snapshot). Views built inline by
//! an assembler (motifs, compact variants) have no object of their own and take
//! their parent's id extended by a slot path.
//!
//! Wire form: `@id:<origin>[/<slot>...]!<snapshot>!`
//!
//! ```text
//! @id:4!2!        value #4, snapshot 2
//! @id:4/0/3!2!    inline view in slot 3 of slot 0 of value #4, snapshot 2
//! ```

use crate::value::ObjRef;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VIEW_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@id:(\d+)((?:/\d+)*)!(\d+)!$").expect("view id pattern compiles")
});

/// Identifies one capture event. Monotonically increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub u64);

impl SnapshotId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a cached view model, unique within a snapshot.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId {
    snapshot: SnapshotId,
    origin: ObjRef,
    path: SmallVec<[u32; 4]>,
}

impl ViewId {
    /// Id of the view of a runtime value.
    pub fn for_value(origin: ObjRef, snapshot: SnapshotId) -> Self {
        Self {
            snapshot,
            origin,
            path: SmallVec::new(),
        }
    }

    /// Id of the inline view held in `slot` of this view.
    pub fn child(&self, slot: u32) -> Self {
        let mut path = self.path.clone();
        path.push(slot);
        Self {
            snapshot: self.snapshot,
            origin: self.origin,
            path,
        }
    }

    pub fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    /// The value this view was derived from.
    pub fn origin(&self) -> ObjRef {
        self.origin
    }

    pub fn path(&self) -> &[u32] {
        &self.path
    }

    /// True for views built by an assembler rather than for a value.
    pub fn is_inline(&self) -> bool {
        !self.path.is_empty()
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@id:{}", self.origin.index())?;
        for slot in &self.path {
            write!(f, "/{}", slot)?;
        }
        write!(f, "!{}!", self.snapshot)
    }
}

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({})", self)
    }
}

/// Error parsing a `ViewId` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid view id '{0}': expected @id:<origin>[/<slot>...]!<snapshot>!")]
pub struct ViewIdError(pub String);

impl FromStr for ViewId {
    type Err = ViewIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = VIEW_ID_RE
            .captures(s)
            .ok_or_else(|| ViewIdError(s.to_string()))?;
        let invalid = || ViewIdError(s.to_string());

        let origin: u32 = caps[1].parse().map_err(|_| invalid())?;
        let snapshot: u64 = caps[3].parse().map_err(|_| invalid())?;
        let mut path = SmallVec::new();
        for slot in caps[2].split('/').filter(|part| !part.is_empty()) {
            path.push(slot.parse().map_err(|_| invalid())?);
        }

        Ok(Self {
            snapshot: SnapshotId(snapshot),
            origin: ObjRef::from_index(origin),
            path,
        })
    }
}

impl Serialize for ViewId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ViewId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_value_id_format() {
        let id = ViewId::for_value(ObjRef::from_index(4), SnapshotId(2));
        assert_eq!(id.to_string(), "@id:4!2!");
        assert!(!id.is_inline());
    }

    #[test]
    fn test_inline_id_format() {
        let id = ViewId::for_value(ObjRef::from_index(4), SnapshotId(2))
            .child(0)
            .child(3);
        assert_eq!(id.to_string(), "@id:4/0/3!2!");
        assert_eq!(id.path(), &[0, 3]);
        assert!(id.is_inline());
    }

    #[test]
    fn test_same_object_different_snapshots() {
        let obj = ObjRef::from_index(9);
        assert_ne!(
            ViewId::for_value(obj, SnapshotId(1)),
            ViewId::for_value(obj, SnapshotId(2))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("root".parse::<ViewId>().is_err());
        assert!("@id:1!".parse::<ViewId>().is_err());
        assert!("@id:1/!1!".parse::<ViewId>().is_err());
        assert!("@id:-1!1!".parse::<ViewId>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let id = ViewId::for_value(ObjRef::from_index(1), SnapshotId(7)).child(2);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""@id:1/2!7!""#);
        let back: ViewId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    proptest! {
        #[test]
        fn view_id_parses_its_display(
            origin in 0u32..100_000,
            snapshot in 0u64..1_000_000,
            path in prop::collection::vec(0u32..64, 0..5),
        ) {
            let mut id = ViewId::for_value(ObjRef::from_index(origin), SnapshotId(snapshot));
            for slot in path {
                id = id.child(slot);
            }
            let parsed: ViewId = id.to_string().parse().unwrap();
            prop_assert_eq!(parsed, id);
        }
    }
}
