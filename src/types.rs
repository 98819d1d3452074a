//! Core identifier types for the object tree.

use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// ItemId: handle to one rendered row of the tree.
///
/// Stable for as long as the row exists; unloading or removing a row retires its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) usize);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// ObjectId: server-side identity of a database object (`_id`).
///
/// The backend sends these either as integers (OIDs) or strings, so both are accepted
/// and kept in their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        ObjectId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, when it is one.
    pub fn as_number(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok()
    }

    /// Compare two ids numerically, falling back to text order for non-numeric ids.
    pub fn numeric_cmp(&self, other: &ObjectId) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        ObjectId(value.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        ObjectId(value)
    }
}

macro_rules! object_id_from_int {
    ($($int:ty),*) => {
        $(
            impl From<$int> for ObjectId {
                fn from(value: $int) -> Self {
                    ObjectId(value.to_string())
                }
            }
        )*
    };
}

object_id_from_int!(i32, i64, u32, u64);

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Unsigned(u64),
            Float(f64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(v) => ObjectId(v.to_string()),
            RawId::Unsigned(v) => ObjectId(v.to_string()),
            RawId::Float(v) => ObjectId(v.to_string()),
            RawId::Text(v) => ObjectId(v),
        })
    }
}
