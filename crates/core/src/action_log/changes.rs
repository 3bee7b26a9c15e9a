//! Field change sets: the payload carried by every action log record.
//!
//! A change set maps a field name to its `{ "old": .., "new": .. }` pair.
//! `old` is captured when the action is recorded; `new` is filled in lazily
//! when the action is undone, because before that the live entity already
//! holds the new value.
//!
//! Create and Delete records carry a single reserved key, [`ENTITY_KEY`],
//! holding the full entity snapshot on the relevant side.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Reserved change-set key holding a full entity snapshot.
pub const ENTITY_KEY: &str = "_entity";

/// Date format used when storing date-only fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A loosely-typed persisted value.
///
/// Serialized untagged, so the JSON stays `{"old": "Buy milk", "new": 3}`.
/// Objects only ever appear under [`ENTITY_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Snapshot(serde_json::Map<String, serde_json::Value>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text view of the value. Numbers and booleans are rendered, `Null`
    /// and snapshots have no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Integer(n) => Some(n.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null | Self::Snapshot(_) => None,
        }
    }

    /// Integer view. Accepts integral numbers and numeric strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|n| i32::try_from(n).ok())
    }

    /// Calendar-date view. Accepts `YYYY-MM-DD`, or a longer timestamp
    /// string whose first ten characters are a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        let Self::Text(s) = self else {
            return None;
        };
        let s = s.trim();
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok()))
    }

    /// Decode a full-entity snapshot into `E`.
    pub fn to_entity<E: DeserializeOwned>(&self) -> Option<E> {
        match self {
            Self::Snapshot(map) => {
                serde_json::from_value(serde_json::Value::Object(map.clone())).ok()
            }
            _ => None,
        }
    }

    /// Build a snapshot value from any serializable entity.
    pub fn snapshot_of<E: Serialize>(entity: &E) -> Self {
        match serde_json::to_value(entity) {
            Ok(serde_json::Value::Object(map)) => Self::Snapshot(map),
            _ => Self::Null,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        Self::Text(d.format(DATE_FORMAT).to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A single field's before/after pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(default)]
    pub old: FieldValue,
    #[serde(default)]
    pub new: FieldValue,
}

impl FieldChange {
    /// A change whose `new` side will be captured at undo time.
    pub fn old_only(old: impl Into<FieldValue>) -> Self {
        Self {
            old: old.into(),
            new: FieldValue::Null,
        }
    }

    pub fn new(old: impl Into<FieldValue>, new: impl Into<FieldValue>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

/// Field name -> change, in the order fields were touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(IndexMap<String, FieldChange>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change set for a Create record: the snapshot on the `new` side.
    pub fn created<E: Serialize>(entity: &E) -> Self {
        let mut set = Self::new();
        set.insert(
            ENTITY_KEY,
            FieldChange {
                old: FieldValue::Null,
                new: FieldValue::snapshot_of(entity),
            },
        );
        set
    }

    /// Change set for a Delete record: the snapshot on the `old` side.
    pub fn deleted<E: Serialize>(entity: &E) -> Self {
        let mut set = Self::new();
        set.insert(
            ENTITY_KEY,
            FieldChange {
                old: FieldValue::snapshot_of(entity),
                new: FieldValue::Null,
            },
        );
        set
    }

    /// Decode a persisted payload.
    ///
    /// Entries that do not decode as a [`FieldChange`] are dropped; a payload
    /// that is not a JSON object yields an empty set.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };
        let mut set = Self::new();
        for (field, raw) in map {
            match serde_json::from_value::<FieldChange>(raw.clone()) {
                Ok(change) => {
                    set.insert(field.clone(), change);
                }
                Err(e) => {
                    tracing::warn!(field = field.as_str(), error = %e, "Skipping undecodable field change");
                }
            }
        }
        set
    }

    /// Decode a persisted payload stored as a JSON string.
    pub fn from_json_str(raw: &str) -> Self {
        serde_json::from_str::<serde_json::Value>(raw)
            .map(|v| Self::from_json(&v))
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    pub fn insert(&mut self, field: impl Into<String>, change: FieldChange) {
        self.0.insert(field.into(), change);
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut FieldChange> {
        self.0.get_mut(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldChange)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut FieldChange)> {
        self.0.iter_mut()
    }

    /// Field names in touch order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The snapshot stored on the `old` side of [`ENTITY_KEY`], if any.
    pub fn old_snapshot<E: DeserializeOwned>(&self) -> Option<E> {
        self.get(ENTITY_KEY).and_then(|c| c.old.to_entity())
    }

    /// The snapshot stored on the `new` side of [`ENTITY_KEY`], if any.
    pub fn new_snapshot<E: DeserializeOwned>(&self) -> Option<E> {
        self.get(ENTITY_KEY).and_then(|c| c.new.to_entity())
    }
}

impl FromIterator<(String, FieldChange)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, FieldChange)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
