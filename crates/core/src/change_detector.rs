//! Field-level diffing and replay for journaled entities.
//!
//! Each entity type registers its tracked fields once as a static table of
//! [`FieldSpec`]s. Diffing compares the read side of every spec; replay
//! parses the persisted [`FieldValue`] back through the write side and skips
//! anything it cannot parse.

use chrono::NaiveDate;

use crate::action_log::{ChangeSet, FieldChange, FieldValue};

/// Accessor pair for one tracked field.
pub struct FieldSpec<E> {
    /// Key written into change sets (PascalCase).
    pub name: &'static str,
    /// Current value in its persisted form.
    pub read: fn(&E) -> FieldValue,
    /// Parse and store a persisted value. Returns `false` when the value is
    /// unusable; the entity must be left untouched in that case.
    pub write: fn(&mut E, &FieldValue) -> bool,
}

/// An entity type with a registry of tracked fields.
pub trait Tracked: Sized + 'static {
    fn tracked_fields() -> &'static [FieldSpec<Self>];

    fn tracked_field(name: &str) -> Option<&'static FieldSpec<Self>> {
        Self::tracked_fields().iter().find(|f| f.name == name)
    }
}

/// Tracked fields whose value differs between `before` and `after`.
pub fn detect_changes<E: Tracked>(before: &E, after: &E) -> ChangeSet {
    E::tracked_fields()
        .iter()
        .filter_map(|field| {
            let old = (field.read)(before);
            let new = (field.read)(after);
            (old != new).then(|| (field.name.to_string(), FieldChange { old, new }))
        })
        .collect()
}

/// Write every `old` value of `changes` into `entity`. Returns the number of
/// fields applied.
pub fn apply_old<E: Tracked>(entity: &mut E, changes: &ChangeSet) -> usize {
    apply(entity, changes, |c| &c.old)
}

/// Write every `new` value of `changes` into `entity`. Returns the number of
/// fields applied.
pub fn apply_new<E: Tracked>(entity: &mut E, changes: &ChangeSet) -> usize {
    apply(entity, changes, |c| &c.new)
}

fn apply<E: Tracked>(
    entity: &mut E,
    changes: &ChangeSet,
    side: impl Fn(&FieldChange) -> &FieldValue,
) -> usize {
    let mut applied = 0;
    for (name, change) in changes.iter() {
        let Some(field) = E::tracked_field(name) else {
            continue;
        };
        if (field.write)(entity, side(change)) {
            applied += 1;
        } else {
            tracing::warn!(field = name.as_str(), "Skipping unparseable field value");
        }
    }
    applied
}

/// Overwrite the `new` side of every recognised field with the entity's
/// current value.
pub fn capture_new<E: Tracked>(entity: &E, changes: &mut ChangeSet) {
    for (name, change) in changes.iter_mut() {
        if let Some(field) = E::tracked_field(name) {
            change.new = (field.read)(entity);
        }
    }
}

// ---------------------------------------------------------------------------
// Parsers for field setters
// ---------------------------------------------------------------------------

/// Required text. `Null` is rejected.
pub fn set_text(target: &mut String, value: &FieldValue) -> bool {
    match value.as_text() {
        Some(text) => {
            *target = text;
            true
        }
        None => false,
    }
}

/// Optional text. `Null` clears it.
pub fn set_opt_text(target: &mut Option<String>, value: &FieldValue) -> bool {
    if value.is_null() {
        *target = None;
        return true;
    }
    match value.as_text() {
        Some(text) => {
            *target = Some(text);
            true
        }
        None => false,
    }
}

pub fn set_i32(target: &mut i32, value: &FieldValue) -> bool {
    match value.as_i32() {
        Some(n) => {
            *target = n;
            true
        }
        None => false,
    }
}

pub fn set_i64(target: &mut i64, value: &FieldValue) -> bool {
    match value.as_i64() {
        Some(n) => {
            *target = n;
            true
        }
        None => false,
    }
}

/// Optional reference id. `Null` clears it.
pub fn set_opt_i64(target: &mut Option<i64>, value: &FieldValue) -> bool {
    if value.is_null() {
        *target = None;
        return true;
    }
    match value.as_i64() {
        Some(n) => {
            *target = Some(n);
            true
        }
        None => false,
    }
}

/// Optional calendar date. `Null` clears it.
pub fn set_opt_date(target: &mut Option<NaiveDate>, value: &FieldValue) -> bool {
    if value.is_null() {
        *target = None;
        return true;
    }
    match value.as_date() {
        Some(date) => {
            *target = Some(date);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Card {
        title: String,
        due: Option<NaiveDate>,
        owner_id: Option<i64>,
        status: i32,
        scratch: String,
    }

    static CARD_FIELDS: &[FieldSpec<Card>] = &[
        FieldSpec {
            name: "Title",
            read: |c: &Card| c.title.as_str().into(),
            write: |c: &mut Card, v: &FieldValue| set_text(&mut c.title, v),
        },
        FieldSpec {
            name: "Due",
            read: |c: &Card| c.due.into(),
            write: |c: &mut Card, v: &FieldValue| set_opt_date(&mut c.due, v),
        },
        FieldSpec {
            name: "OwnerId",
            read: |c: &Card| c.owner_id.into(),
            write: |c: &mut Card, v: &FieldValue| set_opt_i64(&mut c.owner_id, v),
        },
        FieldSpec {
            name: "Status",
            read: |c: &Card| c.status.into(),
            write: |c: &mut Card, v: &FieldValue| set_i32(&mut c.status, v),
        },
    ];

    impl Tracked for Card {
        fn tracked_fields() -> &'static [FieldSpec<Self>] {
            CARD_FIELDS
        }
    }

    fn card() -> Card {
        Card {
            title: "Pay rent".into(),
            due: NaiveDate::from_ymd_opt(2026, 4, 1),
            owner_id: Some(3),
            status: 0,
            scratch: "x".into(),
        }
    }

    #[test]
    fn diff_lists_only_changed_tracked_fields() {
        let before = card();
        let mut after = card();
        after.title = "Pay rent early".into();
        after.owner_id = None;
        after.scratch = "untracked".into();

        let changes = detect_changes(&before, &after);

        assert_eq!(changes.fields().collect::<Vec<_>>(), vec!["Title", "OwnerId"]);
        let owner = changes.get("OwnerId").unwrap();
        assert_eq!(owner.old, FieldValue::Integer(3));
        assert!(owner.new.is_null());
    }

    #[test]
    fn identical_entities_have_empty_diff() {
        assert!(detect_changes(&card(), &card()).is_empty());
    }

    #[test]
    fn apply_old_and_new_replay_both_directions() {
        let before = card();
        let mut after = card();
        after.title = "Changed".into();
        after.due = None;
        after.status = 1;
        let changes = detect_changes(&before, &after);

        let mut live = after.clone();
        assert_eq!(apply_old(&mut live, &changes), 3);
        assert_eq!(live, before);

        assert_eq!(apply_new(&mut live, &changes), 3);
        assert_eq!(live, after);
    }

    #[test]
    fn malformed_and_unknown_fields_are_skipped() {
        let mut changes = ChangeSet::new();
        changes.insert("Due", FieldChange::old_only("not a date"));
        changes.insert("Status", FieldChange::old_only("three"));
        changes.insert("Title", FieldChange::old_only(FieldValue::Null));
        changes.insert("Colour", FieldChange::old_only("red"));
        changes.insert("OwnerId", FieldChange::old_only("12"));

        let mut live = card();
        assert_eq!(apply_old(&mut live, &changes), 1);
        assert_eq!(live.owner_id, Some(12));
        assert_eq!(live.title, "Pay rent");
        assert_eq!(live.due, NaiveDate::from_ymd_opt(2026, 4, 1));
        assert_eq!(live.status, 0);
    }

    #[test]
    fn capture_new_fills_recognised_fields_from_live_entity() {
        let mut changes = ChangeSet::new();
        changes.insert("Status", FieldChange::old_only(0));
        changes.insert("_entity", FieldChange::default());

        let mut live = card();
        live.status = 1;
        capture_new(&live, &mut changes);

        assert_eq!(changes.get("Status").unwrap().new, FieldValue::Integer(1));
        assert!(changes.get("_entity").unwrap().new.is_null());
    }
}
