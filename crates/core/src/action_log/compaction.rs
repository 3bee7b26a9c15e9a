//! Day-granular compaction planning.
//!
//! Stale active records of one stack are grouped by the UTC calendar date of
//! `occurred_at`. A day with several records becomes one merged, compacted
//! Update record stamped at the end of that day; a day with a single record
//! is only flagged compacted.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::action_log::{
    ActionLog, ActionType, ChangeSet, CompactionPlan, FieldChange, NewActionLog, StackKey,
};
use crate::types::Timestamp;

/// Build the compaction plan for one stack.
///
/// `stale` must belong to `key` and be active; order does not matter.
pub fn plan_stack(key: &StackKey, stale: &[ActionLog]) -> CompactionPlan {
    let mut by_day: BTreeMap<NaiveDate, Vec<&ActionLog>> = BTreeMap::new();
    for record in stale {
        by_day
            .entry(record.occurred_at.date_naive())
            .or_default()
            .push(record);
    }

    let mut plan = CompactionPlan::default();
    for (day, mut records) in by_day {
        if records.len() == 1 {
            plan.flag_ids.push(records[0].id);
            continue;
        }

        records.sort_by_key(|r| (r.occurred_at, r.id));
        plan.delete_ids.extend(records.iter().map(|r| r.id));
        plan.merged.push(NewActionLog {
            user_id: key.user_id,
            entity_type: key.entity_type.clone(),
            entity_id: key.entity_id,
            action_type: ActionType::Update,
            changes: merge_changes(&records),
            occurred_at: end_of_day(day),
            is_compacted: true,
            description: Some(format!(
                "Changes on {} ({} edits)",
                day.format("%b %d, %Y"),
                records.len()
            )),
        });
    }
    plan
}

/// Union of the fields touched by `records` (oldest first).
///
/// Each field keeps the `old` value of the first record that touched it.
/// `new` is left empty: it is only meaningful relative to a later undo.
pub fn merge_changes(records: &[&ActionLog]) -> ChangeSet {
    let mut merged = ChangeSet::new();
    for record in records {
        for (field, change) in record.changes.iter() {
            if !merged.contains(field) {
                merged.insert(field.clone(), FieldChange::old_only(change.old.clone()));
            }
        }
    }
    merged
}

/// Last second of a UTC calendar day.
pub fn end_of_day(day: NaiveDate) -> Timestamp {
    day.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| day.and_time(chrono::NaiveTime::default()))
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::FieldValue;
    use chrono::{TimeZone, Utc};

    fn record(id: i64, at: Timestamp, field: &str, old: &str) -> ActionLog {
        let mut changes = ChangeSet::new();
        changes.insert(field, FieldChange::new(old, "ignored"));
        ActionLog {
            id,
            user_id: 1,
            entity_type: "TodoItem".into(),
            entity_id: 9,
            action_type: ActionType::Update,
            changes,
            occurred_at: at,
            is_compacted: false,
            undone_at: None,
            description: None,
        }
    }

    #[test]
    fn merges_same_day_keeping_first_old_value() {
        let key = StackKey::new(1, "TodoItem", 9);
        let day = |h| Utc.with_ymd_and_hms(2026, 1, 5, h, 0, 0).unwrap();
        let stale = vec![
            record(1, day(8), "Caption", "A1"),
            record(2, day(9), "Content", "B1"),
            record(3, day(10), "Caption", "A2"),
        ];

        let plan = plan_stack(&key, &stale);

        assert_eq!(plan.delete_ids, vec![1, 2, 3]);
        assert!(plan.flag_ids.is_empty());
        assert_eq!(plan.merged.len(), 1);

        let merged = &plan.merged[0];
        assert_eq!(merged.action_type, ActionType::Update);
        assert!(merged.is_compacted);
        assert_eq!(merged.changes.len(), 2);
        assert_eq!(merged.changes.get("Caption").unwrap().old, FieldValue::from("A1"));
        assert!(merged.changes.get("Caption").unwrap().new.is_null());
        assert_eq!(merged.changes.get("Content").unwrap().old, FieldValue::from("B1"));
        assert_eq!(
            merged.occurred_at,
            Utc.with_ymd_and_hms(2026, 1, 5, 23, 59, 59).unwrap()
        );
        assert_eq!(
            merged.description.as_deref(),
            Some("Changes on Jan 05, 2026 (3 edits)")
        );
    }

    #[test]
    fn lone_records_are_flagged_in_place() {
        let key = StackKey::new(1, "TodoItem", 9);
        let stale = vec![
            record(4, Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap(), "Caption", "A"),
            record(5, Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap(), "Caption", "B"),
        ];

        let plan = plan_stack(&key, &stale);

        assert_eq!(plan.flag_ids, vec![4, 5]);
        assert!(plan.delete_ids.is_empty());
        assert!(plan.merged.is_empty());
    }

    #[test]
    fn unordered_input_is_merged_oldest_first() {
        let key = StackKey::new(1, "TodoItem", 9);
        let day = |h| Utc.with_ymd_and_hms(2026, 1, 5, h, 0, 0).unwrap();
        let stale = vec![
            record(7, day(15), "Caption", "later"),
            record(6, day(7), "Caption", "earlier"),
        ];

        let plan = plan_stack(&key, &stale);

        assert_eq!(plan.delete_ids, vec![6, 7]);
        assert_eq!(
            plan.merged[0].changes.get("Caption").unwrap().old,
            FieldValue::from("earlier")
        );
    }

    #[test]
    fn empty_input_gives_empty_plan() {
        let key = StackKey::new(1, "TodoItem", 9);
        assert!(plan_stack(&key, &[]).is_empty());
    }
}
