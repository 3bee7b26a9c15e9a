//! Human-readable descriptions for action log records.

use crate::action_log::{ActionType, ChangeSet};

/// Describe a record when the caller supplied no description.
///
/// Reserved keys (leading `_`) are not listed.
pub fn describe(action_type: ActionType, changes: &ChangeSet) -> String {
    match action_type {
        ActionType::Create => return "Created".to_string(),
        ActionType::Delete => return "Deleted".to_string(),
        ActionType::Update => {}
    }

    let names: Vec<String> = changes
        .fields()
        .filter(|f| !f.starts_with('_'))
        .map(format_field_name)
        .collect();

    match names.as_slice() {
        [] => "Updated".to_string(),
        [only] => format!("Changed {only}"),
        [first, second] => format!("Changed {first} and {second}"),
        [first, second, rest @ ..] => {
            format!("Changed {first}, {second} and {} more", rest.len())
        }
    }
}

/// Render a PascalCase field key as lower-case words (`ContactId` -> `contact id`).
pub fn format_field_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for (i, c) in field.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push(' ');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Describe a status transition (`0` is active, anything else completed).
pub fn status_description(old_status: i32, new_status: i32) -> String {
    fn name(status: i32) -> &'static str {
        if status == 0 {
            "active"
        } else {
            "completed"
        }
    }
    format!(
        "Changed status from {} to {}",
        name(old_status),
        name(new_status)
    )
}
