//! Domain model structs and DTOs.
//!
//! Each entity submodule contains:
//! - A `FromRow` + `Serialize` + `Deserialize` entity struct matching the row
//!   (deserializable so action log snapshots can be restored)
//! - Its tracked-field registry for the change detector
//! - `Validate` create and update DTOs

pub mod action_log;
pub mod dependency;
pub mod note;
pub mod person;
pub mod tag;
pub mod todo_item;
pub mod user_config;

use validator::ValidationErrors;

/// Flatten validator output into one message (`caption: length; ...`).
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
            format!("{field}: {}", codes.join(", "))
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
