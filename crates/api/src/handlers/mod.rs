//! HTTP handlers, one module per resource.
//!
//! Entity handlers go through the per-type [`MutationService`] so every
//! create, update, and delete is journaled for undo.
//!
//! [`MutationService`]: doit_core::mutation::MutationService

pub mod dependencies;
pub mod history;
pub mod notes;
pub mod persons;
pub mod tags;
pub mod todo_items;
pub mod user_config;
