//! Core engine for the Doit task manager.
//!
//! Holds everything that does not need a database: the action log
//! (undo/redo journal) engine and its store abstraction, the field-level
//! change detector, and the generic mutation orchestration that ties entity
//! persistence to the journal.

pub mod action_log;
pub mod change_detector;
pub mod clock;
pub mod error;
pub mod memory;
pub mod mutation;
pub mod types;
