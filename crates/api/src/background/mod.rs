//! Background tasks and scheduled jobs.

pub mod action_log_compaction;
