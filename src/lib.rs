//! Forum post and topic storage.
//!
//! A SQLite-backed data-access layer for forum discussions: validated and
//! stamped writes, soft delete with undelete, denormalized response counters
//! kept in step with post mutations, topic subscriptions, and post search.

pub mod config;
pub mod db;
pub mod error;
pub mod store;
