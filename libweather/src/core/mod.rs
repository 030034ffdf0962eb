//! Core infrastructure for storing and querying the weather database.
pub mod database;
pub mod loadable;
pub mod query;
