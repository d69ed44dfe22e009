//! Database layer for Waymark

mod connection;
mod content_repository;
mod migrations;
mod state_repository;

pub use connection::Database;
pub use content_repository::{ContentRepository, LibSqlContentRepository};
pub use state_repository::{LibSqlStateRepository, StateRepository};
