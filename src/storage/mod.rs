//! SQLite ticket persistence

mod database;

pub use database::{Database, PoolConfig, SharedDatabase};
