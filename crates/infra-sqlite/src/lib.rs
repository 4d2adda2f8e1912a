// SimpleQ Infrastructure - SQLite Adapter
// Implements: Driver (set store with SADD / SPOP / INCR / SMEMBERS semantics)

mod connection;
mod driver;
mod migration;

pub use connection::create_pool;
pub use driver::SqliteDriver;
pub use migration::run_migrations;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for QueueError here)
