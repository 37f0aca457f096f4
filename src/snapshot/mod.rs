// Public API
pub use memory::InMemorySnapshotStore;
pub use postgres::PostgresSnapshotStore;
pub use store::SnapshotStore;

// Internal modules
mod memory;
mod postgres;
mod store;
