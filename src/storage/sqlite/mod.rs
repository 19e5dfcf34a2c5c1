mod backend;
mod connection;

pub use backend::SqliteBackend;
pub use connection::SqliteStorage;
