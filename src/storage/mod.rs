pub mod blob;
pub mod database;
pub mod memory;
pub mod query;
pub mod repository;
pub mod sqlite;
pub mod traits;

pub use blob::{BlobStore, DEFAULT_NAMESPACE};
pub use database::Database;
pub use memory::MemoryBackend;
pub use query::{compare_values, sort_records, Criteria, Matcher, QueryOptions};
pub use repository::{generate_id, Collection, DEFAULT_LATENCY};
pub use sqlite::{SqliteBackend, SqliteStorage};
pub use traits::BlobBackend;
