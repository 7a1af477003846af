pub mod manager;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager, DbContext};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use record::{Record, RecordError};
pub use store::{Filter, Link, ListQuery, OrderBy, Page, Store, StoreError};
