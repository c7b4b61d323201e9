pub mod memory;
pub mod postgres;
pub mod sled;

pub use memory::MemoryUsageStore;
pub use postgres::PostgresUsageStore;
pub use sled::SledUsageStore;
