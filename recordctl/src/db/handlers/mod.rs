//! Record store implementations.
//!
//! - [`Records`]: PostgreSQL via a shared `sqlx::PgPool`
//! - [`InMemoryRecords`]: a `Vec` behind a lock, for development seeds and tests
//!
//! Both implement [`RecordStore`], which is all the service layer sees.

pub mod in_memory;
pub mod records;
pub mod repository;

pub use in_memory::InMemoryRecords;
pub use records::Records;
pub use repository::{RecordFilter, RecordStore};
