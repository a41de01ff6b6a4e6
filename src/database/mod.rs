pub mod locks;
pub mod models;
pub mod record;
pub mod repository;

pub use locks::WriteLocks;
pub use record::{Record, RecordError};
pub use repository::{DataError, Repository};
