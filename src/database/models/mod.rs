pub mod container;
pub mod schema;
pub mod table;
pub mod workspace;

pub use container::Container;
pub use schema::{FieldType, Schema, SchemaError};
pub use table::{StructuredTable, Table};
pub use workspace::{AuthPolicy, Session, Workspace};
