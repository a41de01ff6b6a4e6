pub mod activity;
pub mod describe_service;
pub mod path_index;
pub mod workspace_service;

pub use activity::ActivityTracker;
pub use describe_service::describe_workspace;
pub use path_index::{PathIndex, Resolved, TableRef};
pub use workspace_service::{spawn_eviction_sweep, WorkspaceService};
