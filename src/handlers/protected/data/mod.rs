pub mod record;
pub mod table;

// Re-export handler functions for use in routing
pub use record::delete as record_delete;
pub use record::get as record_get;
pub use record::patch as record_patch;
pub use record::put as record_put;

pub use table::delete as table_delete;
pub use table::get as table_get;
pub use table::post as table_post;
