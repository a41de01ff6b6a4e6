// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None. Login still needs the x-user-id header to know which
// workspace the session belongs to.
pub mod auth;
pub mod health;

pub use health::{health, root};
