pub mod auth;
pub mod custom_paths;
pub mod rate_limit;
pub mod response;

pub use auth::{workspace_auth_middleware, AuthContext, Credential};
pub use custom_paths::custom_paths_middleware;
pub use rate_limit::RateLimiter;
pub use response::{html_errors_middleware, ApiResponse, ApiResult};
