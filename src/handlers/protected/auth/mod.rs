pub mod account;
pub mod policy;
pub mod whoami;

pub use account::{account_delete, update_uuid_patch};
pub use policy::{policy_get, policy_patch};
pub use whoami::whoami_get;
