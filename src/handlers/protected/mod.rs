// handlers/protected/mod.rs - Workspace-scoped handlers
//
// Security Level: x-user-id plus API key or session token, subject to the
// workspace's per-method policy. Mutating verbs require the admin role.
// Every handler here receives the `AuthContext` inserted by the middleware.
pub mod auth; // whoami, policy, identifier rotation, account deletion
pub mod containers; // container listing and deletion
pub mod data; // record CRUD and table lifecycle
pub mod introspect; // full workspace dump
pub mod meta; // rename, transforms, schema, custom paths, primary key
