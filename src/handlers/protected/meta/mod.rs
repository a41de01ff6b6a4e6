// handlers/protected/meta - Table management sub-paths.
// None of these routes are ever rewritten by the custom-path resolver.
pub mod table;

pub use table::{custom_paths_patch, primary_key_patch, rename_patch, schema_definition_patch, schema_patch};
