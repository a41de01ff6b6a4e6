// handlers/mod.rs - Two handler tiers
//
// Public (no workspace credential) -> Protected (x-user-id + policy + RBAC)
pub mod public; // Tier 1: registration, login, banner, health
pub mod protected; // Tier 2: everything scoped to a workspace
