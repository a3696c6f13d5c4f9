// crates/grid-service/src/routes/mod.rs
// ============================================================================
// Module: HTTP Routes
// Description: Route handler modules for the registry CRUD surface, the
//              tool catalog, and the bus subscription bridge (spec.md §6).
// Purpose: Group handlers by the resource they serve; `lib.rs` wires them
//          into one `Router`.
// Dependencies: axum
// ============================================================================

pub mod registry;
pub mod subscriptions;
pub mod tools;
