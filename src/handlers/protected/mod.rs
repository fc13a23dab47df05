// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every handler receives the `ValidatedUser` loaded by middleware and scopes
// its queries to that user's id.

pub mod account;
pub mod analyses;
pub mod jobs;
pub mod trash;
