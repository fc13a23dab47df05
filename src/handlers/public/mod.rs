// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, shareable reports and the one-time admin bootstrap.

pub mod auth;
pub mod bootstrap;
pub mod report;
