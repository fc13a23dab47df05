// handlers/elevated/mod.rs - Elevated handlers (admin role required)
//
// Mounted behind jwt → validate_user → require_admin, so authentication
// failures surface as 401 before the role check returns 403.

pub mod dashboard;
pub mod users;
pub mod worker;
