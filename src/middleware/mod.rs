/// Middleware module
///
/// Custom middleware for request authentication.

mod auth_middleware;

pub use auth_middleware::{CheckUser, RequireAuth};
