mod auth;
mod health_check;

pub use auth::{get_current_account, login, logout, refresh, session_status, signup};
pub use health_check::health_check;
