//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Session management
//! - Authentication middleware

mod middleware;
pub mod password;
pub mod session;

pub use middleware::{CurrentUser, SESSION_COOKIE, require_auth};
pub use session::{Session, create_session_token, verify_session_token};
