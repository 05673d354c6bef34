pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;

/// Name of the admin session cookie.
pub const SESSION_COOKIE: &str = "apd_session";
