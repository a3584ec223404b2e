/// HTTP middleware
///
/// - `auth`: bearer token authentication
/// - `security`: security response headers

pub mod auth;
pub mod security;
