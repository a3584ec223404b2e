//! # Teamboard Shared Library
//!
//! Types, persistence and business rules shared by the Teamboard API server
//! and the reminder worker.
//!
//! ## Module Organization
//!
//! - `models`: database models and their SQL
//! - `auth`: passwords, tokens, verification codes, access rules
//! - `db`: connection pool and embedded migrations
//! - `notify`: outbound notifications (verification codes, reminders)

pub mod auth;
pub mod db;
pub mod models;
pub mod notify;

/// Current version of the Teamboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
