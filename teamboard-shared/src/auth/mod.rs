/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: session-bound JWT issuance and validation
/// - [`verification`]: six-digit email verification codes
/// - [`middleware`]: the authenticated request context
/// - [`authorization`]: project and role access rules
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::auth::password::{hash_password, verify_password};
/// use teamboard_shared::auth::jwt::{create_token, Claims};
/// use teamboard_shared::models::user::UserRole;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), Uuid::new_v4(), UserRole::Member, Duration::hours(24));
/// let token = create_token(&claims, "a-secret-key-that-is-long-enough!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod verification;
