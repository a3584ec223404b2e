/// Authorization rules
///
/// Project access is derived from three facts: the caller's global role,
/// whether they own the project, and whether they are a member of it.
///
/// | caller            | view | manage (edit, delete, members, assign) |
/// |-------------------|------|----------------------------------------|
/// | admin             | yes  | yes                                    |
/// | project owner     | yes  | yes                                    |
/// | project member    | yes  | no                                     |
/// | anybody else      | no   | no                                     |

use sqlx::PgPool;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::membership::Membership;
use crate::models::project::Project;
use crate::models::user::UserRole;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("You do not have access to this project")]
    NotProjectMember,

    #[error("Only the project owner or an admin can perform this action")]
    NotProjectManager,

    #[error("This action requires one of the roles: {}", format_roles(.0))]
    InsufficientRole(Vec<UserRole>),

    #[error("Not authorized to access this resource")]
    NotAuthorized,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

fn format_roles(roles: &[UserRole]) -> String {
    roles.iter().map(UserRole::as_str).collect::<Vec<_>>().join(", ")
}

/// The caller's standing in one project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAccess {
    Admin,
    Owner,
    Member,
    Outsider,
}

impl ProjectAccess {
    pub fn resolve(role: UserRole, user_id: Uuid, owner_id: Uuid, is_member: bool) -> Self {
        if role.is_admin() {
            ProjectAccess::Admin
        } else if user_id == owner_id {
            ProjectAccess::Owner
        } else if is_member {
            ProjectAccess::Member
        } else {
            ProjectAccess::Outsider
        }
    }

    pub fn can_view(&self) -> bool {
        !matches!(self, ProjectAccess::Outsider)
    }

    pub fn can_manage(&self) -> bool {
        matches!(self, ProjectAccess::Admin | ProjectAccess::Owner)
    }
}

pub async fn project_access(
    pool: &PgPool,
    auth: &AuthContext,
    project: &Project,
) -> Result<ProjectAccess, sqlx::Error> {
    if auth.is_admin() || project.is_owned_by(auth.user_id) {
        return Ok(ProjectAccess::resolve(auth.role, auth.user_id, project.owner_id, false));
    }

    let is_member = Membership::is_member(pool, project.id, auth.user_id).await?;

    Ok(ProjectAccess::resolve(auth.role, auth.user_id, project.owner_id, is_member))
}

/// Admins, the owner and members pass
pub async fn require_project_view(
    pool: &PgPool,
    auth: &AuthContext,
    project: &Project,
) -> Result<ProjectAccess, AuthzError> {
    let access = project_access(pool, auth, project).await?;

    if !access.can_view() {
        return Err(AuthzError::NotProjectMember);
    }

    Ok(access)
}

/// Only admins and the owner pass
pub async fn require_project_manage(
    pool: &PgPool,
    auth: &AuthContext,
    project: &Project,
) -> Result<ProjectAccess, AuthzError> {
    let access = project_access(pool, auth, project).await?;

    if !access.can_manage() {
        return Err(AuthzError::NotProjectManager);
    }

    Ok(access)
}

/// Requires the caller's global role to be one of `allowed`
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if !allowed.contains(&auth.role) {
        return Err(AuthzError::InsufficientRole(allowed.to_vec()));
    }

    Ok(())
}

/// The resource's author or an admin
pub fn require_author_or_admin(auth: &AuthContext, author_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id != author_id && !auth.is_admin() {
        return Err(AuthzError::NotAuthorized);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_resolve_access() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert_eq!(ProjectAccess::resolve(UserRole::Admin, me, other, false), ProjectAccess::Admin);
        assert_eq!(ProjectAccess::resolve(UserRole::Member, me, me, false), ProjectAccess::Owner);
        assert_eq!(ProjectAccess::resolve(UserRole::Leader, me, other, true), ProjectAccess::Member);
        assert_eq!(
            ProjectAccess::resolve(UserRole::Leader, me, other, false),
            ProjectAccess::Outsider
        );
    }

    #[test]
    fn test_access_capabilities() {
        assert!(ProjectAccess::Admin.can_manage());
        assert!(ProjectAccess::Owner.can_manage());
        assert!(ProjectAccess::Member.can_view());
        assert!(!ProjectAccess::Member.can_manage());
        assert!(!ProjectAccess::Outsider.can_view());
    }

    #[test]
    fn test_require_role() {
        let leader = context(UserRole::Leader);
        assert!(require_role(&leader, &[UserRole::Admin, UserRole::Leader]).is_ok());

        let err = require_role(&leader, &[UserRole::Admin]).unwrap_err();
        assert_eq!(err.to_string(), "This action requires one of the roles: admin");
    }

    #[test]
    fn test_require_author_or_admin() {
        let member = context(UserRole::Member);
        assert!(require_author_or_admin(&member, member.user_id).is_ok());
        assert!(matches!(
            require_author_or_admin(&member, Uuid::new_v4()),
            Err(AuthzError::NotAuthorized)
        ));
        assert!(require_author_or_admin(&context(UserRole::Admin), Uuid::new_v4()).is_ok());
    }
}
