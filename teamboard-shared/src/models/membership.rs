/// Project membership model and database operations
///
/// Many-to-many relationship between users and projects. The pivot carries a
/// role: the project creator joins as `leader`, everybody invited later as
/// `member`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('leader', 'member');
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::membership::{CreateMembership, Membership, ProjectRole};
/// use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(project_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// Membership::create(&pool, CreateMembership {
///     project_id,
///     user_id,
///     role: ProjectRole::Member,
/// }).await?;
///
/// assert!(Membership::is_member(&pool, project_id, user_id).await?);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role a user holds inside one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// The project's creator
    Leader,

    /// Invited collaborator
    Member,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Leader => "leader",
            ProjectRole::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

/// A member as listed on a project: user fields plus the pivot role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
}

impl Membership {
    /// Attaches a user to a project
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the user is already a member.
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }

    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT project_id, user_id, role, created_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn is_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = $1 AND user_id = $2)",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Returns the subset of `user_ids` that are NOT members of the project
    ///
    /// Used to reject task assignments and progress reports naming outsiders.
    pub async fn non_members(
        pool: &PgPool,
        project_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT candidate
            FROM UNNEST($2::uuid[]) AS candidate
            WHERE NOT EXISTS (
                SELECT 1 FROM project_members
                WHERE project_id = $1 AND user_id = candidate
            )
            "#,
        )
        .bind(project_id)
        .bind(user_ids)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the members of a project, leader first
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMember>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT u.id, u.name, u.email, pm.role, pm.created_at AS joined_at
            FROM project_members pm
            INNER JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY pm.role, pm.created_at
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(ProjectRole::Leader.as_str(), "leader");
        assert_eq!(ProjectRole::Member.as_str(), "member");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&ProjectRole::Leader).unwrap(), "\"leader\"");
        let role: ProjectRole = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(role, ProjectRole::Member);
    }
}
