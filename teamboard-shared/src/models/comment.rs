/// Task comments
///
/// Plain text notes left on a task by a user. Listing returns the newest
/// comment first together with its author.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment with its author embedded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: UserSummary,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    #[sqlx(flatten)]
    comment: Comment,
    author_name: String,
    author_email: String,
}

impl From<CommentRow> for CommentWithAuthor {
    fn from(row: CommentRow) -> Self {
        let user = UserSummary {
            id: row.comment.user_id,
            name: row.author_name,
            email: row.author_email,
        };
        Self {
            comment: row.comment,
            user,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

impl Comment {
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, task_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, user_id, content, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.content)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, task_id, user_id, content, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Comments on a task, newest first
    pub async fn list_by_task(
        pool: &PgPool,
        task_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT c.id, c.task_id, c.user_id, c.content, c.created_at, c.updated_at,
                   u.name AS author_name, u.email AS author_email
            FROM comments c
            INNER JOIN users u ON u.id = c.user_id
            WHERE c.task_id = $1
            ORDER BY c.created_at DESC, c.id
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(CommentWithAuthor::from).collect())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_is_embedded() {
        let user_id = Uuid::new_v4();
        let row = CommentRow {
            comment: Comment {
                id: Uuid::new_v4(),
                task_id: Uuid::new_v4(),
                user_id,
                content: "Looks good".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            author_name: "Ana".to_string(),
            author_email: "ana@example.com".to_string(),
        };

        let json = serde_json::to_value(CommentWithAuthor::from(row)).unwrap();
        assert_eq!(json["content"], "Looks good");
        assert_eq!(json["user"]["id"], user_id.to_string());
        assert_eq!(json["user"]["name"], "Ana");
    }
}
