use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use campusmart_core::domain::user::{NewUser, User, UserId};

use super::{
    column, decode_timestamp, encode_timestamp, RepositoryError, UserRepository, UserSummary,
};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    let created_at: String = column(row, "created_at")?;

    Ok(User {
        id: UserId(column(row, "id")?),
        username: column(row, "username")?,
        email: column(row, "email")?,
        password_hash: column(row, "password_hash")?,
        created_at: decode_timestamp(&created_at)?,
    })
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn create(&self, user: NewUser) -> Result<UserId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(encode_timestamp(&user.created_at))
        .execute(&self.pool)
        .await?;

        Ok(UserId(result.last_insert_rowid()))
    }

    async fn exists_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists == 1)
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE username = ? AND password_hash = ?",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn email_taken_by_other(
        &self,
        email: &str,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id != ?2)")
                .bind(email)
                .bind(user_id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists == 1)
    }

    async fn update_email(&self, id: UserId, email: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET email = ? WHERE id = ?")
            .bind(email)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<UserSummary>, RepositoryError> {
        let rows = sqlx::query("SELECT id, username FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<UserSummary, RepositoryError> {
                Ok(UserSummary { id: UserId(column(row, "id")?), name: column(row, "username")? })
            })
            .collect()
    }
}
