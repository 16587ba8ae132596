//! SQLite user repository implementation.

use sqlx::Row;
use tutor_core::repository::user::UserRepository;
use tutor_types::error::RepositoryError;
use tutor_types::user::{EducationBoard, User};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_insert_error, parse_datetime, parse_uuid};

/// SQLite-backed implementation of `UserRepository`.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain User.
struct UserRow {
    id: String,
    first_name: String,
    last_name: Option<String>,
    email: Option<String>,
    age: i64,
    grade_level: i64,
    education_board: String,
    preferred_language: Option<String>,
    timezone: Option<String>,
    onboarding_completed: bool,
    is_active: bool,
    created_at: String,
    updated_at: String,
    last_active_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            age: row.try_get("age")?,
            grade_level: row.try_get("grade_level")?,
            education_board: row.try_get("education_board")?,
            preferred_language: row.try_get("preferred_language")?,
            timezone: row.try_get("timezone")?,
            onboarding_completed: row.try_get("onboarding_completed")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_active_at: row.try_get("last_active_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        let education_board: EducationBoard = self
            .education_board
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(User {
            id: parse_uuid(&self.id, "user id")?,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            age: self.age as u8,
            grade_level: self.grade_level as u8,
            education_board,
            preferred_language: self.preferred_language,
            timezone: self.timezone,
            onboarding_completed: self.onboarding_completed,
            is_active: self.is_active,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            last_active_at: parse_datetime(&self.last_active_at)?,
        })
    }
}

impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO users (id, first_name, last_name, email, age, grade_level, education_board,
                                  preferred_language, timezone, onboarding_completed, is_active,
                                  created_at, updated_at, last_active_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.age as i64)
        .bind(user.grade_level as i64)
        .bind(user.education_board.to_string())
        .bind(&user.preferred_language)
        .bind(&user.timezone)
        .bind(user.onboarding_completed)
        .bind(user.is_active)
        .bind(format_datetime(&user.created_at))
        .bind(format_datetime(&user.updated_at))
        .bind(format_datetime(&user.last_active_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_insert_error(e, "user already exists"))?;

        Ok(user.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(user_row.into_user()?))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, user: &User) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE users
               SET first_name = ?, last_name = ?, email = ?, age = ?, grade_level = ?,
                   education_board = ?, preferred_language = ?, timezone = ?,
                   onboarding_completed = ?, is_active = ?, updated_at = ?, last_active_at = ?
               WHERE id = ?"#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.age as i64)
        .bind(user.grade_level as i64)
        .bind(user.education_board.to_string())
        .bind(&user.preferred_language)
        .bind(&user.timezone)
        .bind(user.onboarding_completed)
        .bind(user.is_active)
        .bind(format_datetime(&user.updated_at))
        .bind(format_datetime(&user.last_active_at))
        .bind(user.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::{DatabasePool, database_url};
    use tutor_types::time;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_user() -> User {
        let now = time::now();
        User {
            id: Uuid::now_v7(),
            first_name: "Asha".to_string(),
            last_name: Some("Rao".to_string()),
            email: None,
            age: 14,
            grade_level: 9,
            education_board: EducationBoard::StateBoard,
            preferred_language: None,
            timezone: None,
            onboarding_completed: true,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_active_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let user = make_user();

        repo.create(&user).await.unwrap();
        let found = repo.get(&user.id).await.unwrap().unwrap();

        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        assert!(repo.get(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let mut user = make_user();
        repo.create(&user).await.unwrap();

        user.timezone = Some("Asia/Kolkata".to_string());
        user.grade_level = 10;
        user.updated_at = time::now();
        repo.update(&user).await.unwrap();

        let found = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(found.timezone.as_deref(), Some("Asia/Kolkata"));
        assert_eq!(found.grade_level, 10);
        assert_eq!(found.updated_at, user.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let err = repo.update(&make_user()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_schema_rejects_out_of_range_age() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let mut user = make_user();
        user.age = 19;
        assert!(repo.create(&user).await.is_err());
    }
}
