//! User repository trait definition.

use tutor_types::error::RepositoryError;
use tutor_types::user::User;
use uuid::Uuid;

/// Repository trait for student profiles.
///
/// Implementations live in tutor-infra (e.g., `SqliteUserRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Returns the stored user.
    fn create(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    /// Get a user by its unique ID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Overwrite the mutable profile fields of an existing user.
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    fn update(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;
}
