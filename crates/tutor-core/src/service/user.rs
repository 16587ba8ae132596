//! Student profile service.
//!
//! Onboarding creates exactly one profile per call; validation runs before
//! anything is written.

use tracing::info;
use tutor_types::error::{UserError, ValidationError};
use tutor_types::time;
use tutor_types::user::{CreateUserRequest, UpdateUserRequest, User};
use uuid::Uuid;

use crate::repository::user::UserRepository;

/// Service for creating, reading, and updating student profiles.
pub struct UserService<U: UserRepository> {
    repo: U,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(repo: U) -> Self {
        Self { repo }
    }

    /// Validate an onboarding payload and persist the new profile.
    ///
    /// The returned user has `onboarding_completed` and `is_active` set and
    /// all three timestamps equal.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserError> {
        let new_user = request.validate()?;
        let now = time::now();

        let user = User {
            id: Uuid::now_v7(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            age: new_user.age,
            grade_level: new_user.grade_level,
            education_board: new_user.education_board,
            preferred_language: None,
            timezone: None,
            onboarding_completed: true,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_active_at: now,
        };

        let user = self.repo.create(&user).await?;
        info!(user_id = %user.id, grade_level = user.grade_level, "User onboarded");
        Ok(user)
    }

    pub async fn get_user(&self, id: &Uuid) -> Result<User, UserError> {
        if id.is_nil() {
            return Err(ValidationError::required("user_id").into());
        }
        self.repo.get(id).await?.ok_or(UserError::NotFound)
    }

    /// Apply a partial profile update.
    pub async fn update_user(
        &self,
        id: &Uuid,
        request: UpdateUserRequest,
    ) -> Result<User, UserError> {
        let mut user = self.get_user(id).await?;
        request.apply_to(&mut user)?;

        let now = time::now();
        user.updated_at = now;
        user.last_active_at = now;

        let user = self.repo.update(&user).await?;
        info!(user_id = %user.id, "User profile updated");
        Ok(user)
    }
}
