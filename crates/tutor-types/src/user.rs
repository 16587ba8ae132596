//! Student profile types and onboarding validation.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Accepted student ages, inclusive.
pub const AGE_RANGE: RangeInclusive<i64> = 11..=18;

/// Accepted school grade levels, inclusive.
pub const GRADE_RANGE: RangeInclusive<i64> = 6..=12;

/// School education board.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (education_board IN ('CBSE', 'ICSE', 'IB', 'STATE_BOARD', 'OTHER'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EducationBoard {
    Cbse,
    Icse,
    Ib,
    StateBoard,
    Other,
}

impl fmt::Display for EducationBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EducationBoard::Cbse => write!(f, "CBSE"),
            EducationBoard::Icse => write!(f, "ICSE"),
            EducationBoard::Ib => write!(f, "IB"),
            EducationBoard::StateBoard => write!(f, "STATE_BOARD"),
            EducationBoard::Other => write!(f, "OTHER"),
        }
    }
}

impl FromStr for EducationBoard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CBSE" => Ok(EducationBoard::Cbse),
            "ICSE" => Ok(EducationBoard::Icse),
            "IB" => Ok(EducationBoard::Ib),
            "STATE_BOARD" => Ok(EducationBoard::StateBoard),
            "OTHER" => Ok(EducationBoard::Other),
            other => Err(format!("invalid education board: '{other}'")),
        }
    }
}

/// A student profile.
///
/// Created once at onboarding, mutated by profile updates, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: u8,
    pub grade_level: u8,
    pub education_board: EducationBoard,
    pub preferred_language: Option<String>,
    pub timezone: Option<String>,
    pub onboarding_completed: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// Onboarding payload as received from a client.
///
/// Every field is optional on the wire so that missing fields produce a
/// field-level [`ValidationError`] instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub grade_level: Option<i64>,
    pub education_board: Option<String>,
}

/// A validated onboarding payload, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: u8,
    pub grade_level: u8,
    pub education_board: EducationBoard,
}

impl CreateUserRequest {
    /// Check required fields and closed ranges.
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        let first_name = non_blank(self.first_name).ok_or_else(|| ValidationError::required("first_name"))?;
        let age = validate_age(self.age.ok_or_else(|| ValidationError::required("age"))?)?;
        let grade_level =
            validate_grade(self.grade_level.ok_or_else(|| ValidationError::required("grade_level"))?)?;
        let education_board = validate_board(
            self.education_board
                .as_deref()
                .ok_or_else(|| ValidationError::required("education_board"))?,
        )?;

        Ok(NewUser {
            first_name,
            last_name: non_blank(self.last_name),
            email: non_blank(self.email),
            age,
            grade_level,
            education_board,
        })
    }
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub grade_level: Option<i64>,
    pub education_board: Option<String>,
    pub preferred_language: Option<String>,
    pub timezone: Option<String>,
}

impl UpdateUserRequest {
    /// Validate the present fields and apply them to `user`.
    ///
    /// Nothing is applied if any present field is invalid.
    pub fn apply_to(&self, user: &mut User) -> Result<(), ValidationError> {
        let first_name = match &self.first_name {
            Some(name) => Some(
                non_blank(Some(name.clone()))
                    .ok_or_else(|| ValidationError::field("first_name", "first_name cannot be empty"))?,
            ),
            None => None,
        };
        let age = self.age.map(validate_age).transpose()?;
        let grade_level = self.grade_level.map(validate_grade).transpose()?;
        let education_board = self.education_board.as_deref().map(validate_board).transpose()?;

        if let Some(first_name) = first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(email) = &self.email {
            user.email = Some(email.clone());
        }
        if let Some(age) = age {
            user.age = age;
        }
        if let Some(grade_level) = grade_level {
            user.grade_level = grade_level;
        }
        if let Some(board) = education_board {
            user.education_board = board;
        }
        if let Some(language) = &self.preferred_language {
            user.preferred_language = Some(language.clone());
        }
        if let Some(timezone) = &self.timezone {
            user.timezone = Some(timezone.clone());
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_age(age: i64) -> Result<u8, ValidationError> {
    if !AGE_RANGE.contains(&age) {
        return Err(ValidationError::field(
            "age",
            format!("Age must be between {} and {}", AGE_RANGE.start(), AGE_RANGE.end()),
        ));
    }
    Ok(age as u8)
}

fn validate_grade(grade: i64) -> Result<u8, ValidationError> {
    if !GRADE_RANGE.contains(&grade) {
        return Err(ValidationError::field(
            "grade_level",
            format!(
                "Grade level must be between {} and {}",
                GRADE_RANGE.start(),
                GRADE_RANGE.end()
            ),
        ));
    }
    Ok(grade as u8)
}

fn validate_board(board: &str) -> Result<EducationBoard, ValidationError> {
    board
        .parse()
        .map_err(|e: String| ValidationError::field("education_board", e))
}
