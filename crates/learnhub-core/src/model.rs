//! Domain model types shared across the LearnHub crates.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Role of the current principal, as supplied by the upstream auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Instructor,
    Student,
    /// Unauthenticated caller.
    Anonymous,
}

impl Role {
    /// Parse the role token passed by the auth collaborator.
    /// Unknown tokens are treated as anonymous rather than rejected.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token {
            "admin" => Self::Admin,
            "instructor" => Self::Instructor,
            "student" => Self::Student,
            _ => Self::Anonymous,
        }
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Instructor)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Instructor => write!(f, "instructor"),
            Self::Student => write!(f, "student"),
            Self::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// Current principal for a request: opaque identity plus role.
///
/// Authentication happens upstream; this core only reads the result for
/// cache-partitioning decisions and log `user_id` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Option<i64>,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some() && self.role != Role::Anonymous
    }
}

/// A course as stored by the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub owner_id: i64,
    pub price_cents: i64,
    pub is_published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Payload for creating or updating a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub is_published: bool,
}

impl CourseInput {
    /// Field-level validation; returns (field, message) pairs for each failure.
    pub fn validate(&self) -> Vec<(String, String)> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(("title".to_string(), "must not be empty".to_string()));
        }
        if self.title.len() > 200 {
            errors.push(("title".to_string(), "must be at most 200 characters".to_string()));
        }
        if self.price_cents < 0 {
            errors.push(("price_cents".to_string(), "must not be negative".to_string()));
        }
        errors
    }
}

/// A student's enrollment in a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub course_id: i64,
    pub student_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Payload for creating an enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentInput {
    pub course_id: i64,
}
