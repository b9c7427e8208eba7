//! Repository traits for the LearnHub storage abstraction.
//!
//! Implementations must be thread-safe (`Send + Sync`) and transactional
//! per call: a returned entity is committed.

use async_trait::async_trait;

use learnhub_core::{Course, Enrollment};

use crate::error::StorageError;

/// Filter for course listings.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    /// Restrict to published courses (anonymous and student views).
    pub published_only: bool,
    /// Restrict to courses owned by this user.
    pub owner_id: Option<i64>,
}

impl CourseFilter {
    /// Filter for the anonymous/public listing.
    #[must_use]
    pub fn published() -> Self {
        Self {
            published_only: true,
            owner_id: None,
        }
    }
}

/// Source-of-truth access to courses.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Loads a course by id. Returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing
    /// entities.
    async fn load(&self, id: i64) -> Result<Option<Course>, StorageError>;

    /// Loads courses matching the filter, newest first.
    async fn load_list(&self, filter: &CourseFilter) -> Result<Vec<Course>, StorageError>;

    /// Persists a course and returns the committed entity.
    ///
    /// A course with `id == 0` is treated as new and assigned an id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when updating a missing course.
    async fn save(&self, course: Course) -> Result<Course, StorageError>;

    /// Deletes a course by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete(&self, id: i64) -> Result<(), StorageError>;
}

/// Source-of-truth access to enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Loads an enrollment by id. Returns `None` if absent.
    async fn load(&self, id: i64) -> Result<Option<Enrollment>, StorageError>;

    /// Loads enrollments, optionally restricted to one student.
    async fn load_list(&self, student_id: Option<i64>) -> Result<Vec<Enrollment>, StorageError>;

    /// Persists an enrollment and returns the committed entity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` when the (student, course) pair
    /// is already enrolled.
    async fn save(&self, enrollment: Enrollment) -> Result<Enrollment, StorageError>;

    /// Deletes an enrollment by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the enrollment does not exist.
    async fn delete(&self, id: i64) -> Result<(), StorageError>;
}
