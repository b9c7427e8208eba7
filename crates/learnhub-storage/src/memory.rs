//! In-memory repository backend.
//!
//! Default backend for tests and single-instance deployments. Relational
//! persistence is an external collaborator; any backend implementing the
//! repository traits can replace this one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use learnhub_core::{Course, Enrollment};

use crate::error::StorageError;
use crate::traits::{CourseFilter, CourseRepository, EnrollmentRepository};

/// In-memory repository holding courses and enrollments.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    courses: RwLock<HashMap<i64, Course>>,
    enrollments: RwLock<HashMap<i64, Enrollment>>,
    /// Id sequence shared by both entity kinds; ids only need to be unique
    /// per kind, a shared counter keeps the implementation simple.
    sequence: AtomicI64,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(HashMap::new()),
            enrollments: RwLock::new(HashMap::new()),
            sequence: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl CourseRepository for MemoryRepository {
    async fn load(&self, id: i64) -> Result<Option<Course>, StorageError> {
        Ok(self.courses.read().await.get(&id).cloned())
    }

    async fn load_list(&self, filter: &CourseFilter) -> Result<Vec<Course>, StorageError> {
        let courses = self.courses.read().await;
        let mut result: Vec<Course> = courses
            .values()
            .filter(|c| !filter.published_only || c.is_published)
            .filter(|c| filter.owner_id.is_none_or(|owner| c.owner_id == owner))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    async fn save(&self, mut course: Course) -> Result<Course, StorageError> {
        let mut courses = self.courses.write().await;
        if course.id == 0 {
            course.id = self.next_id();
        } else if !courses.contains_key(&course.id) {
            return Err(StorageError::not_found("course", course.id));
        }
        courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        self.courses
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("course", id))
    }
}

#[async_trait]
impl EnrollmentRepository for MemoryRepository {
    async fn load(&self, id: i64) -> Result<Option<Enrollment>, StorageError> {
        Ok(self.enrollments.read().await.get(&id).cloned())
    }

    async fn load_list(&self, student_id: Option<i64>) -> Result<Vec<Enrollment>, StorageError> {
        let enrollments = self.enrollments.read().await;
        let mut result: Vec<Enrollment> = enrollments
            .values()
            .filter(|e| student_id.is_none_or(|s| e.student_id == s))
            .cloned()
            .collect();
        result.sort_by_key(|e| e.id);
        Ok(result)
    }

    async fn save(&self, mut enrollment: Enrollment) -> Result<Enrollment, StorageError> {
        let mut enrollments = self.enrollments.write().await;
        let duplicate = enrollments.values().any(|e| {
            e.student_id == enrollment.student_id
                && e.course_id == enrollment.course_id
                && e.id != enrollment.id
        });
        if duplicate {
            return Err(StorageError::already_exists(
                "enrollment",
                format!("{}:{}", enrollment.student_id, enrollment.course_id),
            ));
        }
        if enrollment.id == 0 {
            enrollment.id = self.next_id();
        }
        enrollments.insert(enrollment.id, enrollment.clone());
        Ok(enrollment)
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        self.enrollments
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("enrollment", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn course(title: &str, owner_id: i64, published: bool) -> Course {
        Course {
            id: 0,
            title: title.to_string(),
            description: String::new(),
            owner_id,
            price_cents: 0,
            is_published: published,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_load_roundtrip() {
        let repo = MemoryRepository::new();
        let saved = CourseRepository::save(&repo, course("Rust 101", 1, true))
            .await
            .unwrap();
        assert!(saved.id > 0);

        let loaded = CourseRepository::load(&repo, saved.id).await.unwrap();
        assert_eq!(loaded.unwrap().title, "Rust 101");
    }

    #[tokio::test]
    async fn test_published_filter() {
        let repo = MemoryRepository::new();
        CourseRepository::save(&repo, course("Public", 1, true))
            .await
            .unwrap();
        CourseRepository::save(&repo, course("Draft", 1, false))
            .await
            .unwrap();

        let public = CourseRepository::load_list(&repo, &CourseFilter::published())
            .await
            .unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].title, "Public");

        let all = CourseRepository::load_list(&repo, &CourseFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_course_fails() {
        let repo = MemoryRepository::new();
        let mut missing = course("Ghost", 1, false);
        missing.id = 999;
        let err = CourseRepository::save(&repo, missing).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_rejected() {
        let repo = MemoryRepository::new();
        let saved = EnrollmentRepository::save(
            &repo,
            Enrollment {
                id: 0,
                course_id: 10,
                student_id: 20,
                created_at: OffsetDateTime::now_utc(),
            },
        )
        .await
        .unwrap();
        assert!(saved.id > 0);

        let err = EnrollmentRepository::save(
            &repo,
            Enrollment {
                id: 0,
                course_id: 10,
                student_id: 20,
                created_at: OffsetDateTime::now_utc(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_delete_course() {
        let repo = MemoryRepository::new();
        let saved = CourseRepository::save(&repo, course("Gone soon", 1, true))
            .await
            .unwrap();
        CourseRepository::delete(&repo, saved.id).await.unwrap();
        assert!(
            CourseRepository::load(&repo, saved.id)
                .await
                .unwrap()
                .is_none()
        );
        let err = CourseRepository::delete(&repo, saved.id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
