//! # learnhub-storage
//!
//! Repository abstraction for the LearnHub server.
//!
//! The repository is the source of truth for domain entities. The cache layer
//! in the server crate sits in front of it; only repository failures may fail
//! a request. The main traits are [`CourseRepository`] and
//! [`EnrollmentRepository`]; [`MemoryRepository`] implements both in memory
//! for tests and single-instance deployments.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StorageError;
pub use memory::MemoryRepository;
pub use traits::{CourseFilter, CourseRepository, EnrollmentRepository};
