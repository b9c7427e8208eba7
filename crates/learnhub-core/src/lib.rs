pub mod correlation;
pub mod error;
pub mod model;
pub mod problem;

pub use correlation::RequestContext;
pub use error::{Fault, FaultKind, Result};
pub use model::{Course, CourseInput, Enrollment, EnrollmentInput, Principal, Role};
pub use problem::ProblemDetails;
