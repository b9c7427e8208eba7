//! Idempotent background task dispatch.
//!
//! Task queues deliver at least once; this module collapses re-delivery of
//! the same logical task to at-most-once externally visible effect per
//! idempotency window. The guard is an atomic conditional create on the
//! shared store: the first delivery to claim `task:{kind}:{target_id}` runs
//! the handler, later deliveries inside the TTL return immediately.
//!
//! The claim is deliberately coarse: it does not distinguish "already
//! succeeded" from "currently running", and it is not rolled back when a
//! handler fails partway. A stuck or failed task becomes retryable again
//! once the claim TTL expires.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use learnhub_storage::{CourseFilter, CourseRepository, EnrollmentRepository};

use crate::cache::CacheStore;

/// Task kind for the enrollment confirmation email.
pub const TASK_SEND_ENROLLMENT_EMAIL: &str = "send_enrollment_email";

/// Handler function type: takes the task target id and payload.
pub type TaskHandler = Arc<
    dyn Fn(
            i64,   // target_id
            Value, // payload
        ) -> Pin<Box<dyn std::future::Future<Output = Result<(), String>> + Send>>
        + Send
        + Sync,
>;

/// Outcome of a single task delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// This delivery won the claim and the handler ran to completion.
    Executed,
    /// Another delivery holds the claim; nothing was executed.
    Duplicate,
    /// No handler is registered for the task kind.
    NoHandler,
    /// This delivery won the claim but the handler failed. The claim is
    /// retained for the rest of the window.
    Failed(String),
}

/// Dispatches background tasks with per-(kind, target) de-duplication.
pub struct TaskDispatcher {
    store: CacheStore,
    claim_ttl: Duration,
    handlers: RwLock<HashMap<String, TaskHandler>>,
}

impl TaskDispatcher {
    /// Create a dispatcher claiming against the given store.
    pub fn new(store: CacheStore, claim_ttl: Duration) -> Self {
        Self {
            store,
            claim_ttl,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register the handler for a task kind.
    pub fn register(&self, kind: impl Into<String>, handler: TaskHandler) {
        // A poisoned lock still guards a valid map (handlers are plain Arcs);
        // recover instead of panicking the worker.
        self.handlers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(kind.into(), handler);
    }

    /// Idempotency flag key for a logical task.
    #[inline]
    fn claim_key(kind: &str, target_id: i64) -> String {
        format!("task:{kind}:{target_id}")
    }

    /// Enqueue a task for background execution. Fire-and-forget: the caller
    /// never waits for the handler; de-duplication happens inside the
    /// spawned delivery.
    pub fn dispatch(self: &Arc<Self>, kind: &str, target_id: i64, payload: Value) {
        let dispatcher = Arc::clone(self);
        let kind = kind.to_string();
        tokio::spawn(async move {
            dispatcher.deliver(&kind, target_id, payload).await;
        });
    }

    /// Process one delivery of a task. Models a single arrival from an
    /// at-least-once queue; called by `dispatch` and directly by workers
    /// that consume an external queue.
    pub async fn deliver(&self, kind: &str, target_id: i64, payload: Value) -> DeliveryOutcome {
        let key = Self::claim_key(kind, target_id);
        let marker = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default()
            .into_bytes();

        let won = self.store.set_if_absent(&key, marker, self.claim_ttl).await;
        if !won {
            tracing::info!(
                task_kind = %kind,
                target_id = %target_id,
                "task skipped, already claimed within idempotency window"
            );
            return DeliveryOutcome::Duplicate;
        }

        let handler = self
            .handlers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(kind)
            .cloned();
        let Some(handler) = handler else {
            tracing::warn!(task_kind = %kind, "no handler registered for task kind");
            return DeliveryOutcome::NoHandler;
        };

        tracing::info!(task_kind = %kind, target_id = %target_id, "task claimed, executing");
        match handler(target_id, payload).await {
            Ok(()) => {
                tracing::info!(task_kind = %kind, target_id = %target_id, "task completed");
                DeliveryOutcome::Executed
            }
            Err(e) => {
                // No claim rollback: at-most-once per window
                tracing::error!(
                    task_kind = %kind,
                    target_id = %target_id,
                    error = %e,
                    "task failed, claim retained until window expires"
                );
                DeliveryOutcome::Failed(e)
            }
        }
    }
}

/// Handler for the enrollment confirmation email.
///
/// Real delivery (SMTP or a provider) is an external collaborator; the
/// handler loads the enrollment and emits the send record.
pub fn send_enrollment_email_handler(
    enrollments: Arc<dyn EnrollmentRepository>,
) -> TaskHandler {
    Arc::new(move |enrollment_id, _payload| {
        let enrollments = Arc::clone(&enrollments);
        Box::pin(async move {
            let enrollment = enrollments
                .load(enrollment_id)
                .await
                .map_err(|e| e.to_string())?;

            let Some(enrollment) = enrollment else {
                tracing::warn!(enrollment_id = %enrollment_id, "enrollment does not exist, skipping email");
                return Ok(());
            };

            tracing::info!(
                student_id = %enrollment.student_id,
                course_id = %enrollment.course_id,
                "sending enrollment email"
            );
            Ok(())
        })
    })
}

/// Periodic report: course and enrollment counts.
pub fn start_daily_report(
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so the report runs on
        // the configured cadence after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let courses_count = match courses.load_list(&CourseFilter::default()).await {
                Ok(list) => list.len(),
                Err(e) => {
                    tracing::warn!(error = %e, "daily report failed to load courses");
                    continue;
                }
            };
            let enrollments_count = match enrollments.load_list(None).await {
                Ok(list) => list.len(),
                Err(e) => {
                    tracing::warn!(error = %e, "daily report failed to load enrollments");
                    continue;
                }
            };

            tracing::info!(
                total_courses = %courses_count,
                total_enrollments = %enrollments_count,
                "daily report"
            );
        }
    })
}
