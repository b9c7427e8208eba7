use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    extract::rejection::JsonRejection,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

use learnhub_core::{
    Course, CourseInput, Enrollment, EnrollmentInput, Fault, Principal, RequestContext, Role,
};
use learnhub_storage::CourseFilter;

use crate::problem::problem_response;
use crate::server::AppState;
use crate::tasks::TASK_SEND_ENROLLMENT_EMAIL;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "LearnHub Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    // The store is an optimization; degraded readiness is still ready.
    let stats = state.store.stats();
    let body = json!({
        "status": "ready",
        "store": {
            "mode": stats.mode,
            "available": state.store.is_available().await,
            "cache_enabled": stats.cache_enabled,
        },
    });
    (StatusCode::OK, Json(body))
}

// ---- Courses ----

pub async fn list_courses(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(principal): Extension<Principal>,
    uri: Uri,
) -> Response {
    match list_courses_inner(&state, principal).await {
        Ok(courses) => (StatusCode::OK, Json(courses)).into_response(),
        Err(fault) => problem_response(&fault, &ctx, uri.path()),
    }
}

async fn list_courses_inner(
    state: &AppState,
    principal: Principal,
) -> Result<Vec<Course>, Fault> {
    match principal.role {
        // Anonymous listing is the only cached one: the shared list key is
        // not partitioned by caller identity, so role-filtered results must
        // never land under it.
        Role::Anonymous => {
            let repo = Arc::clone(&state.courses);
            let courses = state
                .cache
                .read_list(move || async move { repo.load_list(&CourseFilter::published()).await })
                .await?;
            Ok(courses)
        }
        Role::Student => Ok(state.courses.load_list(&CourseFilter::published()).await?),
        Role::Instructor | Role::Admin => {
            Ok(state.courses.load_list(&CourseFilter::default()).await?)
        }
    }
}

pub async fn read_course(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    uri: Uri,
) -> Response {
    match read_course_inner(&state, principal, id).await {
        Ok(course) => (StatusCode::OK, Json(course)).into_response(),
        Err(fault) => problem_response(&fault, &ctx, uri.path()),
    }
}

async fn read_course_inner(
    state: &AppState,
    principal: Principal,
    id: i64,
) -> Result<Course, Fault> {
    let repo = Arc::clone(&state.courses);
    let course = state
        .cache
        .read_detail(id, move || async move { repo.load(id).await })
        .await?
        .ok_or_else(|| Fault::not_found("course", id))?;

    // The cached entity is role-independent; visibility is decided after the
    // fetch. Unpublished courses exist only for staff.
    let visible = course.is_published || principal.role.is_staff();
    if !visible {
        return Err(Fault::not_found("course", id));
    }
    Ok(course)
}

pub async fn create_course(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(principal): Extension<Principal>,
    uri: Uri,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> Response {
    match create_course_inner(&state, principal, payload).await {
        Ok(course) => (StatusCode::CREATED, Json(course)).into_response(),
        Err(fault) => problem_response(&fault, &ctx, uri.path()),
    }
}

async fn create_course_inner(
    state: &AppState,
    principal: Principal,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> Result<Course, Fault> {
    let Json(input) = payload.map_err(|e| Fault::validation(e.body_text()))?;
    let owner_id = require_staff(principal)?;

    let errors = input.validate();
    if !errors.is_empty() {
        return Err(Fault::validation_fields("invalid course", errors));
    }

    let course = state
        .courses
        .save(Course {
            id: 0,
            title: input.title,
            description: input.description,
            owner_id,
            price_cents: input.price_cents,
            is_published: input.is_published,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    // Invalidate after commit, before the response: the next read observes
    // fresh data.
    state.cache.invalidate(course.id).await;
    Ok(course)
}

pub async fn update_course(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    uri: Uri,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> Response {
    match update_course_inner(&state, principal, id, payload).await {
        Ok(course) => (StatusCode::OK, Json(course)).into_response(),
        Err(fault) => problem_response(&fault, &ctx, uri.path()),
    }
}

async fn update_course_inner(
    state: &AppState,
    principal: Principal,
    id: i64,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> Result<Course, Fault> {
    let Json(input) = payload.map_err(|e| Fault::validation(e.body_text()))?;

    // Write path reads the source of truth directly, never the cache.
    let existing = state
        .courses
        .load(id)
        .await?
        .ok_or_else(|| Fault::not_found("course", id))?;
    require_owner_or_admin(principal, existing.owner_id)?;

    let errors = input.validate();
    if !errors.is_empty() {
        return Err(Fault::validation_fields("invalid course", errors));
    }

    let course = state
        .courses
        .save(Course {
            id,
            title: input.title,
            description: input.description,
            owner_id: existing.owner_id,
            price_cents: input.price_cents,
            is_published: input.is_published,
            created_at: existing.created_at,
        })
        .await?;

    state.cache.invalidate(id).await;
    Ok(course)
}

pub async fn delete_course(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    uri: Uri,
) -> Response {
    match delete_course_inner(&state, principal, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(fault) => problem_response(&fault, &ctx, uri.path()),
    }
}

async fn delete_course_inner(state: &AppState, principal: Principal, id: i64) -> Result<(), Fault> {
    let existing = state
        .courses
        .load(id)
        .await?
        .ok_or_else(|| Fault::not_found("course", id))?;
    require_owner_or_admin(principal, existing.owner_id)?;

    state.courses.delete(id).await?;
    state.cache.invalidate(id).await;
    Ok(())
}

// ---- Enrollments ----

pub async fn list_enrollments(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(principal): Extension<Principal>,
    uri: Uri,
) -> Response {
    match list_enrollments_inner(&state, principal).await {
        Ok(enrollments) => (StatusCode::OK, Json(enrollments)).into_response(),
        Err(fault) => problem_response(&fault, &ctx, uri.path()),
    }
}

async fn list_enrollments_inner(
    state: &AppState,
    principal: Principal,
) -> Result<Vec<Enrollment>, Fault> {
    let user_id = principal
        .user_id
        .ok_or_else(|| Fault::permission("Authentication required"))?;

    // Students see only their own enrollments; staff see all.
    let student_filter = match principal.role {
        Role::Student => Some(user_id),
        Role::Instructor | Role::Admin => None,
        Role::Anonymous => return Err(Fault::permission("Authentication required")),
    };
    Ok(state.enrollments.load_list(student_filter).await?)
}

pub async fn create_enrollment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(principal): Extension<Principal>,
    uri: Uri,
    payload: Result<Json<EnrollmentInput>, JsonRejection>,
) -> Response {
    match create_enrollment_inner(&state, principal, payload).await {
        Ok(enrollment) => (StatusCode::CREATED, Json(enrollment)).into_response(),
        Err(fault) => problem_response(&fault, &ctx, uri.path()),
    }
}

async fn create_enrollment_inner(
    state: &AppState,
    principal: Principal,
    payload: Result<Json<EnrollmentInput>, JsonRejection>,
) -> Result<Enrollment, Fault> {
    let Json(input) = payload.map_err(|e| Fault::validation(e.body_text()))?;

    if principal.role != Role::Student {
        return Err(Fault::permission("Only students can enroll"));
    }
    let student_id = principal
        .user_id
        .ok_or_else(|| Fault::permission("Authentication required"))?;

    state
        .courses
        .load(input.course_id)
        .await?
        .filter(|c| c.is_published)
        .ok_or_else(|| Fault::not_found("course", input.course_id))?;

    let enrollment = state
        .enrollments
        .save(Enrollment {
            id: 0,
            course_id: input.course_id,
            student_id,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    // Fire-and-forget: the response never waits for the email task.
    state.dispatcher.dispatch(
        TASK_SEND_ENROLLMENT_EMAIL,
        enrollment.id,
        json!({ "course_id": enrollment.course_id, "student_id": enrollment.student_id }),
    );

    Ok(enrollment)
}

pub async fn delete_enrollment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    uri: Uri,
) -> Response {
    match delete_enrollment_inner(&state, principal, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(fault) => problem_response(&fault, &ctx, uri.path()),
    }
}

async fn delete_enrollment_inner(
    state: &AppState,
    principal: Principal,
    id: i64,
) -> Result<(), Fault> {
    let enrollment = state
        .enrollments
        .load(id)
        .await?
        .ok_or_else(|| Fault::not_found("enrollment", id))?;

    let allowed = principal.role == Role::Admin
        || (principal.role == Role::Student && principal.user_id == Some(enrollment.student_id));
    if !allowed {
        return Err(Fault::permission(
            "Only the enrolled student or an admin can unenroll",
        ));
    }

    state.enrollments.delete(id).await?;
    Ok(())
}

// ---- Role checks ----

fn require_staff(principal: Principal) -> Result<i64, Fault> {
    let user_id = principal
        .user_id
        .ok_or_else(|| Fault::permission("Authentication required"))?;
    if !principal.role.is_staff() {
        return Err(Fault::permission(
            "Only instructors or admins can manage courses",
        ));
    }
    Ok(user_id)
}

fn require_owner_or_admin(principal: Principal, owner_id: i64) -> Result<(), Fault> {
    if principal.role == Role::Admin {
        return Ok(());
    }
    if principal.role == Role::Instructor && principal.user_id == Some(owner_id) {
        return Ok(());
    }
    Err(Fault::permission("Only the owner or an admin can modify this course"))
}
