use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ApplicationId, StudentId, StudentRegistration, TransferSubmission, UserId,
};
use super::machine::{ReviewAction, WorkflowError};
use super::repository::{ApplicationRepository, Directory, NotificationPublisher};
use super::service::{TransferService, TransferServiceError};

/// Header carrying the authenticated caller, set by the upstream auth proxy.
pub const USER_HEADER: &str = "x-user-id";

/// Router exposing registration, submission, review, dashboard and report endpoints.
pub fn transfer_router<R, D, N>(service: Arc<TransferService<R, D, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/students/register",
            post(register_handler::<R, D, N>),
        )
        .route(
            "/api/v1/programs/eligible",
            get(eligible_programs_handler::<R, D, N>),
        )
        .route("/api/v1/transfers", post(submit_handler::<R, D, N>))
        .route(
            "/api/v1/transfers/:application_id",
            get(detail_handler::<R, D, N>),
        )
        .route(
            "/api/v1/transfers/:application_id/review",
            post(review_handler::<R, D, N>),
        )
        .route("/api/v1/reviews/pending", get(pending_handler::<R, D, N>))
        .route("/api/v1/dashboard", get(dashboard_handler::<R, D, N>))
        .route("/api/v1/reports/summary", get(summary_handler::<R, D, N>))
        .route(
            "/api/v1/reports/faculty",
            get(faculty_report_handler::<R, D, N>),
        )
        .route(
            "/api/v1/reports/students/:student_id",
            get(student_record_handler::<R, D, N>),
        )
        .route(
            "/api/v1/reports/export.csv",
            get(export_handler::<R, D, N>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// Body of a review request. On rejection `comment` carries the reason.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub decision: Decision,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub new_admission_number: Option<String>,
}

impl ReviewRequest {
    pub fn into_action(self) -> ReviewAction {
        match self.decision {
            Decision::Approve => ReviewAction::Approve {
                comment: self.comment,
                new_admission_number: self.new_admission_number,
            },
            Decision::Reject => ReviewAction::Reject {
                reason: self.comment.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FacultyQuery {
    code: Option<String>,
}

fn current_user(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(UserId)
        .ok_or_else(|| {
            let payload = json!({
                "error": "authentication required",
                "redirect": "/login",
            });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })
}

/// Extractor rejections are reported like any other validation failure.
fn malformed(detail: String) -> TransferServiceError {
    TransferServiceError::Workflow(WorkflowError::Validation(detail))
}

/// Error body with a fallback view: the caller's dashboard, or `/` without a profile.
fn failure<R, D, N>(
    service: &TransferService<R, D, N>,
    user: Option<UserId>,
    error: TransferServiceError,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let redirect = user
        .and_then(|user| service.role_of(user))
        .map(|role| role.dashboard_path())
        .unwrap_or("/");
    let payload = json!({
        "error": error.to_string(),
        "redirect": redirect,
    });
    (error.kind().status(), axum::Json(payload)).into_response()
}

pub(crate) async fn register_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    payload: Result<axum::Json<StudentRegistration>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let axum::Json(form) = match payload {
        Ok(form) => form,
        Err(rejection) => return failure(&service, None, malformed(rejection.body_text())),
    };
    match service.register_student(form) {
        Ok(student) => (StatusCode::CREATED, axum::Json(student)).into_response(),
        Err(error) => failure(&service, None, error),
    }
}

pub(crate) async fn eligible_programs_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.eligible_programs(user) {
        Ok(programs) => (StatusCode::OK, axum::Json(programs)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn submit_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
    payload: Result<axum::Json<TransferSubmission>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let axum::Json(submission) = match payload {
        Ok(submission) => submission,
        Err(rejection) => return failure(&service, Some(user), malformed(rejection.body_text())),
    };
    match service.submit(user, submission) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn detail_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let Path(application_id) = match path {
        Ok(path) => path,
        Err(rejection) => return failure(&service, Some(user), malformed(rejection.body_text())),
    };
    match service.get(user, ApplicationId(application_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn review_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<axum::Json<ReviewRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let Path(application_id) = match path {
        Ok(path) => path,
        Err(rejection) => return failure(&service, Some(user), malformed(rejection.body_text())),
    };
    let axum::Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return failure(&service, Some(user), malformed(rejection.body_text())),
    };
    match service.review(user, ApplicationId(application_id), request.into_action()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn pending_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.pending_queue(user) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn dashboard_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.dashboard(user) {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn summary_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.status_summary(user) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn faculty_report_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
    query: Result<Query<FacultyQuery>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return failure(&service, Some(user), malformed(rejection.body_text())),
    };
    let code = query
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());
    match service.faculty_report(user, code) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn student_record_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let Path(student_id) = match path {
        Ok(path) => path,
        Err(rejection) => return failure(&service, Some(user), malformed(rejection.body_text())),
    };
    match service.student_record(user, StudentId(student_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => failure(&service, Some(user), error),
    }
}

pub(crate) async fn export_handler<R, D, N>(
    State(service): State<Arc<TransferService<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.export_csv(user) {
        Ok(export) => {
            let disposition = format!("attachment; filename=\"{}\"", export.filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                export.body,
            )
                .into_response()
        }
        Err(error) => failure(&service, Some(user), error),
    }
}
