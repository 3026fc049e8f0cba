use actix_web::{
    get, put, web::{self, Path}, HttpRequest, HttpResponse
};
use tracing::{instrument, Instrument};

use crate::{
    api::{
        rest::{ChangeTeacherRequest, ChangeTeacherResponse, GradePeriodQuery, PingResponse, StudentGpaListResponse},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{GradePeriodInput, TeacherChangeInputType},
    },
};

/**
 * Liveness endpoint. Also reports whether the database was reachable.
 */
#[get("/ping")]
pub async fn ping(app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    Ok(HttpResponse::Ok().json(PingResponse::new(true, app_state.student_service.has_database_connection())))
}

/**
 * Endpoint to retrieve each student's cumulative GPA joined with the teacher
 * name. Optional startDate/endDate query parameters (DD-MM-YYYY, inclusive)
 * restrict which course records qualify.
 */
#[instrument(level = "info", skip(http_request, period, app_state), fields(service = "listStudentsCumulativeGpa", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/students:cumulativeGpa")]
pub async fn students_cumulative_gpa_list(http_request: HttpRequest, period: web::Query<GradePeriodQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let period_input = GradePeriodInput::try_from(period.into_inner())?;
    let output = match (period_input.start_date, period_input.end_date) {
        (Some(start_date), Some(end_date)) => app_state.student_service.get_cumulative_gpa_list_between(start_date, end_date).instrument(span).await?,
        (Some(start_date), None) => app_state.student_service.get_cumulative_gpa_list_after(start_date).instrument(span).await?,
        (None, Some(end_date)) => app_state.student_service.get_cumulative_gpa_list_before(end_date).instrument(span).await?,
        (None, None) => app_state.student_service.get_cumulative_gpa_list().instrument(span).await?,
    };
    Ok(HttpResponse::Ok().json(StudentGpaListResponse::from(output)))
}

/**
 * Endpoint to reassign a student to a different teacher. Responds with the
 * student joined with the new teacher as re-read after the commit.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "changeTeacher", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/students/{studentId}/teacher")]
pub async fn student_change_teacher(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<ChangeTeacherRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let student_id = path.into_inner();
    let teacher_change_input = TeacherChangeInputType::new(student_id, request_body.new_teacher_id).validate()?;
    let output = app_state.student_service.change_teacher(teacher_change_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ChangeTeacherResponse::from(output)))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID")
        .and_then(|v| v.to_str().ok().map(std::string::ToString::to_string))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
