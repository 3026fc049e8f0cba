use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{GradePeriodInput, StudentGpaType, TeacherChangeOutputType},
};

/***************** Ping models *********************/

/**
 * Response structure for the ping endpoint.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    pub pong: bool,
    /**
     * Whether the database was reachable at startup.
     */
    pub database_connected: bool,
}

impl PingResponse {
    pub fn new(pong: bool, database_connected: bool) -> Self {
        PingResponse { pong, database_connected }
    }
}

/***************** Cumulative GPA models *********************/

/**
 * Query parameters for the cumulative GPA listing. Dates are passed as
 * DD-MM-YYYY strings; both are optional and inclusive.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePeriodQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/**
 * Converts the raw query strings into a validated date window.
 */
impl TryFrom<GradePeriodQuery> for GradePeriodInput {
    type Error = ApplicationError;

    fn try_from(query: GradePeriodQuery) -> Result<Self, Self::Error> {
        let start_date = validate_date(query.start_date.as_deref())?;
        let end_date = validate_date(query.end_date.as_deref())?;
        Ok(GradePeriodInput::new(start_date, end_date))
    }
}

/**
 * Parses an optional DD-MM-YYYY date string.
 *
 * # Arguments
 * `date_string`: The string passed in as a query parameter, if any.
 *
 * # Returns
 * The parsed date, None when absent, or a validation error for a malformed
 * value.
 */
pub fn validate_date(date_string: Option<&str>) -> Result<Option<NaiveDate>, ApplicationError> {
    let Some(date_string) = date_string else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(date_string, "%d-%m-%Y")
        .map(Some)
        .map_err(|_err| ApplicationError::new(ErrorType::Validation, format!("Invalid date: {date_string}. Format should be DD-MM-YYYY")))
}

/**
 * Response structure for the cumulative GPA listing.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGpaListResponse {
    /**
     * One element per student with at least one qualifying course record.
     */
    students: Vec<StudentGpaElement>,
}

impl StudentGpaListResponse {
    pub fn new(students: Vec<StudentGpaElement>) -> Self {
        StudentGpaListResponse { students }
    }
}

impl From<Vec<StudentGpaType>> for StudentGpaListResponse {
    fn from(output: Vec<StudentGpaType>) -> Self {
        StudentGpaListResponse::new(output.into_iter().map(StudentGpaElement::from).collect())
    }
}

/**
 * A student's cumulative GPA joined with the assigned teacher.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGpaElement {
    /**
     * The name of the student.
     */
    student_name: String,
    /**
     * The name of the student's teacher.
     */
    teacher_name: String,
    /**
     * Arithmetic mean of the GPA-mapped grades across qualifying records.
     */
    cumulative_gpa: f64,
}

impl StudentGpaElement {
    pub fn new(student_name: String, teacher_name: String, cumulative_gpa: f64) -> Self {
        StudentGpaElement { student_name, teacher_name, cumulative_gpa }
    }
}

impl From<StudentGpaType> for StudentGpaElement {
    fn from(student: StudentGpaType) -> Self {
        StudentGpaElement::new(student.student_name, student.teacher_name, student.cumulative_gpa)
    }
}

/***************** Change teacher models *********************/

/**
 * Request structure for reassigning a student to a different teacher. The
 * student id is taken from the path.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeTeacherRequest {
    pub new_teacher_id: i64,
}

/**
 * Response structure for a teacher reassignment, reflecting the committed
 * state.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeTeacherResponse {
    student_id: i64,
    student_name: String,
    updated_teacher_id: i64,
    updated_teacher_name: String,
}

impl ChangeTeacherResponse {
    pub fn new(student_id: i64, student_name: String, updated_teacher_id: i64, updated_teacher_name: String) -> Self {
        ChangeTeacherResponse { student_id, student_name, updated_teacher_id, updated_teacher_name }
    }
}

impl From<TeacherChangeOutputType> for ChangeTeacherResponse {
    fn from(output: TeacherChangeOutputType) -> Self {
        ChangeTeacherResponse::new(output.student_id, output.student_name, output.updated_teacher_id, output.updated_teacher_name)
    }
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    /**
     * Generates an error response for the application error. Server side
     * failures are logged with their full diagnostics; the client only sees
     * the message.
     */
    fn error_response(&self) -> HttpResponse {
        let status_code = get_statuscode(&self.error_type);
        if status_code.is_server_error() {
            tracing::error!("{}", self.log_message());
        } else {
            tracing::debug!("{}", self.log_message());
        }
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(status_code).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Initialization => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorType::Connection => StatusCode::SERVICE_UNAVAILABLE,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::Connection => 1003,
        ErrorType::NotFound => 1004,
        ErrorType::DatabaseError => 1005,
        ErrorType::Application => 1006,
    }
}
