use chrono::NaiveDate;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Date window applied to course records when aggregating GPA. Both bounds
 * are optional and inclusive.
 */
#[derive(Debug, Clone, Copy)]
pub struct GradePeriodInput {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl GradePeriodInput {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        GradePeriodInput { start_date, end_date }
    }
}

/**
 * A student's cumulative GPA joined with the assigned teacher.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct StudentGpaType {
    pub student_name: String,
    pub teacher_name: String,
    pub cumulative_gpa: f64,
}

impl StudentGpaType {
    pub fn new(student_name: String, teacher_name: String, cumulative_gpa: f64) -> Self {
        StudentGpaType { student_name, teacher_name, cumulative_gpa }
    }
}

/**
 * Input for reassigning a student to a different teacher.
 */
#[derive(Debug, Clone, Copy)]
pub struct TeacherChangeInputType {
    pub student_id: i64,
    pub new_teacher_id: i64,
}

impl TeacherChangeInputType {
    pub fn new(student_id: i64, new_teacher_id: i64) -> Self {
        TeacherChangeInputType { student_id, new_teacher_id }
    }

    /**
     * Validates the input. Ids are storage-assigned and start at 1.
     *
     * # Returns
     * The validated input or a validation error.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.student_id < 1 {
            return Err(ApplicationError::new(ErrorType::Validation, format!("Invalid student id: {}", self.student_id)));
        }
        if self.new_teacher_id < 1 {
            return Err(ApplicationError::new(ErrorType::Validation, format!("Invalid teacher id: {}", self.new_teacher_id)));
        }
        Ok(self)
    }
}

/**
 * Result of a teacher reassignment, read back from the committed state.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct TeacherChangeOutputType {
    pub student_id: i64,
    pub student_name: String,
    pub updated_teacher_id: i64,
    pub updated_teacher_name: String,
}

impl TeacherChangeOutputType {
    pub fn new(student_id: i64, student_name: String, updated_teacher_id: i64, updated_teacher_name: String) -> Self {
        TeacherChangeOutputType { student_id, student_name, updated_teacher_id, updated_teacher_name }
    }
}
