use std::borrow::Cow;

use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{GradePeriodInput, TeacherChangeInputType},
};

/**
 * Database response type for querying course grades per student. Fields are
 * student id, student name, teacher name and the raw grade.
 */
pub type QueryStudentGradesDbResp = (i64, String, String, f64);

/**
 * Database response type for querying a student joined with its teacher.
 * Fields are student id, student name, teacher id and teacher name.
 */
pub type QueryStudentWithTeacherDbResp = (i64, String, i64, String);

/**
 * SQL query to retrieve course grades joined with student and teacher.
 * The date bounds are optional; a null parameter disables that bound.
 */
const QUERY_STUDENT_GRADES: &str = "SELECT s.id, s.name, t.name, c.grade
                                 FROM course_record c, student s, teacher t
                                 WHERE c.student_id = s.id AND s.teacher_id = t.id AND
                                 ($1::date IS NULL OR c.end_date >= $1) AND
                                 ($2::date IS NULL OR c.end_date <= $2)
                                 ORDER BY s.id, c.end_date";

/**
 * SQL query to reassign a student to a different teacher.
 */
const UPDATE_STUDENT_TEACHER: &str = "UPDATE student SET teacher_id = $1 WHERE id = $2";

/**
 * SQL query to re-read a student joined with its teacher.
 */
const QUERY_STUDENT_WITH_TEACHER: &str = "SELECT s.id, s.name, t.id, t.name FROM student s, teacher t WHERE s.teacher_id = t.id AND s.id = $1";

/**
 * SQL query to add a new teacher.
 */
const ADD_TEACHER: &str = "INSERT INTO teacher (name) VALUES ($1) RETURNING id";

/**
 * SQL query to add a new student.
 */
const ADD_STUDENT: &str = "INSERT INTO student (name, teacher_id) VALUES ($1, $2) RETURNING id";

/**
 * SQL query to add a new course record.
 */
const ADD_COURSE_RECORD: &str = "INSERT INTO course_record (student_id, end_date, grade) VALUES ($1, $2, $3)";

/**
 * DAO for student-related database operations.
 */
pub struct StudentDao {}

impl StudentDao {
    /**
     * Creates a new instance of `StudentDao`.
     *
     * # Returns
     * A new instance of `StudentDao`.
     */
    pub fn new() -> Self {
        StudentDao {}
    }

    /**
     * Retrieves course grades joined with student and teacher names, with
     * optional inclusive date bounds on the record end date.
     *
     * # Arguments
     * `connection`: The database connection.
     * `period`: The optional date window to restrict course records to.
     *
     * # Returns
     * A Result containing the grade rows or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_student_grades(&self, connection: &mut PgConnection, period: GradePeriodInput) -> Result<Vec<QueryStudentGradesDbResp>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryStudentGradesDbResp> = sqlx::query_as(QUERY_STUDENT_GRADES)
            .bind(period.start_date)
            .bind(period.end_date)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| {
                ApplicationError::database("Failed to execute query to get student grades".to_string(), QUERY_STUDENT_GRADES, format!("[{:?}, {:?}]", period.start_date, period.end_date), err.to_string())
            })?;
        Ok(results)
    }

    /**
     * Updates the teacher assignment of a student.
     *
     * Zero affected rows means the student does not exist. A foreign key
     * violation means the new teacher does not exist. Both are not-found
     * conditions; any other database failure is a generic database error.
     *
     * # Arguments
     * `transaction`: The open transaction to execute the update within.
     * `teacher_change_input`: The student id and the new teacher id.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_student_teacher(&self, transaction: &mut PgConnection, teacher_change_input: TeacherChangeInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_STUDENT_TEACHER)
            .bind(teacher_change_input.new_teacher_id)
            .bind(teacher_change_input.student_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_teacher_update_error(&err, &teacher_change_input))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Student with ID {} not found for teacher update", teacher_change_input.student_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "student cannot be found".to_string()));
        }
        if result.rows_affected() > 1 {
            tracing::warn!("Multiple students attempted updated. Rolled back");
            return Err(ApplicationError::new(ErrorType::Application, "Multiple students attempted updated. Rolled back".to_string()));
        }
        Ok(())
    }

    /**
     * Reads a student joined with its teacher by student id.
     *
     * # Arguments
     * `connection`: The database connection.
     * `student_id`: The ID of the student to read.
     *
     * # Returns
     * A Result containing the joined row if the student exists, or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_student_with_teacher(&self, connection: &mut PgConnection, student_id: i64) -> Result<Option<QueryStudentWithTeacherDbResp>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryStudentWithTeacherDbResp> = sqlx::query_as(QUERY_STUDENT_WITH_TEACHER)
            .bind(student_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::database("Failed to execute query to get student with teacher".to_string(), QUERY_STUDENT_WITH_TEACHER, format!("[{student_id}]"), err.to_string()))?;
        Ok(result)
    }

    /**
     * Adds a new teacher to the database.
     *
     * # Arguments
     * `transaction`: The open transaction to execute the insert within.
     * `name`: The name of the teacher.
     *
     * # Returns
     * A Result containing the assigned teacher id or an `ApplicationError`.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_teacher(&self, transaction: &mut PgConnection, name: &str) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let row: (i64,) = sqlx::query_as(ADD_TEACHER)
            .bind(name)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, ADD_TEACHER, format!("[{name}]")))?;
        Ok(row.0)
    }

    /**
     * Adds a new student to the database.
     *
     * # Arguments
     * `transaction`: The open transaction to execute the insert within.
     * `name`: The name of the student.
     * `teacher_id`: The ID of the assigned teacher.
     *
     * # Returns
     * A Result containing the assigned student id or an `ApplicationError`.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_student(&self, transaction: &mut PgConnection, name: &str, teacher_id: i64) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let row: (i64,) = sqlx::query_as(ADD_STUDENT)
            .bind(name)
            .bind(teacher_id)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, ADD_STUDENT, format!("[{name}, {teacher_id}]")))?;
        Ok(row.0)
    }

    /**
     * Adds a new course record to the database. A student has at most one
     * record per end date.
     *
     * # Arguments
     * `transaction`: The open transaction to execute the insert within.
     * `student_id`: The ID of the student the record belongs to.
     * `end_date`: The end-of-period date of the record.
     * `grade`: The raw grade on the 0-100 scale.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_course_record(&self, transaction: &mut PgConnection, student_id: i64, end_date: NaiveDate, grade: f64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_COURSE_RECORD)
            .bind(student_id)
            .bind(end_date)
            .bind(grade)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, ADD_COURSE_RECORD, format!("[{student_id}, {end_date}, {grade}]")))?;
        Ok(())
    }

    /**
     * Maps an error from the teacher update statement. A foreign key
     * violation means the new teacher id does not resolve to a teacher row.
     *
     * # Arguments
     * `error`: The sqlx error to handle.
     * `teacher_change_input`: The input of the failed update.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_teacher_update_error(error: &sqlx::Error, teacher_change_input: &TeacherChangeInputType) -> ApplicationError {
        if let Some(db_error) = error.as_database_error() {
            tracing::debug!("Database error: {}", db_error);
            if db_error.code() == Some(Cow::Borrowed("23503")) {
                // Foreign key violation
                tracing::debug!("Teacher with ID {} not found for teacher update", teacher_change_input.new_teacher_id);
                return ApplicationError::new(ErrorType::NotFound, "teacher ID cannot be found".to_string());
            }
        }
        ApplicationError::database(
            "Failed to execute update of student teacher".to_string(),
            UPDATE_STUDENT_TEACHER,
            format!("[{}, {}]", teacher_change_input.new_teacher_id, teacher_change_input.student_id),
            error.to_string(),
        )
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The sqlx error to handle.
     * `statement`: The SQL statement that failed.
     * `parameters`: The bound parameters of the failed statement.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: &sqlx::Error, statement: &str, parameters: String) -> ApplicationError {
        if let Some(db_error) = error.as_database_error() {
            tracing::debug!("Database error: {}", db_error);
            if db_error.code() == Some(Cow::Borrowed("23505")) {
                // Unique violation
                return ApplicationError::new(ErrorType::Validation, "Already exists".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("23503")) {
                // Foreign key violation
                return ApplicationError::new(ErrorType::NotFound, "Missing parent record".to_string());
            }
            tracing::error!("Unhandled database error: {}", db_error);
        }
        ApplicationError::database("Failed to execute database operation".to_string(), statement, parameters, error.to_string())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::model::models::GradePeriodInput;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_student_grades_date_boundaries() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let student_dao = StudentDao::new();
        let teacher_id = student_dao.add_teacher(&mut transaction, "Test Teacher").await.unwrap();
        let student_id = student_dao.add_student(&mut transaction, "Test Student", teacher_id).await.unwrap();
        student_dao.add_course_record(&mut transaction, student_id, date(2023, 4, 1), 95.0).await.unwrap();
        student_dao.add_course_record(&mut transaction, student_id, date(2023, 11, 1), 85.0).await.unwrap();

        // Both bounds inclusive, record on the bound qualifies.
        let rows = student_dao.get_student_grades(&mut transaction, GradePeriodInput::new(Some(date(2023, 4, 1)), Some(date(2023, 11, 1)))).await.unwrap();
        assert_eq!(rows.len(), 2);
        let rows = student_dao.get_student_grades(&mut transaction, GradePeriodInput::new(Some(date(2023, 4, 2)), None)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().3, 85.0);
        let rows = student_dao.get_student_grades(&mut transaction, GradePeriodInput::new(None, Some(date(2023, 10, 31)))).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().3, 95.0);
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_student_without_records_excluded() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let student_dao = StudentDao::new();
        let teacher_id = student_dao.add_teacher(&mut transaction, "Test Teacher").await.unwrap();
        let with_records = student_dao.add_student(&mut transaction, "Student With Records", teacher_id).await.unwrap();
        let without_records = student_dao.add_student(&mut transaction, "Student Without Records", teacher_id).await.unwrap();
        student_dao.add_course_record(&mut transaction, with_records, date(2023, 4, 1), 90.0).await.unwrap();

        let rows = student_dao.get_student_grades(&mut transaction, GradePeriodInput::new(None, None)).await.unwrap();
        assert!(rows.iter().any(|row| row.0 == with_records));
        assert!(!rows.iter().any(|row| row.0 == without_records));
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_update_student_teacher_then_reread() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let student_dao = StudentDao::new();
        let first_teacher = student_dao.add_teacher(&mut transaction, "First Teacher").await.unwrap();
        let second_teacher = student_dao.add_teacher(&mut transaction, "Second Teacher").await.unwrap();
        let student_id = student_dao.add_student(&mut transaction, "Test Student", first_teacher).await.unwrap();

        let update_result = student_dao.update_student_teacher(&mut transaction, TeacherChangeInputType::new(student_id, second_teacher)).await;
        assert!(update_result.is_ok());

        let row = student_dao.get_student_with_teacher(&mut transaction, student_id).await.unwrap().unwrap();
        assert_eq!(row.0, student_id);
        assert_eq!(row.1, "Test Student");
        assert_eq!(row.2, second_teacher);
        assert_eq!(row.3, "Second Teacher");
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_update_student_teacher_missing_student() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let student_dao = StudentDao::new();
        let teacher_id = student_dao.add_teacher(&mut transaction, "Test Teacher").await.unwrap();

        let update_result = student_dao.update_student_teacher(&mut transaction, TeacherChangeInputType::new(999_999_999, teacher_id)).await;
        let error = update_result.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert_eq!(error.message, "student cannot be found");
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_update_student_teacher_missing_teacher() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let student_dao = StudentDao::new();
        let teacher_id = student_dao.add_teacher(&mut transaction, "Test Teacher").await.unwrap();
        let student_id = student_dao.add_student(&mut transaction, "Test Student", teacher_id).await.unwrap();

        let update_result = student_dao.update_student_teacher(&mut transaction, TeacherChangeInputType::new(student_id, 999_999_999)).await;
        let error = update_result.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert_eq!(error.message, "teacher ID cannot be found");
        // The failed statement aborted the transaction, only rollback is left.
        transaction.rollback().await.unwrap();

        // The student keeps its original teacher.
        let mut connection = pool.acquire().await.unwrap();
        let row = student_dao.get_student_with_teacher(&mut connection, student_id).await.unwrap();
        assert!(row.is_none()); // Seed data was rolled back together with the failed update.
    }

    #[sqlx::test]
    async fn test_duplicate_course_record_rejected() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let student_dao = StudentDao::new();
        let teacher_id = student_dao.add_teacher(&mut transaction, "Test Teacher").await.unwrap();
        let student_id = student_dao.add_student(&mut transaction, "Test Student", teacher_id).await.unwrap();
        student_dao.add_course_record(&mut transaction, student_id, date(2023, 4, 1), 95.0).await.unwrap();
        let duplicate = student_dao.add_course_record(&mut transaction, student_id, date(2023, 4, 1), 85.0).await;
        let error = duplicate.unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.message, "Already exists");
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /**
     * Initialize the database connection pool.
     */
    async fn init_db() -> PgPool {
        dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
        let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
        pool
    }
}
