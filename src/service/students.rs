use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    dao::students::{QueryStudentGradesDbResp, StudentDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{GradePeriodInput, StudentGpaType, TeacherChangeInputType, TeacherChangeOutputType},
    },
    service::gpa,
};

/**
 * Names used by the sample data seeder. Two teachers with five students each,
 * mirroring the dataset the service was originally exercised with.
 */
const SEED_TEACHERS: [&str; 2] = ["Margaret Hamilton", "Grace Hopper"];
const SEED_STUDENTS: [&str; 10] = ["Ada Lovelace", "Alan Turing", "Edsger Dijkstra", "Donald Knuth", "Barbara Liskov", "John Backus", "Frances Allen", "Tony Hoare", "Niklaus Wirth", "Radia Perlman"];

/**
 * Represents the service for student grade aggregation and teacher
 * reassignment.
 */
pub struct StudentService {
    /**
     * The DAO for student operations.
     */
    student_dao: StudentDao,
    /**
     * Optional connection pool for database operations. None when the startup
     * connection attempt failed; data operations are then refused.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl StudentService {
    /**
     * Creates a new instance of `StudentService`.
     *
     * # Arguments
     * `student_dao`: The DAO for student operations.
     * `connection_pool`: Optional connection pool for database operations.
     *
     * # Returns
     * A new instance of `StudentService`.
     */
    pub fn new(student_dao: StudentDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        StudentService { student_dao, connection_pool }
    }

    /**
     * Whether a database connection pool is available.
     */
    pub fn has_database_connection(&self) -> bool {
        self.connection_pool.is_some()
    }

    /**
     * Retrieves every student's cumulative GPA joined with the teacher name.
     *
     * # Returns
     * A Result containing the student GPA list or an `ApplicationError`.
     */
    pub async fn get_cumulative_gpa_list(&self) -> Result<Vec<StudentGpaType>, ApplicationError> {
        self.cumulative_gpa_list(GradePeriodInput::new(None, None)).await
    }

    /**
     * Retrieves cumulative GPAs restricted to course records with an end date
     * on or after `start_date`.
     *
     * # Arguments
     * `start_date`: The inclusive lower bound on record end dates.
     *
     * # Returns
     * A Result containing the student GPA list or an `ApplicationError`.
     */
    pub async fn get_cumulative_gpa_list_after(&self, start_date: NaiveDate) -> Result<Vec<StudentGpaType>, ApplicationError> {
        self.cumulative_gpa_list(GradePeriodInput::new(Some(start_date), None)).await
    }

    /**
     * Retrieves cumulative GPAs restricted to course records with an end date
     * on or before `end_date`.
     *
     * # Arguments
     * `end_date`: The inclusive upper bound on record end dates.
     *
     * # Returns
     * A Result containing the student GPA list or an `ApplicationError`.
     */
    pub async fn get_cumulative_gpa_list_before(&self, end_date: NaiveDate) -> Result<Vec<StudentGpaType>, ApplicationError> {
        self.cumulative_gpa_list(GradePeriodInput::new(None, Some(end_date))).await
    }

    /**
     * Retrieves cumulative GPAs restricted to course records with an end date
     * within the inclusive window.
     *
     * # Arguments
     * `start_date`: The inclusive lower bound on record end dates.
     * `end_date`: The inclusive upper bound on record end dates.
     *
     * # Returns
     * A Result containing the student GPA list or an `ApplicationError`.
     */
    pub async fn get_cumulative_gpa_list_between(&self, start_date: NaiveDate, end_date: NaiveDate) -> Result<Vec<StudentGpaType>, ApplicationError> {
        self.cumulative_gpa_list(GradePeriodInput::new(Some(start_date), Some(end_date))).await
    }

    /**
     * Fetches qualifying grade rows and aggregates them per student.
     */
    async fn cumulative_gpa_list(&self, period: GradePeriodInput) -> Result<Vec<StudentGpaType>, ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::Connection, "No database connection available".to_string()));
        };
        let mut connection = connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::Connection, format!("Failed to acquire database connection: {err}")))?;
        let rows = self.student_dao.get_student_grades(&mut connection, period).await?;
        Self::aggregate_cumulative_gpa(rows)
    }

    /**
     * Maps raw grades through the GPA table, groups them per student and
     * averages. Grouping preserves the first-seen row order. Students without
     * a qualifying course record are not present in the input rows and
     * produce no output.
     *
     * # Arguments
     * `rows`: Grade rows as fetched by the DAO.
     *
     * # Returns
     * A Result containing one entry per student or an `ApplicationError` if a
     * stored grade is outside the 0-100 domain.
     */
    fn aggregate_cumulative_gpa(rows: Vec<QueryStudentGradesDbResp>) -> Result<Vec<StudentGpaType>, ApplicationError> {
        let mut student_order: Vec<i64> = Vec::new();
        let mut grouped: HashMap<i64, (String, String, Vec<f64>)> = HashMap::new();
        for (student_id, student_name, teacher_name, grade) in rows {
            let gpa = gpa::gpa_for_grade(grade)?;
            if let Some(entry) = grouped.get_mut(&student_id) {
                entry.2.push(gpa);
            } else {
                student_order.push(student_id);
                grouped.insert(student_id, (student_name, teacher_name, vec![gpa]));
            }
        }
        let mut elements: Vec<StudentGpaType> = Vec::with_capacity(student_order.len());
        for student_id in student_order {
            let Some((student_name, teacher_name, gpas)) = grouped.remove(&student_id) else {
                return Err(ApplicationError::new(ErrorType::Application, format!("Missing aggregation group for student {student_id}")));
            };
            #[allow(clippy::cast_precision_loss)]
            let cumulative_gpa = gpas.iter().sum::<f64>() / gpas.len() as f64;
            elements.push(StudentGpaType::new(student_name, teacher_name, cumulative_gpa));
        }
        Ok(elements)
    }

    /**
     * Reassigns a student to a different teacher.
     *
     * The update runs in its own transaction and is rolled back on any
     * failure. After a successful commit the student is re-read joined with
     * the new teacher so the response reflects the committed state.
     *
     * # Arguments
     * `teacher_change_input`: The student id and the new teacher id.
     *
     * # Returns
     * A Result containing the updated student joined with the new teacher, or
     * an `ApplicationError`.
     */
    pub async fn change_teacher(&self, teacher_change_input: TeacherChangeInputType) -> Result<TeacherChangeOutputType, ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::Connection, "No database connection available".to_string()));
        };
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.student_dao.update_student_teacher(&mut transaction, teacher_change_input).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        let mut connection = connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::Connection, format!("Failed to acquire database connection: {err}")))?;
        match self.student_dao.get_student_with_teacher(&mut connection, teacher_change_input.student_id).await? {
            Some((student_id, student_name, teacher_id, teacher_name)) => Ok(TeacherChangeOutputType::new(student_id, student_name, teacher_id, teacher_name)),
            None => {
                // The update committed, so a missing row here is a race or corruption.
                tracing::warn!("Student with ID {} missing after committed teacher update", teacher_change_input.student_id);
                Err(ApplicationError::new(ErrorType::NotFound, "student cannot be found after the update".to_string()))
            }
        }
    }

    /**
     * Seeds the database with a deterministic sample dataset: two teachers
     * with five students each and one course record per student for april
     * and november of 2021 through 2024. Grades follow a fixed arithmetic
     * pattern so reseeding is reproducible.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    pub async fn seed_sample_data(&self) -> Result<(), ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::Connection, "No database connection available".to_string()));
        };
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.seed_rows(&mut transaction).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        Ok(())
    }

    /**
     * Inserts the sample rows within the given transaction.
     */
    async fn seed_rows(&self, transaction: &mut sqlx::PgConnection) -> Result<(), ApplicationError> {
        let mut teacher_ids: Vec<i64> = Vec::with_capacity(SEED_TEACHERS.len());
        for teacher_name in SEED_TEACHERS {
            let teacher_id = self.student_dao.add_teacher(&mut *transaction, teacher_name).await?;
            teacher_ids.push(teacher_id);
        }
        tracing::info!("Seeded {} teachers", teacher_ids.len());

        let mut student_ids: Vec<i64> = Vec::with_capacity(SEED_STUDENTS.len());
        for (student_index, student_name) in SEED_STUDENTS.iter().enumerate() {
            let teacher_id = teacher_ids[student_index % teacher_ids.len()];
            let student_id = self.student_dao.add_student(&mut *transaction, student_name, teacher_id).await?;
            student_ids.push(student_id);
        }
        tracing::info!("Seeded {} students", student_ids.len());

        let mut record_dates: Vec<NaiveDate> = Vec::new();
        for year in 2021..=2024 {
            for (month, day) in [(4, 1), (11, 1)] {
                let record_date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| ApplicationError::new(ErrorType::Application, format!("Invalid seed date {year}-{month}-{day}")))?;
                record_dates.push(record_date);
            }
        }

        let mut record_count = 0;
        for (student_index, student_id) in student_ids.iter().enumerate() {
            for (record_index, record_date) in record_dates.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let grade = ((student_index * 17 + record_index * 7 + 31) % 101) as f64;
                self.student_dao.add_course_record(&mut *transaction, *student_id, *record_date, grade).await?;
                record_count += 1;
            }
        }
        tracing::info!("Seeded {record_count} course records");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn row(student_id: i64, student_name: &str, teacher_name: &str, grade: f64) -> QueryStudentGradesDbResp {
        (student_id, student_name.to_string(), teacher_name.to_string(), grade)
    }

    #[test]
    fn test_aggregate_two_grades_averages() {
        let rows = vec![row(1, "Ada Lovelace", "Margaret Hamilton", 95.0), row(1, "Ada Lovelace", "Margaret Hamilton", 85.0)];
        let result = StudentService::aggregate_cumulative_gpa(rows).unwrap();
        assert_eq!(result, vec![StudentGpaType::new("Ada Lovelace".to_string(), "Margaret Hamilton".to_string(), 3.5)]);
    }

    #[test]
    fn test_aggregate_groups_interleaved_students() {
        let rows = vec![
            row(1, "Ada Lovelace", "Margaret Hamilton", 95.0),
            row(2, "Alan Turing", "Grace Hopper", 70.0),
            row(1, "Ada Lovelace", "Margaret Hamilton", 85.0),
            row(2, "Alan Turing", "Grace Hopper", 72.0),
        ];
        let result = StudentService::aggregate_cumulative_gpa(rows).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0], StudentGpaType::new("Ada Lovelace".to_string(), "Margaret Hamilton".to_string(), 3.5));
        assert_eq!(result[1], StudentGpaType::new("Alan Turing".to_string(), "Grace Hopper".to_string(), 1.7));
    }

    #[test]
    fn test_aggregate_preserves_first_seen_order() {
        let rows = vec![row(7, "Tony Hoare", "Grace Hopper", 80.0), row(3, "Edsger Dijkstra", "Margaret Hamilton", 90.0)];
        let result = StudentService::aggregate_cumulative_gpa(rows).unwrap();
        assert_eq!(result[0].student_name, "Tony Hoare");
        assert_eq!(result[1].student_name, "Edsger Dijkstra");
    }

    #[test]
    fn test_aggregate_empty_rows() {
        let result = StudentService::aggregate_cumulative_gpa(vec![]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_aggregate_single_record_is_its_own_mean() {
        let rows = vec![row(1, "Ada Lovelace", "Margaret Hamilton", 88.0)];
        let result = StudentService::aggregate_cumulative_gpa(rows).unwrap();
        assert_eq!(result[0].cumulative_gpa, 3.3);
    }

    #[test]
    fn test_aggregate_rejects_out_of_domain_grade() {
        let rows = vec![row(1, "Ada Lovelace", "Margaret Hamilton", 101.0)];
        let result = StudentService::aggregate_cumulative_gpa(rows);
        assert_eq!(result.unwrap_err().error_type, ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_operations_refused_without_connection() {
        let service = StudentService::new(StudentDao::new(), None);
        assert!(!service.has_database_connection());
        let list_error = service.get_cumulative_gpa_list().await.unwrap_err();
        assert_eq!(list_error.error_type, ErrorType::Connection);
        assert_eq!(list_error.message, "No database connection available");
        let change_error = service.change_teacher(TeacherChangeInputType::new(1, 2)).await.unwrap_err();
        assert_eq!(change_error.error_type, ErrorType::Connection);
    }
}
