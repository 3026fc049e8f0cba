use crate::service::students::StudentService;

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The student service for grade aggregation and teacher reassignment.
     */
    pub student_service: StudentService,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `student_service`: The student service for grade aggregation and teacher reassignment.
 */
impl AppState {
    pub fn new(student_service: StudentService) -> Self {
        AppState { student_service }
    }
}
