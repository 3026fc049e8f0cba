use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorType {
    /**
     * Failure while wiring up the application at startup.
     */
    Initialization,
    /**
     * Client input failed validation.
     */
    Validation,
    /**
     * The database cannot be reached or a connection cannot be acquired.
     */
    Connection,
    /**
     * A referenced student or teacher does not exist.
     */
    NotFound,
    /**
     * Any other failure while executing a query or transaction.
     */
    DatabaseError,
    /**
     * Internal invariant breakage, e.g. an id-keyed update touching several rows.
     */
    Application,
}

/**
 * Represents an error that occurs within the application.
 *
 * Database failures additionally carry the failed statement, its parameters
 * and the driver error. These are for logging only and must never be
 * returned to the client.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
    /**
     * The SQL statement that failed, if any.
     */
    pub statement: Option<String>,
    /**
     * The bound parameters of the failed statement, if any.
     */
    pub parameters: Option<String>,
    /**
     * The underlying driver error, if any.
     */
    pub cause: Option<String>,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message, statement: None, parameters: None, cause: None }
    }

    /**
     * Creates a generic database error carrying the failed statement, its
     * parameters and the underlying cause.
     *
     * #Arguments
     * `message`: A description of the error.
     * `statement`: The SQL statement that failed.
     * `parameters`: The bound parameters of the failed statement.
     * `cause`: The underlying driver error.
     */
    pub fn database(message: String, statement: &str, parameters: String, cause: String) -> Self {
        ApplicationError { error_type: ErrorType::DatabaseError, message, statement: Some(statement.to_string()), parameters: Some(parameters), cause: Some(cause) }
    }

    /**
     * Full diagnostic line for the log. Includes statement, parameters and
     * cause when present.
     */
    pub fn log_message(&self) -> String {
        format!(
            "{:?}: {} | SQL: {} | params: {} | original error: {}",
            self.error_type,
            self.message,
            self.statement.as_deref().unwrap_or("-"),
            self.parameters.as_deref().unwrap_or("-"),
            self.cause.as_deref().unwrap_or("-")
        )
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
