use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Mapping from raw grade ranges to GPA point values, ordered from highest
 * range to lowest. Each entry is (`lower_bound`, `upper_bound`, gpa) with
 * both bounds inclusive.
 */
const GPA_MAPPING: [(f64, f64, f64); 11] = [
    (93.0, 100.0, 4.0),
    (90.0, 92.0, 3.7),
    (87.0, 89.0, 3.3),
    (83.0, 86.0, 3.0),
    (80.0, 82.0, 2.7),
    (77.0, 79.0, 2.3),
    (73.0, 76.0, 2.0),
    (70.0, 72.0, 1.7),
    (67.0, 69.0, 1.3),
    (65.0, 66.0, 1.0),
    (0.0, 64.0, 0.0),
];

/**
 * Maps a raw grade on the 0-100 scale to its GPA point value.
 *
 * The table is scanned from the highest range down and the first range whose
 * lower bound does not exceed the grade wins. This keeps the lookup total
 * for fractional grades that fall between the integer upper bound of one
 * range and the lower bound of the next, e.g. 92.5 maps to 3.7.
 *
 * Grades outside 0-100, or non-finite values, are rejected.
 *
 * # Arguments
 * `grade`: The raw grade to map.
 *
 * # Returns
 * The GPA point value or a validation error for out-of-domain input.
 */
pub fn gpa_for_grade(grade: f64) -> Result<f64, ApplicationError> {
    if !grade.is_finite() || !(0.0..=100.0).contains(&grade) {
        return Err(ApplicationError::new(ErrorType::Validation, format!("Grade out of range: {grade}. Grades must be between 0 and 100")));
    }
    for (lower_bound, _upper_bound, gpa) in GPA_MAPPING {
        if grade >= lower_bound {
            return Ok(gpa);
        }
    }
    // 0.0 >= 0.0 always matches the last range.
    Err(ApplicationError::new(ErrorType::Validation, format!("Grade out of range: {grade}. Grades must be between 0 and 100")))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_boundary_values_map_to_documented_gpa() {
        let expected = [(93.0, 4.0), (90.0, 3.7), (87.0, 3.3), (83.0, 3.0), (80.0, 2.7), (77.0, 2.3), (73.0, 2.0), (70.0, 1.7), (67.0, 1.3), (65.0, 1.0), (0.0, 0.0)];
        for (grade, gpa) in expected {
            assert_eq!(gpa_for_grade(grade).unwrap(), gpa, "grade {grade}");
        }
    }

    #[test]
    fn test_upper_bounds_map_to_own_range() {
        assert_eq!(gpa_for_grade(100.0).unwrap(), 4.0);
        assert_eq!(gpa_for_grade(92.0).unwrap(), 3.7);
        assert_eq!(gpa_for_grade(89.0).unwrap(), 3.3);
        assert_eq!(gpa_for_grade(64.0).unwrap(), 0.0);
    }

    #[test]
    fn test_every_integer_grade_maps() {
        for grade in 0..=100 {
            assert!(gpa_for_grade(f64::from(grade)).is_ok(), "grade {grade}");
        }
    }

    #[test]
    fn test_fractional_grades() {
        assert_eq!(gpa_for_grade(92.5).unwrap(), 3.7);
        assert_eq!(gpa_for_grade(95.3).unwrap(), 4.0);
        assert_eq!(gpa_for_grade(66.9).unwrap(), 1.0);
        assert_eq!(gpa_for_grade(64.999).unwrap(), 0.0);
        assert_eq!(gpa_for_grade(0.5).unwrap(), 0.0);
    }

    #[test]
    fn test_out_of_domain_grades_rejected() {
        assert!(gpa_for_grade(-0.1).is_err());
        assert!(gpa_for_grade(100.1).is_err());
        assert!(gpa_for_grade(f64::NAN).is_err());
        assert!(gpa_for_grade(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejection_is_validation_error() {
        let error = gpa_for_grade(101.0).unwrap_err();
        assert_eq!(error.error_type, crate::model::apperror::ErrorType::Validation);
        assert_eq!(error.message, "Grade out of range: 101. Grades must be between 0 and 100");
    }
}
