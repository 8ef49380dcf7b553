use rust_decimal::Decimal;

use super::domain::AdmissionSubmission;

/// Reasons a submission is refused before it reaches the pending queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("registration fee must be greater than zero (found {found})")]
    NonPositiveFee { found: Decimal },
}

/// Trims every text field and checks the submission is complete.
pub fn validate_submission(
    submission: AdmissionSubmission,
) -> Result<AdmissionSubmission, AdmissionValidationError> {
    let submission = AdmissionSubmission {
        student_name: submission.student_name.trim().to_string(),
        father_name: submission.father_name.trim().to_string(),
        mother_name: submission.mother_name.trim().to_string(),
        address: submission.address.trim().to_string(),
        class: submission.class.trim().to_string(),
        parent_mobile: submission.parent_mobile.trim().to_string(),
        registration_fee: submission.registration_fee,
    };

    let required = [
        ("student name", &submission.student_name),
        ("father's name", &submission.father_name),
        ("mother's name", &submission.mother_name),
        ("address", &submission.address),
        ("class", &submission.class),
        ("parent's mobile number", &submission.parent_mobile),
    ];
    for (field, value) in required {
        if value.is_empty() {
            return Err(AdmissionValidationError::MissingField { field });
        }
    }

    if submission.registration_fee <= Decimal::ZERO {
        return Err(AdmissionValidationError::NonPositiveFee {
            found: submission.registration_fee,
        });
    }

    Ok(submission)
}
