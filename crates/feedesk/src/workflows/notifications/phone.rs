#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid phone number format: '{raw}'")]
pub struct PhoneError {
    pub raw: String,
}

/// Reduce a parent's number to the 10 digits the SMS gateway accepts.
///
/// Non-digits are dropped, and a leading `91` country code is removed when more than ten digits
/// remain. Anything that is not then exactly ten digits is rejected.
pub fn normalize_phone(raw: &str) -> Result<String, PhoneError> {
    let digits = raw.chars().filter(char::is_ascii_digit).collect::<String>();
    let digits = if digits.starts_with("91") && digits.len() > 10 {
        digits[digits.len() - 10..].to_string()
    } else {
        digits
    };

    if digits.len() == 10 {
        Ok(digits)
    } else {
        Err(PhoneError {
            raw: raw.to_string(),
        })
    }
}
