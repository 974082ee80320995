use trust_types::Payload;

use crate::error::ValidationError;

/// Reject malformed content before any hash is computed.
///
/// Text and descriptions must be non-empty, free of control characters, and
/// within `max_len` bytes in canonical form. Movements must carry a non-zero
/// amount.
pub fn validate_payload(payload: &Payload, max_len: usize) -> Result<(), ValidationError> {
    match payload {
        Payload::Text(text) => {
            if text.trim().is_empty() {
                return Err(ValidationError::EmptyText);
            }
            check_chars(text)?;
        }
        Payload::Movement(m) => {
            if m.description.trim().is_empty() {
                return Err(ValidationError::EmptyDescription);
            }
            check_chars(&m.description)?;
            if m.amount.is_zero() {
                return Err(ValidationError::ZeroAmount);
            }
        }
    }

    let len = payload.canonical().len();
    if len > max_len {
        return Err(ValidationError::TooLong { len, max: max_len });
    }
    Ok(())
}

fn check_chars(text: &str) -> Result<(), ValidationError> {
    match text.chars().find(|c| c.is_control()) {
        Some(c) => Err(ValidationError::ControlCharacter(c)),
        None => Ok(()),
    }
}
