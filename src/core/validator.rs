//! Custom validators

use std::borrow::Cow;
use validator::ValidationError;

/// Room names must contain something other than whitespace
pub fn validate_room_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut e = ValidationError::new("blank");
        e.message = Some(Cow::from("Room name cannot be empty."));
        return Err(e);
    }
    Ok(())
}

/// Canonical display form of a room name
pub fn normalize_room_name(name: &str) -> String {
    name.trim().to_string()
}

/// Key used for case-insensitive uniqueness of room names
pub fn room_key(name: &str) -> String {
    name.trim().to_lowercase()
}
