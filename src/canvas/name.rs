//! Room names.
//!
//! Names are case-insensitive: every lookup goes through [`RoomName::new`],
//! which trims and lowercases, so `"ABC"` and `" abc "` address one room.

use std::fmt;

use serde::Serialize;

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("room name must be 2-16 characters")]
    Length,
    #[error("room name may only contain a-z, 0-9 and '_'")]
    Charset,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Normalize a name used to address an existing room.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// Normalize and validate a name for a room about to be created.
    ///
    /// # Errors
    ///
    /// Returns `NameError` if the normalized name is too short, too long, or
    /// contains anything outside `[a-z0-9_]`.
    pub fn parse_new(raw: &str) -> Result<Self, NameError> {
        let name = Self::new(raw);
        let len = name.0.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(NameError::Length);
        }
        if !name
            .0
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(NameError::Charset);
        }
        Ok(name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_case_insensitive_and_trimmed() {
        assert_eq!(RoomName::new("  AbC "), RoomName::new("abc"));
        assert_eq!(RoomName::new("ABC").as_str(), "abc");
    }

    #[test]
    fn parse_new_accepts_lowercased_valid_names() {
        assert_eq!(RoomName::parse_new("My_Room1").unwrap().as_str(), "my_room1");
        assert!(RoomName::parse_new("ab").is_ok());
        assert!(RoomName::parse_new("abcdefghijklmnop").is_ok());
    }

    #[test]
    fn parse_new_rejects_bad_length() {
        assert_eq!(RoomName::parse_new("a"), Err(NameError::Length));
        assert_eq!(RoomName::parse_new("abcdefghijklmnopq"), Err(NameError::Length));
        assert_eq!(RoomName::parse_new("   "), Err(NameError::Length));
    }

    #[test]
    fn parse_new_rejects_bad_characters() {
        assert_eq!(RoomName::parse_new("my room"), Err(NameError::Charset));
        assert_eq!(RoomName::parse_new("room-1"), Err(NameError::Charset));
        assert_eq!(RoomName::parse_new("café"), Err(NameError::Charset));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomName::new("Abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
