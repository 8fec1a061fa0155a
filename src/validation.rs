//! Input validation for player payloads, save-slot names and seed files.

use std::collections::HashSet;

/// Validation errors with messages fit to show the player
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Slot name is empty")]
    EmptySlotName,

    #[error("Slot name is too long (maximum {max} characters)")]
    SlotNameTooLong { max: usize },

    #[error("Slot name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Slot name is reserved")]
    Reserved,

    #[error("Content exceeds limit ({limit} bytes)")]
    ContentTooLong { limit: usize },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

pub const MAX_SLOT_NAME_LEN: usize = 32;

fn reserved_slot_names() -> HashSet<&'static str> {
    ["con", "prn", "aux", "nul", "slots", "meta", ".", ".."]
        .iter()
        .copied()
        .collect()
}

/// Validate a save-slot name. Returns the lowercased name used as the key.
pub fn validate_slot_name(name: &str) -> Result<String, InputError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptySlotName);
    }
    if trimmed.chars().count() > MAX_SLOT_NAME_LEN {
        return Err(InputError::SlotNameTooLong { max: MAX_SLOT_NAME_LEN });
    }

    // Only allow alphanumeric, underscore, and hyphen
    let invalid: HashSet<char> = trimmed
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        .collect();
    if !invalid.is_empty() {
        let mut chars: Vec<char> = invalid.into_iter().collect();
        chars.sort_unstable();
        return Err(InputError::InvalidCharacters {
            chars: chars.into_iter().collect(),
        });
    }

    let lower = trimmed.to_lowercase();
    if reserved_slot_names().contains(lower.as_str()) {
        return Err(InputError::Reserved);
    }
    Ok(lower)
}

/// Prepare a raw player line for evaluation.
///
/// Control characters become spaces (so `a\tb` is still two words) and the
/// result is cut to `max_bytes` on a char boundary. Returns the payload and
/// whether it was truncated.
pub fn sanitize_payload(content: &str, max_bytes: usize) -> (String, bool) {
    let cleaned: String = content
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if cleaned.len() <= max_bytes {
        return (cleaned, false);
    }
    let mut end = max_bytes;
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    (cleaned[..end].to_string(), true)
}

/// Securely parse JSON with size limits and error handling
pub fn secure_json_parse<T>(content: &str, max_bytes: usize) -> Result<T, InputError>
where
    T: serde::de::DeserializeOwned,
{
    if content.len() > max_bytes {
        return Err(InputError::ContentTooLong { limit: max_bytes });
    }

    // Valid JSON cannot start with a NUL byte; strip any left by an interrupted write.
    let normalized = content.trim_start_matches('\0');

    serde_json::from_str(normalized).map_err(|e| InputError::InvalidFormat(e.to_string()))
}
