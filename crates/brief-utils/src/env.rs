//! Environment variable helpers

/// Read an environment variable, returning `None` when it is unset or
/// blank after trimming.
///
/// API keys are frequently left as empty strings in `.env` files; callers
/// should treat those the same as missing.
pub fn env_nonempty(var: &str) -> Option<String> {
    let value = std::env::var(var).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
