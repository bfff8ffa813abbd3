use crate::GenerationError;

/// Marker some backends embed in otherwise string-typed output to signal
/// that the call failed after their own retries.
pub const ERROR_SENTINEL: &str = "error_status_900";

/// Reject generator output that cannot be used as content.
///
/// Text containing [`ERROR_SENTINEL`] becomes [`GenerationError::Sentinel`];
/// blank text becomes [`GenerationError::EmptyResponse`]. Anything else is
/// returned unchanged.
pub fn check_output(text: String) -> Result<String, GenerationError> {
    if text.contains(ERROR_SENTINEL) {
        return Err(GenerationError::Sentinel(text));
    }
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}
