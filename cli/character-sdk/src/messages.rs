//! User facing texts of controller error states.

use crate::providers::repository::FetchError;

/// Fallback for list errors without a specific text
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";
/// Fallback for detail errors without a specific text
pub const DETAILS_UNAVAILABLE: &str = "Unable to load details.";

/// Map a fetch error to the message shown in an error state.
///
/// Transport errors carry their own text, everything else uses `fallback`.
pub fn readable_message(error: &FetchError, fallback: &str) -> String {
    match error {
        FetchError::Api(api_error) => api_error.user_message(),
        _ => fallback.to_string(),
    }
}
