//! Generic error handling utilities
//!
//! Provides unified error reporting across the crate's error types while
//! keeping configuration mistakes (which a caller can fix) apart from host
//! and runtime failures.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; when it returns `false`, `user_message()` returns `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a message the caller can act on directly
    ///
    /// Examples: empty container list, malformed host URL, blank data layer name.
    /// Counter-examples: a script host refusing an element, a failed write to stdout.
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// User-actionable errors log their own message; system errors log the
/// operation context. Full detail is always emitted at debug level.
///
/// # Examples
/// ```rust,no_run
/// # use gtm_client::core::error_handling::log_error_with_context;
/// # use gtm_client::client::ConfigError;
/// let err = ConfigError::NoContainers;
/// log_error_with_context(&err, "Client construction");
/// // Logs: "FATAL: at least one container must be configured"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    if error.is_user_actionable() {
        if let Some(user_msg) = error.user_message() {
            log::error!("FATAL: {}", user_msg);
        } else {
            log::error!("FATAL: {}", operation_context);
        }
    } else {
        log::error!("FATAL: {}", operation_context);
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
