//! Generic error handling utilities
//!
//! Unified reporting for the crate's domain errors (scan, rule and
//! configuration failures) while keeping each domain's own error type.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// Generic reporting uses this to decide whether an error should be shown
/// verbatim or replaced by a short description of the failed operation.
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a message the user can act on
    ///
    /// User-actionable examples:
    /// - an invalid rule source
    /// - an artifact rejected for exceeding the configured byte limit
    /// - an unknown configuration key
    ///
    /// System examples:
    /// - IO failures
    /// - a blocking task that panicked
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// # Examples
/// ```rust,no_run
/// # use distscan::core::error_handling::log_error_with_context;
/// # use distscan::scanner::error::ScanError;
/// let err = ScanError::Cancelled { artifact: "demo-1.0.tar.gz".to_string() };
/// log_error_with_context(&err, "Package scan");
/// // Logs: "FATAL: Package scan" with the detail at debug level
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::error!("FATAL: {}: {}", operation_context, user_msg);
        }
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
