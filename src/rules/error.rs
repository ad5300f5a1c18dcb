//! Rule Error Types

/// Errors raised while loading or compiling rule sources
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Source text is not a valid rule document (bad TOML, unknown keys,
    /// negative weights, unsupported `format`)
    #[error("Rule source '{namespace}' is not valid: {message}")]
    Syntax { namespace: String, message: String },

    #[error("Rule '{namespace}/{rule}': {message}")]
    InvalidRule {
        namespace: String,
        rule: String,
        message: String,
    },

    #[error("Rule namespace '{namespace}' is defined more than once ({message})")]
    DuplicateNamespace { namespace: String, message: String },

    #[error("Cannot read rules from {path}: {message}")]
    Io { path: String, message: String },

    #[error("Rule bundle {path} is unusable: {message}")]
    Bundle { path: String, message: String },
}

impl RuleError {
    pub(crate) fn duplicate(namespace: &str, origin: &str) -> Self {
        RuleError::DuplicateNamespace {
            namespace: namespace.to_string(),
            message: format!("namespace '{}' appears again in {}", namespace, origin),
        }
    }
}

impl crate::core::error_handling::ContextualError for RuleError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, RuleError::Io { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            RuleError::Syntax { message, .. }
            | RuleError::InvalidRule { message, .. }
            | RuleError::DuplicateNamespace { message, .. }
            | RuleError::Bundle { message, .. } => Some(message),
            RuleError::Io { .. } => None,
        }
    }
}

pub type RuleResult<T> = Result<T, RuleError>;
