//! Rule source documents
//!
//! ```toml
//! format = 1
//!
//! [[rule]]
//! name = "suspicious_eval"
//! weight = 3
//! filetypes = ["*.py"]
//! condition = "any"
//! nocase = false
//! strings = ["eval(", "exec("]
//! regex = ['base64\.b64decode\(']
//! ```

use serde::{Deserialize, Serialize};

use crate::core::version::rule_format_version;
use crate::rules::error::{RuleError, RuleResult};

/// How the patterns of one rule combine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// At least one pattern matches
    #[default]
    Any,
    /// Every pattern matches somewhere in the content
    All,
}

/// One parsed rule source (a namespace)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSource {
    #[serde(default)]
    pub format: Option<i64>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleDefinition>,
}

/// A single `[[rule]]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub filetypes: Vec<String>,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub nocase: bool,
    #[serde(default)]
    pub strings: Vec<String>,
    #[serde(default)]
    pub regex: Vec<String>,
}

fn default_weight() -> u32 {
    1
}

impl RuleSource {
    /// Parse source text for `namespace`
    pub fn parse(namespace: &str, text: &str) -> RuleResult<Self> {
        let source: RuleSource = toml::from_str(text).map_err(|e| RuleError::Syntax {
            namespace: namespace.to_string(),
            message: format!("{}: {}", namespace, e.message()),
        })?;

        let supported = rule_format_version();
        if let Some(found) = source.format {
            if found < 1 || found > i64::from(supported) {
                return Err(RuleError::Syntax {
                    namespace: namespace.to_string(),
                    message: format!(
                        "{}: format {} is not supported (this build reads up to {})",
                        namespace, found, supported
                    ),
                });
            }
        }

        Ok(source)
    }
}
