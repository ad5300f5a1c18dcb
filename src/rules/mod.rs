//! Signature rules
//!
//! Rule sources are small TOML documents keyed by namespace. They compile into
//! an immutable [`RuleSet`] that the scanner matches file contents against.
//! The process-wide "current" set lives in a [`RuleStore`] and is replaced
//! wholesale on reload, never edited in place.

pub mod compiler;
pub mod error;
pub mod loader;
pub mod source;
pub mod store;

pub use compiler::{RuleMatch, RuleSet, RuleSummary};
pub use error::{RuleError, RuleResult};
pub use loader::{load_rule_set, RuleLocation};
pub use store::RuleStore;
