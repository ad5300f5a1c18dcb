//! Rule compilation and matching

use std::collections::{BTreeMap, HashSet};

use regex::{RegexSet, RegexSetBuilder};
use serde::Serialize;

use crate::rules::error::{RuleError, RuleResult};
use crate::rules::source::{Condition, RuleDefinition, RuleSource};

/// Upper bound on the compiled size of one rule's pattern set
const REGEX_SIZE_LIMIT: usize = 16 * (1 << 20);

/// A rule that fired against some content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub namespace: String,
    pub rule: String,
    pub weight: u32,
    /// Suffix patterns such as `*.py`; `None` means the rule applies to any file
    pub filetypes: Option<Vec<String>>,
}

impl RuleMatch {
    /// Whether this match counts for the file at `path`.
    ///
    /// A leading `*` in a filter entry is ignored and comparison is ASCII
    /// case-insensitive, so `*.py` accepts `pkg/setup.PY`.
    pub fn applies_to(&self, path: &str) -> bool {
        let Some(filetypes) = &self.filetypes else {
            return true;
        };
        let path = path.to_ascii_lowercase();
        filetypes
            .iter()
            .any(|pattern| path.ends_with(&pattern.trim_start_matches('*').to_ascii_lowercase()))
    }
}

/// Listing view of a compiled rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub namespace: String,
    pub rule: String,
    pub weight: u32,
    pub filetypes: Option<Vec<String>>,
    pub condition: Condition,
    pub patterns: usize,
}

#[derive(Debug)]
struct CompiledRule {
    namespace: String,
    name: String,
    weight: u32,
    filetypes: Option<Vec<String>>,
    condition: Condition,
    patterns: RegexSet,
}

impl CompiledRule {
    fn is_match(&self, content: &str) -> bool {
        match self.condition {
            Condition::Any => self.patterns.is_match(content),
            Condition::All => self.patterns.matches(content).matched_all(),
        }
    }

    fn to_match(&self) -> RuleMatch {
        RuleMatch {
            namespace: self.namespace.clone(),
            rule: self.name.clone(),
            weight: self.weight,
            filetypes: self.filetypes.clone(),
        }
    }
}

/// Immutable compiled rule set
///
/// Rules are evaluated namespace by namespace in sorted order, and in
/// declaration order within a namespace, so match output is deterministic.
#[derive(Debug)]
pub struct RuleSet {
    version: String,
    namespaces: Vec<String>,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// A set that matches nothing
    pub fn empty() -> Self {
        Self {
            version: "empty".to_string(),
            namespaces: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Compile `namespace -> source text` pairs into a rule set.
    ///
    /// Namespaces must be unique. `version` identifies the rule revision in
    /// reports (a commit id or content digest).
    pub fn compile<I, K, V>(sources: I, version: impl Into<String>) -> RuleResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut by_namespace: BTreeMap<String, RuleSource> = BTreeMap::new();
        for (namespace, text) in sources {
            let namespace = namespace.into();
            if namespace.trim().is_empty() {
                return Err(RuleError::Syntax {
                    namespace,
                    message: "rule namespace cannot be empty".to_string(),
                });
            }
            if by_namespace.contains_key(&namespace) {
                return Err(RuleError::duplicate(&namespace, "the source list"));
            }
            let parsed = RuleSource::parse(&namespace, text.as_ref())?;
            by_namespace.insert(namespace, parsed);
        }

        let mut rules = Vec::new();
        for (namespace, source) in &by_namespace {
            let mut seen = HashSet::new();
            for definition in &source.rules {
                if !seen.insert(definition.name.as_str()) {
                    return Err(invalid(namespace, &definition.name, "duplicate rule name"));
                }
                rules.push(compile_rule(namespace, definition)?);
            }
        }

        let set = Self {
            version: version.into(),
            namespaces: by_namespace.into_keys().collect(),
            rules,
        };
        log::debug!(
            "Compiled {} rules in {} namespaces (version {})",
            set.rules.len(),
            set.namespaces.len(),
            set.version
        );
        Ok(set)
    }

    /// Every rule that fires on `content`
    pub fn matches(&self, content: &str) -> Vec<RuleMatch> {
        self.rules
            .iter()
            .filter(|rule| rule.is_match(content))
            .map(CompiledRule::to_match)
            .collect()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn summaries(&self) -> Vec<RuleSummary> {
        self.rules
            .iter()
            .map(|rule| RuleSummary {
                namespace: rule.namespace.clone(),
                rule: rule.name.clone(),
                weight: rule.weight,
                filetypes: rule.filetypes.clone(),
                condition: rule.condition,
                patterns: rule.patterns.len(),
            })
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::empty()
    }
}

fn invalid(namespace: &str, rule: &str, message: impl Into<String>) -> RuleError {
    RuleError::InvalidRule {
        namespace: namespace.to_string(),
        rule: rule.to_string(),
        message: message.into(),
    }
}

fn compile_rule(namespace: &str, definition: &RuleDefinition) -> RuleResult<CompiledRule> {
    let name = definition.name.trim();
    if name.is_empty() {
        return Err(invalid(namespace, "<unnamed>", "rule name cannot be empty"));
    }
    if definition.strings.is_empty() && definition.regex.is_empty() {
        return Err(invalid(namespace, name, "rule has no strings or regex patterns"));
    }
    if definition
        .strings
        .iter()
        .chain(&definition.regex)
        .any(|p| p.is_empty())
    {
        return Err(invalid(namespace, name, "empty pattern would match everything"));
    }

    let filetypes: Vec<String> = definition
        .filetypes
        .iter()
        .map(|f| f.trim().to_string())
        .collect();
    if filetypes.iter().any(|f| f.trim_start_matches('*').is_empty()) {
        return Err(invalid(namespace, name, "file type filter entries need a suffix"));
    }

    let patterns: Vec<String> = definition
        .strings
        .iter()
        .map(|literal| regex::escape(literal))
        .chain(definition.regex.iter().cloned())
        .collect();

    let compiled = RegexSetBuilder::new(&patterns)
        .case_insensitive(definition.nocase)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| invalid(namespace, name, e.to_string()))?;

    Ok(CompiledRule {
        namespace: namespace.to_string(),
        name: name.to_string(),
        weight: definition.weight,
        filetypes: (!filetypes.is_empty()).then_some(filetypes),
        condition: definition.condition,
        patterns: compiled,
    })
}
