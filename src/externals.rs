//! Classify module identifiers as external or bundled.
//!
//! External modules are supplied at runtime by the micro-application
//! shell (via the import map) and must never be inlined into a bundle.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::error::{Error, Result};

/// Fallible predicate over a module identifier.
pub type Predicate = Arc<dyn Fn(&str) -> anyhow::Result<bool> + Send + Sync>;

/// A single externals rule.
#[derive(Clone)]
pub enum ExternalRule {
    /// Matches iff the module identifier equals the string exactly.
    Exact(String),
    /// Matches iff the pattern matches anywhere in the identifier.
    Pattern(Regex),
    /// Matches iff the predicate returns `Ok(true)`.
    Predicate(Predicate),
}

impl ExternalRule {
    /// Exact-match rule for a module name.
    pub fn exact<S: AsRef<str>>(name: S) -> Self {
        ExternalRule::Exact(name.as_ref().into())
    }

    /// Pattern rule compiled from a regular expression source.
    pub fn pattern(source: &str) -> std::result::Result<Self, regex::Error> {
        Ok(ExternalRule::Pattern(Regex::new(source)?))
    }

    /// Predicate rule from a closure.
    pub fn predicate<F>(func: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        ExternalRule::Predicate(Arc::new(func))
    }

    fn matches(&self, module_id: &str) -> Result<bool> {
        match self {
            ExternalRule::Exact(name) => Ok(name == module_id),
            ExternalRule::Pattern(pattern) => Ok(pattern.is_match(module_id)),
            ExternalRule::Predicate(func) => {
                func(module_id).map_err(|err| Error::RuleEvaluation {
                    module_id: module_id.to_string(),
                    source: err.into(),
                })
            }
        }
    }
}

impl fmt::Debug for ExternalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalRule::Exact(name) => f.debug_tuple("Exact").field(name).finish(),
            ExternalRule::Pattern(pattern) => {
                f.debug_tuple("Pattern").field(&pattern.as_str()).finish()
            }
            ExternalRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for ExternalRule {
    fn from(name: &str) -> Self {
        ExternalRule::exact(name)
    }
}

impl From<Regex> for ExternalRule {
    fn from(pattern: Regex) -> Self {
        ExternalRule::Pattern(pattern)
    }
}

impl Serialize for ExternalRule {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ExternalRule::Exact(name) => serializer.serialize_str(name),
            ExternalRule::Pattern(pattern) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("pattern", pattern.as_str())?;
                map.end()
            }
            // Closures have no stable representation; consumers only
            // need to know a programmatic rule is present.
            ExternalRule::Predicate(_) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("predicate", &true)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ExternalRule {
    fn deserialize<D>(deserializer: D) -> std::result::Result<ExternalRule, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ExternalRuleVisitor)
    }
}

struct ExternalRuleVisitor;

impl<'de> Visitor<'de> for ExternalRuleVisitor {
    type Value = ExternalRule;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a module name or a {\"pattern\": ...} object")
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(ExternalRule::exact(value))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            if key == "pattern" {
                let source: String = map.next_value()?;
                return ExternalRule::pattern(&source).map_err(de::Error::custom);
            }
            let _ = map.next_value::<de::IgnoredAny>()?;
        }
        Err(de::Error::custom("expected a \"pattern\" key"))
    }
}

/// The built-in externals shared by every canopy micro-application.
///
/// These are provided by the shell application via the import map so
/// every bundle must reference them at runtime instead of inlining
/// its own copy.
static BUILT_IN_RULES: Lazy<Vec<ExternalRule>> = Lazy::new(|| {
    vec![
        // React ecosystem
        ExternalRule::exact("react"),
        ExternalRule::exact("react-dom"),
        ExternalRule::exact("react-dom/client"),
        ExternalRule::exact("react-dom/server"),
        ExternalRule::exact("react-hook-form"),
        ExternalRule::exact("single-spa"),
        ExternalRule::exact("single-spa-react"),
        ExternalRule::exact("single-spa-canopy"),
        // Utilities
        ExternalRule::exact("lodash"),
        ExternalRule::exact("rxjs"),
        ExternalRule::Pattern(Regex::new(r"^rxjs/?.*$").unwrap()),
        ExternalRule::exact("luxon"),
        ExternalRule::exact("moment"),
        ExternalRule::exact("prop-types"),
        // All @canopytax modules are provided via the import map
        ExternalRule::Pattern(Regex::new(r"^@canopytax/[^/]+$").unwrap()),
        // Legacy sofe loader specifiers during the transition
        ExternalRule::Pattern(Regex::new(r"^.+!sofe$").unwrap()),
        ExternalRule::predicate(|id| Ok(id.ends_with("!sofe"))),
        // Other shell-provided modules
        ExternalRule::exact("@datadog/browser-rum"),
        ExternalRule::exact("canopy-sofe-extensions"),
        ExternalRule::exact("online-listener"),
        ExternalRule::exact("sofe"),
        ExternalRule::exact("cp-analytics"),
        ExternalRule::exact("cp-client-auth"),
    ]
});

/// The built-in externals rule list.
pub fn built_in_rules() -> &'static [ExternalRule] {
    &BUILT_IN_RULES
}

/// Determine whether a module identifier matches any rule in the set.
///
/// Evaluation short-circuits at the first match; when no rule matches the
/// module is bundled. A predicate rule that fails aborts classification
/// with [Error::RuleEvaluation] rather than being treated as a non-match.
pub fn is_external(module_id: &str, rules: &[ExternalRule]) -> Result<bool> {
    for rule in rules.iter() {
        if rule.matches(module_id)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Decides which imports are externalized for one build configuration.
#[derive(Clone, Default)]
pub struct ExternalsMatcher {
    rules: Vec<ExternalRule>,
    override_predicate: Option<Predicate>,
}

impl ExternalsMatcher {
    /// Create a matcher over a rule set.
    pub fn new(rules: Vec<ExternalRule>) -> Self {
        ExternalsMatcher {
            rules,
            override_predicate: None,
        }
    }

    /// Attach a caller predicate that is consulted before the rule set.
    ///
    /// The combined decision is `predicate(id) OR rules(id)`: the
    /// predicate can add externals but can never force a module that
    /// matches the rule set back into the bundle.
    pub fn with_override<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.override_predicate = Some(Arc::new(predicate));
        self
    }

    /// The rule set in evaluation order.
    pub fn rules(&self) -> &[ExternalRule] {
        &self.rules
    }

    /// Replace the rule set wholesale, keeping any override predicate.
    pub fn set_rules(&mut self, rules: Vec<ExternalRule>) {
        self.rules = rules;
    }

    /// Classify a module identifier.
    pub fn is_external(&self, module_id: &str) -> Result<bool> {
        if let Some(predicate) = &self.override_predicate {
            let matched = predicate(module_id).map_err(|err| Error::RuleEvaluation {
                module_id: module_id.to_string(),
                source: err.into(),
            })?;
            if matched {
                return Ok(true);
            }
        }
        is_external(module_id, &self.rules)
    }
}

impl fmt::Debug for ExternalsMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalsMatcher")
            .field("rules", &self.rules)
            .field(
                "override_predicate",
                &self.override_predicate.as_ref().map(|_| ".."),
            )
            .finish()
    }
}

impl Serialize for ExternalsMatcher {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.rules.serialize(serializer)
    }
}
