//! Category rules and first-match-wins classification.
//!
//! Categories come from configuration as an ordered list of [`CategorySpec`]s.
//! [`RuleSet::compile`] validates them into [`CategoryRule`]s, which are
//! tried in declaration order; the first rule with a matching predicate
//! claims the event. Events no rule claims are [`UNCATEGORIZED`].

use std::collections::HashSet;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Event;

/// Reserved name of the bucket for events that match no rule.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Errors raised while compiling category configuration.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A category had an empty or whitespace-only name.
    #[error("category #{position} has an empty name")]
    EmptyName { position: usize },

    /// A category used the reserved uncategorized name.
    #[error("category name \"{name}\" is reserved")]
    ReservedName { name: String },

    /// Two categories share a name.
    #[error("category \"{name}\" is defined more than once")]
    DuplicateName { name: String },

    /// A category had no matchers, so it could never match.
    #[error("category \"{category}\" has no matchers")]
    NoMatchers { category: String },

    /// A matcher set none or several of `contains`, `equals`, `regex`.
    #[error(
        "matcher #{position} of category \"{category}\" must set exactly one of \
         `contains`, `equals` or `regex`"
    )]
    AmbiguousMatcher { category: String, position: usize },

    /// A matcher pattern was empty and would match everything.
    #[error("matcher #{position} of category \"{category}\" has an empty pattern")]
    EmptyPattern { category: String, position: usize },

    /// A regex pattern failed to compile.
    #[error("invalid regex in category \"{category}\": {source}")]
    InvalidRegex {
        category: String,
        #[source]
        source: regex::Error,
    },
}

/// Which text of an event a matcher looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    #[default]
    Summary,
    Description,
    /// Summary or description.
    Any,
}

impl Field {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Any => "any",
        }
    }
}

/// A matcher as written in configuration.
///
/// Exactly one of `contains`, `equals` and `regex` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatcherSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default)]
    pub field: Field,
    #[serde(default)]
    pub ignore_case: bool,
}

impl MatcherSpec {
    /// A case-sensitive substring matcher on the summary.
    pub fn contains(needle: impl Into<String>) -> Self {
        Self {
            contains: Some(needle.into()),
            ..Self::default()
        }
    }

    /// A case-sensitive regex matcher on the summary.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            regex: Some(pattern.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn on(mut self, field: Field) -> Self {
        self.field = field;
        self
    }

    #[must_use]
    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

/// A category as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySpec {
    pub name: String,
    /// The category matches if any of these match.
    #[serde(rename = "match")]
    pub matchers: Vec<MatcherSpec>,
}

impl CategorySpec {
    pub fn new(name: impl Into<String>, matchers: Vec<MatcherSpec>) -> Self {
        Self {
            name: name.into(),
            matchers,
        }
    }
}

/// A compiled text predicate.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Substring test. With `ignore_case` the needle is stored lower-cased.
    Contains { needle: String, ignore_case: bool },
    /// Whole-text equality. With `ignore_case` the text is stored lower-cased.
    Equals { text: String, ignore_case: bool },
    /// Regex search. `ignore_case` is already compiled into `re`.
    Regex { re: Regex, ignore_case: bool },
}

impl Pattern {
    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            Self::Contains {
                needle,
                ignore_case: false,
            } => haystack.contains(needle.as_str()),
            Self::Contains {
                needle,
                ignore_case: true,
            } => haystack.to_lowercase().contains(needle.as_str()),
            Self::Equals {
                text,
                ignore_case: false,
            } => haystack == text,
            Self::Equals {
                text,
                ignore_case: true,
            } => haystack.to_lowercase() == *text,
            Self::Regex { re, .. } => re.is_match(haystack),
        }
    }
}

/// A pattern bound to the event field it inspects.
#[derive(Debug, Clone)]
pub struct Matcher {
    pub field: Field,
    pub pattern: Pattern,
}

impl Matcher {
    pub fn matches(&self, event: &Event) -> bool {
        match self.field {
            Field::Summary => self.pattern.is_match(&event.summary),
            Field::Description => self.pattern.is_match(&event.description),
            Field::Any => {
                self.pattern.is_match(&event.summary) || self.pattern.is_match(&event.description)
            }
        }
    }

    fn compile(spec: &MatcherSpec, category: &str, position: usize) -> Result<Self, RuleError> {
        let pattern = match (&spec.contains, &spec.equals, &spec.regex) {
            (Some(needle), None, None) => Pattern::Contains {
                needle: fold_case(non_empty(needle, category, position)?, spec.ignore_case),
                ignore_case: spec.ignore_case,
            },
            (None, Some(text), None) => Pattern::Equals {
                text: fold_case(non_empty(text, category, position)?, spec.ignore_case),
                ignore_case: spec.ignore_case,
            },
            (None, None, Some(source)) => {
                let re = RegexBuilder::new(non_empty(source, category, position)?)
                    .case_insensitive(spec.ignore_case)
                    .build()
                    .map_err(|source| RuleError::InvalidRegex {
                        category: category.to_string(),
                        source,
                    })?;
                Pattern::Regex {
                    re,
                    ignore_case: spec.ignore_case,
                }
            }
            _ => {
                return Err(RuleError::AmbiguousMatcher {
                    category: category.to_string(),
                    position,
                });
            }
        };
        Ok(Self {
            field: spec.field,
            pattern,
        })
    }
}

fn non_empty<'a>(value: &'a str, category: &str, position: usize) -> Result<&'a str, RuleError> {
    if value.is_empty() {
        return Err(RuleError::EmptyPattern {
            category: category.to_string(),
            position,
        });
    }
    Ok(value)
}

fn fold_case(value: &str, ignore_case: bool) -> String {
    if ignore_case {
        value.to_lowercase()
    } else {
        value.to_string()
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field.as_str();
        let ignore_case = match &self.pattern {
            Pattern::Contains { needle, ignore_case } => {
                write!(f, "{field} contains {needle:?}")?;
                *ignore_case
            }
            Pattern::Equals { text, ignore_case } => {
                write!(f, "{field} equals {text:?}")?;
                *ignore_case
            }
            Pattern::Regex { re, ignore_case } => {
                write!(f, "{field} matches /{}/", re.as_str())?;
                *ignore_case
            }
        };
        if ignore_case {
            f.write_str(" (ignore case)")?;
        }
        Ok(())
    }
}

/// A named category with its predicates.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    name: String,
    matchers: Vec<Matcher>,
}

impl CategoryRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.matchers.iter().any(|m| m.matches(event))
    }
}

/// Ordered category rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CategoryRule>,
}

impl RuleSet {
    /// Validates and compiles categories, preserving declaration order.
    pub fn compile(specs: &[CategorySpec]) -> Result<Self, RuleError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());

        for (idx, spec) in specs.iter().enumerate() {
            let name = spec.name.trim();
            if name.is_empty() {
                return Err(RuleError::EmptyName { position: idx + 1 });
            }
            if name == UNCATEGORIZED {
                return Err(RuleError::ReservedName {
                    name: name.to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(RuleError::DuplicateName {
                    name: name.to_string(),
                });
            }
            if spec.matchers.is_empty() {
                return Err(RuleError::NoMatchers {
                    category: name.to_string(),
                });
            }

            let matchers = spec
                .matchers
                .iter()
                .enumerate()
                .map(|(pos, m)| Matcher::compile(m, name, pos + 1))
                .collect::<Result<Vec<_>, _>>()?;

            rules.push(CategoryRule {
                name: name.to_string(),
                matchers,
            });
        }

        tracing::debug!(categories = rules.len(), "compiled category rules");
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Name of the first rule matching the event, or [`UNCATEGORIZED`].
    ///
    /// Evaluation stops at the first match, so later rules never see events
    /// an earlier rule has claimed.
    pub fn classify(&self, event: &Event) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matches(event))
            .map_or(UNCATEGORIZED, CategoryRule::name)
    }

    /// Category names in report order: declaration order, then
    /// [`UNCATEGORIZED`].
    pub fn report_order(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .map(CategoryRule::name)
            .chain(std::iter::once(UNCATEGORIZED))
    }
}
