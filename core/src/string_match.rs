//! String matching: runtime [`StringMatcher`] and config-level [`StringMatchSpec`]
//!
//! `StringMatcher` is a [`Filter`] over strings, so it plugs straight into a
//! [`FilterMap`](crate::FilterMap) entry or a keyed [`Condition`](crate::Condition).
//!
//! # Naming: Spec vs Matcher
//!
//! - [`StringMatchSpec`] = what the user wrote in configuration
//! - [`StringMatcher`] = what evaluates at run time

use crate::{ConfigError, Filter, MAX_PATTERN_LENGTH, MAX_REGEX_PATTERN_LENGTH};
use std::fmt;

/// Unified string matcher with optional ASCII case-insensitivity.
///
/// # Example
///
/// ```
/// use chainer::{Filter, StringMatcher};
///
/// let matcher = StringMatcher::prefix("/API/", true);
/// assert!(matcher.accepts("/api/users"));
///
/// let matcher = StringMatcher::regex(r"^user-\d+$").unwrap();
/// assert!(matcher.accepts("user-123"));
/// assert!(!matcher.accepts("user-abc"));
/// ```
#[derive(Debug, Clone)]
pub enum StringMatcher {
    /// Exact string equality.
    Exact { value: String, ignore_case: bool },
    /// String prefix match.
    Prefix { value: String, ignore_case: bool },
    /// String suffix match.
    Suffix { value: String, ignore_case: bool },
    /// Substring contains match.
    Contains { value: String, ignore_case: bool },
    /// Regular expression match (linear time).
    Regex(regex::Regex),
}

impl StringMatcher {
    /// Create an exact match.
    #[must_use]
    pub fn exact(value: impl Into<String>, ignore_case: bool) -> Self {
        Self::Exact {
            value: value.into(),
            ignore_case,
        }
    }

    /// Create a prefix match.
    #[must_use]
    pub fn prefix(value: impl Into<String>, ignore_case: bool) -> Self {
        Self::Prefix {
            value: value.into(),
            ignore_case,
        }
    }

    /// Create a suffix match.
    #[must_use]
    pub fn suffix(value: impl Into<String>, ignore_case: bool) -> Self {
        Self::Suffix {
            value: value.into(),
            ignore_case,
        }
    }

    /// Create a contains match.
    ///
    /// When `ignore_case` is true, the pattern is lowercased once here.
    #[must_use]
    pub fn contains(value: impl Into<String>, ignore_case: bool) -> Self {
        let value = value.into();
        Self::Contains {
            value: if ignore_case {
                value.to_ascii_lowercase()
            } else {
                value
            },
            ignore_case,
        }
    }

    /// Create a regex match.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        regex::Regex::new(pattern).map(Self::Regex)
    }

    /// Returns `true` if `input` matches.
    #[must_use]
    pub fn is_match(&self, input: &str) -> bool {
        match self {
            Self::Exact { value, ignore_case } => {
                if *ignore_case {
                    input.eq_ignore_ascii_case(value)
                } else {
                    input == value
                }
            }
            Self::Prefix { value, ignore_case } => {
                if *ignore_case {
                    input
                        .get(..value.len())
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(value))
                } else {
                    input.starts_with(value.as_str())
                }
            }
            Self::Suffix { value, ignore_case } => {
                if *ignore_case {
                    input
                        .len()
                        .checked_sub(value.len())
                        .and_then(|start| input.get(start..))
                        .is_some_and(|suffix| suffix.eq_ignore_ascii_case(value))
                } else {
                    input.ends_with(value.as_str())
                }
            }
            Self::Contains { value, ignore_case } => {
                if *ignore_case {
                    input.to_ascii_lowercase().contains(value.as_str())
                } else {
                    input.contains(value.as_str())
                }
            }
            Self::Regex(re) => re.is_match(input),
        }
    }
}

impl Filter<str> for StringMatcher {
    fn accepts(&self, value: &str) -> bool {
        self.is_match(value)
    }
}

impl Filter<String> for StringMatcher {
    fn accepts(&self, value: &String) -> bool {
        self.is_match(value)
    }
}

impl fmt::Display for StringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, value, ignore_case) = match self {
            Self::Exact { value, ignore_case } => ("exact", value.as_str(), *ignore_case),
            Self::Prefix { value, ignore_case } => ("prefix", value.as_str(), *ignore_case),
            Self::Suffix { value, ignore_case } => ("suffix", value.as_str(), *ignore_case),
            Self::Contains { value, ignore_case } => ("contains", value.as_str(), *ignore_case),
            Self::Regex(re) => return write!(f, "regex \"{}\"", re.as_str()),
        };
        write!(f, "{kind} \"{value}\"")?;
        if ignore_case {
            f.write_str(" (ignore case)")?;
        }
        Ok(())
    }
}

/// A string match specification from user configuration.
///
/// ```
/// use chainer::{Filter, StringMatchSpec};
///
/// let matcher = StringMatchSpec::Prefix("/api".into()).compile().unwrap();
/// assert!(matcher.accepts("/api/users"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StringMatchSpec {
    /// Exact string equality.
    Exact(String),
    /// String starts with prefix.
    Prefix(String),
    /// String ends with suffix.
    Suffix(String),
    /// String contains substring.
    Contains(String),
    /// Regular expression match (`regex` crate syntax, linear time).
    Regex(String),
}

impl StringMatchSpec {
    /// Compile into a runtime [`StringMatcher`], enforcing pattern length limits.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::PatternTooLong`] if the pattern exceeds its limit
    /// - [`ConfigError::InvalidPattern`] if the regex is invalid
    pub fn compile(&self) -> Result<StringMatcher, ConfigError> {
        self.check_length()?;
        match self {
            Self::Exact(v) => Ok(StringMatcher::exact(v.as_str(), false)),
            Self::Prefix(v) => Ok(StringMatcher::prefix(v.as_str(), false)),
            Self::Suffix(v) => Ok(StringMatcher::suffix(v.as_str(), false)),
            Self::Contains(v) => Ok(StringMatcher::contains(v.as_str(), false)),
            Self::Regex(v) => StringMatcher::regex(v).map_err(|e| ConfigError::InvalidPattern {
                pattern: v.clone(),
                message: e.to_string(),
            }),
        }
    }

    fn check_length(&self) -> Result<(), ConfigError> {
        let (len, max) = match self {
            Self::Regex(p) => (p.len(), MAX_REGEX_PATTERN_LENGTH),
            Self::Exact(v) | Self::Prefix(v) | Self::Suffix(v) | Self::Contains(v) => {
                (v.len(), MAX_PATTERN_LENGTH)
            }
        };
        if len > max {
            return Err(ConfigError::PatternTooLong { len, max });
        }
        Ok(())
    }
}

impl fmt::Display for StringMatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "Exact(\"{v}\")"),
            Self::Prefix(v) => write!(f, "Prefix(\"{v}\")"),
            Self::Suffix(v) => write!(f, "Suffix(\"{v}\")"),
            Self::Contains(v) => write!(f, "Contains(\"{v}\")"),
            Self::Regex(v) => write!(f, "Regex(\"{v}\")"),
        }
    }
}
