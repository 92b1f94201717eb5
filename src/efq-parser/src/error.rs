//! Error types for the efq fragment parsers

use std::fmt;

/// Errors that can occur while parsing one DSL fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Wrong shape: missing delimiter, wrong arity, empty segment
    Malformed {
        /// DSL key the fragment was passed under
        key: &'static str,
        /// The offending fragment
        fragment: String,
        /// What was wrong with it
        reason: String,
    },

    /// Operator segment of a `field` fragment is not recognised
    UnknownOperator {
        /// The offending fragment
        fragment: String,
        /// The operator text
        operator: String,
    },

    /// Integer segment that does not parse
    InvalidNumber {
        /// DSL key the fragment was passed under
        key: &'static str,
        /// The offending text
        value: String,
    },

    /// Sort direction other than ASC/DESC
    InvalidDirection {
        /// The offending sort entry
        fragment: String,
    },

    /// Pager mode other than default/simple/restricted-N (N odd)
    InvalidPagerMode {
        /// The mode text
        mode: String,
    },

    /// Date-family fragment that fails calendar validation
    InvalidDate {
        /// DSL key the fragment was passed under
        key: &'static str,
        /// The offending fragment
        value: String,
    },

    /// A storage or month date format with unknown specifiers
    InvalidDateFormat {
        /// The format string
        format: String,
    },

    /// Empty input
    EmptyInput {
        /// DSL key the empty value was passed under
        key: &'static str,
    },
}

impl ParseError {
    pub(crate) fn malformed(key: &'static str, fragment: &str, reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            key,
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_date(key: &'static str, value: &str) -> Self {
        ParseError::InvalidDate {
            key,
            value: value.to_string(),
        }
    }

    /// Whether this is a date validation failure, which callers may recover
    /// from instead of rejecting the request
    pub fn is_invalid_date(&self) -> bool {
        matches!(self, ParseError::InvalidDate { .. })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Malformed {
                key,
                fragment,
                reason,
            } => write!(f, "Malformed '{}' fragment '{}': {}", key, fragment, reason),
            ParseError::UnknownOperator { fragment, operator } => {
                write!(f, "Unknown operator '{}' in '{}'", operator, fragment)
            }
            ParseError::InvalidNumber { key, value } => {
                write!(f, "Invalid number '{}' in '{}' fragment", value, key)
            }
            ParseError::InvalidDirection { fragment } => {
                write!(f, "Invalid sort direction in '{}', expected ASC or DESC", fragment)
            }
            ParseError::InvalidPagerMode { mode } => write!(
                f,
                "Invalid pager mode '{}', expected default, simple or restricted-N with N odd",
                mode
            ),
            ParseError::InvalidDate { key, value } => {
                write!(f, "Invalid date in '{}' fragment '{}'", key, value)
            }
            ParseError::InvalidDateFormat { format } => {
                write!(f, "Invalid date format '{}'", format)
            }
            ParseError::EmptyInput { key } => write!(f, "Empty value for '{}'", key),
        }
    }
}

impl std::error::Error for ParseError {}

/// Result type for parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;
