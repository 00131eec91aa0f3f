//! Type-safe wrapper for table names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type-safe wrapper for table names.
///
/// Table names are case-insensitive and normalized to lowercase internally.
/// Because the name is interpolated into generated SQL, it must be a plain
/// identifier: leading letter or underscore, then letters, digits, or
/// underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName(String);

/// Error type for TableName validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNameValidationError(pub String);

impl fmt::Display for TableNameValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TableNameValidationError {}

impl TableName {
    /// Creates a new TableName from a string.
    ///
    /// # Panics
    /// Panics if the name is not a valid identifier. Use `try_new()` for
    /// fallible creation.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self::try_new(name).expect("TableName is not a valid identifier")
    }

    /// Creates a new TableName, returning an error if validation fails.
    pub fn try_new(name: impl Into<String>) -> Result<Self, TableNameValidationError> {
        let name = name.into().to_lowercase();
        Self::validate_name(&name)?;
        Ok(Self(name))
    }

    fn validate_name(name: &str) -> Result<(), TableNameValidationError> {
        let mut chars = name.chars();
        match chars.next() {
            None => {
                return Err(TableNameValidationError(
                    "Table name cannot be empty".to_string(),
                ))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            Some(c) => {
                return Err(TableNameValidationError(format!(
                    "Table name cannot start with '{}'",
                    c
                )))
            }
        }
        if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
            return Err(TableNameValidationError(format!(
                "Table name cannot contain '{}'",
                c
            )));
        }
        Ok(())
    }

    /// Returns the table name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner String.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TableName {
    /// # Panics
    /// Panics if the string is not a valid identifier.
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TableName {
    /// # Panics
    /// Panics if the string is not a valid identifier.
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
