//! Type-safe wrapper for tenant identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest when deriving a
/// storage location from a tenant id.
const STORAGE_HASH_LEN: usize = 16;

/// Type-safe wrapper for tenant identifiers.
///
/// The id is an opaque string minted by an external identity layer; FlatLake
/// only requires that it is non-empty and safe to hash into a storage path.
/// Ensures tenant ids cannot be accidentally used where table names are
/// expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

/// Error type for TenantId validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantIdValidationError(pub String);

impl fmt::Display for TenantIdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TenantIdValidationError {}

impl TenantId {
    /// Creates a new TenantId from a string.
    ///
    /// # Panics
    /// Panics if the id fails validation. Use `try_new()` for fallible creation.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self::try_new(id).expect("TenantId contains invalid characters")
    }

    /// Creates a new TenantId, returning an error if validation fails.
    ///
    /// Even though persistent locations are derived from a one-way hash and
    /// never embed the raw id, ids that smell like path traversal are
    /// rejected outright so a hostile identity string can never reach the
    /// storage layer.
    pub fn try_new(id: impl Into<String>) -> Result<Self, TenantIdValidationError> {
        let id = id.into();
        Self::validate_id(&id)?;
        Ok(Self(id))
    }

    fn validate_id(id: &str) -> Result<(), TenantIdValidationError> {
        if id.is_empty() {
            return Err(TenantIdValidationError(
                "Tenant ID cannot be empty".to_string(),
            ));
        }
        if id.contains("..") {
            return Err(TenantIdValidationError(
                "Tenant ID cannot contain '..' (path traversal)".to_string(),
            ));
        }
        if id.contains('/') || id.contains('\\') {
            return Err(TenantIdValidationError(
                "Tenant ID cannot contain directory separators".to_string(),
            ));
        }
        if id.contains('\0') {
            return Err(TenantIdValidationError(
                "Tenant ID cannot contain null bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the tenant id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner String.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Deterministic, irreversible storage segment for this tenant.
    ///
    /// First 16 hex characters of SHA-256 over the raw id. Restarting the
    /// process re-derives the same segment from the id alone, so persistent
    /// mode needs no registry file.
    pub fn storage_hash(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut hex = String::with_capacity(STORAGE_HASH_LEN);
        for byte in digest.iter().take(STORAGE_HASH_LEN / 2) {
            hex.push_str(&format!("{:02x}", byte));
        }
        hex
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    /// # Panics
    /// Panics if the string fails validation.
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl From<String> for TenantId {
    /// # Panics
    /// Panics if the string fails validation.
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tenant_id() {
        let tenant = TenantId::try_new("org_4412");
        assert!(tenant.is_ok());
        assert_eq!(tenant.unwrap().as_str(), "org_4412");
    }

    #[test]
    fn test_path_traversal_blocked() {
        assert!(TenantId::try_new("../../../etc/passwd").is_err());
        assert!(TenantId::try_new("a/b").is_err());
        assert!(TenantId::try_new("a\\b").is_err());
        assert!(TenantId::try_new("a\0b").is_err());
        assert!(TenantId::try_new("").is_err());
    }

    #[test]
    fn test_storage_hash_is_stable() {
        let a = TenantId::new("tenant-a");
        assert_eq!(a.storage_hash(), a.storage_hash());
        assert_eq!(a.storage_hash().len(), 16);
        assert!(a.storage_hash().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_storage_hash_differs_per_tenant() {
        let a = TenantId::new("tenant-a");
        let b = TenantId::new("tenant-b");
        assert_ne!(a.storage_hash(), b.storage_hash());
    }

    #[test]
    #[should_panic(expected = "invalid characters")]
    fn test_new_panics_on_invalid() {
        let _ = TenantId::new("../evil");
    }
}
