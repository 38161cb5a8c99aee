//! Identity resolution for saved-items owners.
//!
//! Callers hand over an opaque owner reference without knowing whether it is
//! a native account id or the external auth provider's id. One resolver owns
//! the fallback logic so every surface resolves identically.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::errors::Result;
use crate::saved_items::model::{OwnerIdentity, ResolvedIdentity};

/// Account row as the directory sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub native_id: String,
    pub external_auth_id: String,
}

/// Lookup seam over account persistence. Read-only.
///
/// `Ok(None)` means "no such account" — an expected miss, never an error.
/// Only transport faults return `Err`.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_native_id(&self, native_id: &str) -> Result<Option<AccountRef>>;
    async fn find_by_external_auth_id(&self, external_auth_id: &str) -> Result<Option<AccountRef>>;
}

/// Returns true when `input` has the strict UUID shape used for native ids.
///
/// Anything else (auth-provider subjects, session handles) skips the native
/// lookup and goes straight to the external-auth lookup.
pub fn is_native_id_shape(input: &str) -> bool {
    let bytes = input.trim().as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (idx, byte) in bytes.iter().enumerate() {
        match idx {
            8 | 13 | 18 | 23 => {
                if *byte != b'-' {
                    return false;
                }
            }
            _ => {
                if !byte.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

/// Maps an opaque owner reference to a concrete account identity.
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn AccountDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve `owner_ref` to an account identity, or `Unresolved`.
    ///
    /// Native-id lookup is attempted first when the string has the native-id
    /// shape; otherwise, or on a native miss, the external-auth lookup runs.
    /// First hit wins. Both missing is `Unresolved`, which callers handle by
    /// switching to local-only mode.
    pub async fn resolve(&self, owner_ref: &str) -> Result<ResolvedIdentity> {
        let owner_ref = owner_ref.trim();
        if owner_ref.is_empty() {
            return Ok(ResolvedIdentity::Unresolved);
        }

        if is_native_id_shape(owner_ref) {
            if let Some(account) = self.directory.find_by_native_id(owner_ref).await? {
                return Ok(ResolvedIdentity::Resolved(OwnerIdentity::remote(
                    account.native_id,
                    account.external_auth_id,
                )));
            }
        }

        if let Some(account) = self.directory.find_by_external_auth_id(owner_ref).await? {
            return Ok(ResolvedIdentity::Resolved(OwnerIdentity::remote(
                account.native_id,
                account.external_auth_id,
            )));
        }

        debug!("Owner reference '{}' did not resolve; using local-only mode", owner_ref);
        Ok(ResolvedIdentity::Unresolved)
    }
}
