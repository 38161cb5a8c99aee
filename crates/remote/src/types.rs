//! Wire types for the saved-items backend API.

use serde::{Deserialize, Serialize};
use studyshelf_core::saved_items::{AccountRef, SavedItemRecord};

/// Standard error envelope returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
}

/// Account payload from the account lookup endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub external_auth_id: String,
}

impl From<AccountResponse> for AccountRef {
    fn from(value: AccountResponse) -> Self {
        AccountRef {
            native_id: value.id,
            external_auth_id: value.external_auth_id,
        }
    }
}

/// Saved-items collection payload.
///
/// Items are returned most-recent first; records reuse the core model's
/// camelCase wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItemsResponse {
    pub items: Vec<SavedItemRecord>,
}
