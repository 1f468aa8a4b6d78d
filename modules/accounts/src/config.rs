use serde::{Deserialize, Serialize};

use apikit::UnknownFields;

/// Configuration for the accounts module (`modules.accounts`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountsConfig {
    /// Allow authenticated clients to deactivate accounts through DELETE.
    #[serde(default)]
    pub can_delete: bool,
    /// Body keys that are not user fields: `ignore` or `reject`.
    #[serde(default)]
    pub unknown_fields: UnknownFields,
}
