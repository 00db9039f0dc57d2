use serde::{Deserialize, Serialize};

/// One accelerator binding owned by a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotkey {
    pub id: String,
    pub command_id: String,
    /// Modifier+key string, e.g. `CommandOrControl+Shift+P`
    pub accelerator: String,
    /// Registered with the OS so it fires while the app is unfocused
    pub is_global: bool,
    pub created_at: i64,
}
