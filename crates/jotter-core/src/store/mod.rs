pub mod sqlite;

pub use sqlite::SqliteCommandStore;

use crate::error::Result;
use crate::models::{Command, CommandFilter, CommandPatch, Hotkey};

/// Persistence for command definitions and their hotkeys.
///
/// Commands come back with their hotkeys attached in insertion order.
/// Implementations must reject a second hotkey with an existing accelerator
/// atomically, reporting it as `CommandError::AcceleratorConflict`.
pub trait CommandStore: Send + Sync {
    fn find_command(&self, id: &str) -> Result<Option<Command>>;

    /// Matching commands in unspecified order. Rows that fail to decode
    /// are logged and left out.
    fn find_commands(&self, filter: &CommandFilter) -> Result<Vec<Command>>;

    /// Persist a new command row together with the hotkeys on `command`,
    /// in one transaction.
    fn create_command(&self, command: &Command) -> Result<()>;

    /// Returns `false` if no command has this id.
    fn update_command(&self, id: &str, patch: &CommandPatch, updated_at: i64) -> Result<bool>;

    /// Delete a command and all its hotkeys. Returns `false` if absent.
    fn delete_command(&self, id: &str) -> Result<bool>;

    fn find_hotkey(&self, id: &str) -> Result<Option<Hotkey>>;

    fn find_hotkey_by_accelerator(&self, accelerator: &str) -> Result<Option<Hotkey>>;

    fn create_hotkey(&self, hotkey: &Hotkey) -> Result<()>;

    /// Returns `false` if no hotkey has this id.
    fn update_hotkey_accelerator(&self, id: &str, accelerator: &str) -> Result<bool>;

    /// Returns `false` if no hotkey has this id.
    fn delete_hotkey(&self, id: &str) -> Result<bool>;
}
