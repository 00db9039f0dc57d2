/// Errors raised while managing the command catalog.
///
/// Execution never surfaces these directly: `CommandRegistry::execute_command`
/// folds every failure into an `ExecutionResult`.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Hotkey not found: {0}")]
    HotkeyNotFound(String),

    #[error("Accelerator {accelerator} is already bound to command {command_id}")]
    AcceleratorConflict {
        accelerator: String,
        command_id: String,
    },

    #[error("Cannot delete built-in command: {0}")]
    BuiltInCommand(String),

    #[error("Invalid accelerator: {0}")]
    InvalidAccelerator(String),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
