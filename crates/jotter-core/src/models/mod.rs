pub mod command;
pub mod execution;
pub mod hotkey;

pub use command::{
    Command, CommandAction, CommandFilter, CommandPatch, CommandSource, CommandType, NewCommand,
    Params,
};
pub use execution::{ExecutionContext, ExecutionResult};
pub use hotkey::Hotkey;

use uuid::Uuid;

/// Current Unix timestamp in seconds
pub(crate) fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub(crate) fn generate_command_id() -> String {
    format!("cmd-{}", Uuid::new_v4())
}

pub(crate) fn generate_hotkey_id() -> String {
    format!("hk-{}", Uuid::new_v4())
}
