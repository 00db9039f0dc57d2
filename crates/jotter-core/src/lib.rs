pub mod accelerator;
pub mod agents;
pub mod builtins;
pub mod config;
pub mod error;
pub mod events;
pub mod hotkeys;
pub mod models;
pub mod registry;
pub mod service;
pub mod shortcuts;
pub mod store;

pub use error::{CommandError, Result};
pub use hotkeys::{HotkeyManager, HotkeyTrigger, HotkeyTriggers};
pub use registry::CommandRegistry;
pub use service::{AcceleratorCheck, CommandService, HotkeyBinding};
