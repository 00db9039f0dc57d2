//! Global shortcut backends.
//!
//! The hotkey manager is the only caller of these primitives.

pub mod callbacks;
pub mod headless;
#[cfg(feature = "os-shortcuts")]
pub mod os;

pub use callbacks::CallbackTable;
pub use headless::HeadlessShortcuts;
#[cfg(feature = "os-shortcuts")]
pub use os::OsShortcuts;

use anyhow::Result;

/// Invoked from the backend's event source each time the accelerator fires.
pub type ShortcutCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// OS-level global shortcut table.
pub trait ShortcutBackend: Send + Sync {
    /// `Ok(false)` means the accelerator is already claimed (by us or by
    /// another application) and nothing was registered.
    fn register(&self, accelerator: &str, callback: ShortcutCallback) -> Result<bool>;

    fn unregister(&self, accelerator: &str) -> Result<()>;

    fn unregister_all(&self) -> Result<()>;
}
