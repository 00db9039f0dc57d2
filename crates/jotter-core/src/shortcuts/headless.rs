use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashSet;

use super::{CallbackTable, ShortcutBackend, ShortcutCallback};

/// In-process shortcut table with no OS hookup.
///
/// Used when the binary is built without `os-shortcuts`, and by tests:
/// `trigger` fires a registered callback, `claim_externally` simulates an
/// accelerator owned by another application.
#[derive(Default)]
pub struct HeadlessShortcuts {
    bindings: CallbackTable<String>,
    claimed: Mutex<HashSet<String>>,
}

impl HeadlessShortcuts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim_externally(&self, accelerator: &str) {
        self.claimed.lock().insert(accelerator.to_string());
    }

    pub fn is_registered(&self, accelerator: &str) -> bool {
        self.bindings.contains(&accelerator.to_string())
    }

    /// Registered accelerators, sorted
    pub fn registered(&self) -> Vec<String> {
        let mut accelerators = self.bindings.keys();
        accelerators.sort();
        accelerators
    }

    /// Fire the callback bound to `accelerator`. Returns `false` if nothing
    /// is registered for it.
    pub fn trigger(&self, accelerator: &str) -> bool {
        self.bindings.fire(&accelerator.to_string())
    }
}

impl ShortcutBackend for HeadlessShortcuts {
    fn register(&self, accelerator: &str, callback: ShortcutCallback) -> Result<bool> {
        if self.claimed.lock().contains(accelerator) {
            return Ok(false);
        }
        Ok(self.bindings.claim(accelerator.to_string(), callback))
    }

    fn unregister(&self, accelerator: &str) -> Result<()> {
        self.bindings.release(&accelerator.to_string());
        Ok(())
    }

    fn unregister_all(&self) -> Result<()> {
        self.bindings.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_register_trigger_unregister() {
        let backend = HeadlessShortcuts::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        assert!(backend
            .register(
                "Ctrl+K",
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            )
            .unwrap());
        assert!(backend.trigger("Ctrl+K"));
        assert!(backend.trigger("Ctrl+K"));
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        backend.unregister("Ctrl+K").unwrap();
        assert!(!backend.trigger("Ctrl+K"));
        assert!(backend.registered().is_empty());
    }

    #[test]
    fn test_refuses_claimed_and_duplicate_accelerators() {
        let backend = HeadlessShortcuts::new();
        backend.claim_externally("Ctrl+Space");

        assert!(!backend.register("Ctrl+Space", Box::new(|| {})).unwrap());
        assert!(backend.register("Ctrl+K", Box::new(|| {})).unwrap());
        assert!(!backend.register("Ctrl+K", Box::new(|| {})).unwrap());
        assert_eq!(backend.registered(), vec!["Ctrl+K".to_string()]);
    }
}
