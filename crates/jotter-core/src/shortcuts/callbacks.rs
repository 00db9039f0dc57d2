use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

use super::ShortcutCallback;

/// Callbacks keyed by whatever identifies a shortcut to its backend.
///
/// A key holds at most one callback; `claim` never replaces an existing
/// entry, so a failed registration can only release what it inserted.
pub struct CallbackTable<K> {
    callbacks: Mutex<HashMap<K, ShortcutCallback>>,
}

impl<K> Default for CallbackTable<K> {
    fn default() -> Self {
        Self {
            callbacks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> CallbackTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `callback` under `key`. Returns `false`, dropping `callback`,
    /// if the key is already taken.
    pub fn claim(&self, key: K, callback: ShortcutCallback) -> bool {
        let mut callbacks = self.callbacks.lock();
        if callbacks.contains_key(&key) {
            return false;
        }
        callbacks.insert(key, callback);
        true
    }

    pub fn release(&self, key: &K) -> bool {
        self.callbacks.lock().remove(key).is_some()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.callbacks.lock().contains_key(key)
    }

    /// Run the callback for `key`. Returns `false` if there is none.
    pub fn fire(&self, key: &K) -> bool {
        let callbacks = self.callbacks.lock();
        match callbacks.get(key) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> Vec<K> {
        self.callbacks.lock().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.callbacks.lock().clear();
    }
}
