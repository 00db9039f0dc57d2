//! Hotkey Manager
//!
//! Mirrors the global hotkeys of enabled commands into the OS shortcut
//! table and turns key presses into command executions. Backend callbacks
//! only push a [`HotkeyTrigger`] onto a channel; [`HotkeyManager::run`]
//! drains it on the async runtime.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::accelerator::is_accelerator_valid;
use crate::error::Result;
use crate::events::{CommandEvent, NotifyTarget, UiNotifier};
use crate::models::CommandFilter;
use crate::registry::CommandRegistry;
use crate::shortcuts::ShortcutBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyTrigger {
    pub command_id: String,
    pub accelerator: String,
}

/// Receiving end of the key-press channel, consumed by [`HotkeyManager::run`].
pub type HotkeyTriggers = mpsc::UnboundedReceiver<HotkeyTrigger>;

pub struct HotkeyManager {
    registry: Arc<CommandRegistry>,
    backend: Arc<dyn ShortcutBackend>,
    notifier: Arc<dyn UiNotifier>,
    triggers: mpsc::UnboundedSender<HotkeyTrigger>,
    /// accelerator -> command id, for everything currently registered
    live: Mutex<HashMap<String, String>>,
    initialized: AtomicBool,
}

impl HotkeyManager {
    pub fn new(
        registry: Arc<CommandRegistry>,
        backend: Arc<dyn ShortcutBackend>,
        notifier: Arc<dyn UiNotifier>,
    ) -> (Self, HotkeyTriggers) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            registry,
            backend,
            notifier,
            triggers: tx,
            live: Mutex::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        };
        (manager, rx)
    }

    /// Register every global hotkey once. Later calls return 0.
    pub fn initialize(&self) -> Result<usize> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let registered = self.register_all_global_hotkeys()?;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(registered)
    }

    pub fn register_all_global_hotkeys(&self) -> Result<usize> {
        let commands = self.registry.list_commands(&CommandFilter::enabled())?;

        let mut registered = 0;
        for command in &commands {
            for hotkey in command.global_hotkeys() {
                if self.register_hotkey(&command.id, &hotkey.accelerator) {
                    registered += 1;
                }
            }
        }

        info!(registered, "Global hotkeys registered");
        Ok(registered)
    }

    /// Bind `accelerator` to `command_id` in the OS table, replacing any
    /// live binding for the same accelerator. Returns `false` if the
    /// backend refused or failed.
    pub fn register_hotkey(&self, command_id: &str, accelerator: &str) -> bool {
        if self.live.lock().contains_key(accelerator) {
            self.unregister_hotkey(accelerator);
        }

        let tx = self.triggers.clone();
        let trigger = HotkeyTrigger {
            command_id: command_id.to_string(),
            accelerator: accelerator.to_string(),
        };
        let callback = Box::new(move || {
            // Closed only once the manager is gone
            let _ = tx.send(trigger.clone());
        });

        match self.backend.register(accelerator, callback) {
            Ok(true) => {
                self.live
                    .lock()
                    .insert(accelerator.to_string(), command_id.to_string());
                debug!(command_id, accelerator, "Global hotkey registered");
                true
            }
            Ok(false) => {
                warn!(command_id, accelerator, "Accelerator already taken, not registered");
                false
            }
            Err(e) => {
                warn!(command_id, accelerator, error = %e, "Failed to register global hotkey");
                false
            }
        }
    }

    /// Drop a live binding. Unknown accelerators are ignored.
    pub fn unregister_hotkey(&self, accelerator: &str) {
        let Some(command_id) = self.live.lock().remove(accelerator) else {
            return;
        };
        if let Err(e) = self.backend.unregister(accelerator) {
            warn!(%command_id, accelerator, error = %e, "Failed to unregister global hotkey");
        }
        debug!(%command_id, accelerator, "Global hotkey unregistered");
    }

    pub fn unregister_all(&self) {
        let live: Vec<String> = self.live.lock().drain().map(|(accel, _)| accel).collect();
        for accelerator in &live {
            if let Err(e) = self.backend.unregister(accelerator) {
                warn!(accelerator = %accelerator, error = %e, "Failed to unregister global hotkey");
            }
        }
        if let Err(e) = self.backend.unregister_all() {
            warn!(error = %e, "Failed to clear global shortcut table");
        }
        info!(released = live.len(), "Global hotkeys released");
    }

    pub fn is_accelerator_valid(&self, accelerator: &str) -> bool {
        is_accelerator_valid(accelerator)
    }

    /// Not currently registered by this manager. Says nothing about other
    /// applications or stored non-global bindings.
    pub fn is_accelerator_available(&self, accelerator: &str) -> bool {
        !self.live.lock().contains_key(accelerator)
    }

    pub fn command_for_accelerator(&self, accelerator: &str) -> Option<String> {
        self.live.lock().get(accelerator).cloned()
    }

    /// `(accelerator, command id)` pairs, sorted by accelerator.
    pub fn live_accelerators(&self) -> Vec<(String, String)> {
        let mut live: Vec<(String, String)> = self
            .live
            .lock()
            .iter()
            .map(|(a, c)| (a.clone(), c.clone()))
            .collect();
        live.sort();
        live
    }

    /// Execute the command behind a key press and tell the UI how it went.
    pub async fn handle_hotkey_triggered(&self, command_id: &str, accelerator: &str) {
        info!(command_id, accelerator, "Global hotkey triggered");

        let result = self.registry.execute_command(command_id, None).await;
        let event = if result.success {
            CommandEvent::Executed {
                command_id: command_id.to_string(),
                output: result.output,
            }
        } else {
            CommandEvent::Error {
                command_id: command_id.to_string(),
                error: result.error.unwrap_or_else(|| "Command failed".to_string()),
            }
        };

        let target = match self.notifier.focused_window() {
            Some(window) => NotifyTarget::Window(window),
            None => NotifyTarget::All,
        };
        self.notifier.emit(target, &event);
    }

    /// Handle key presses until the channel closes.
    pub async fn run(&self, mut triggers: HotkeyTriggers) {
        while let Some(trigger) = triggers.recv().await {
            self.handle_hotkey_triggered(&trigger.command_id, &trigger.accelerator)
                .await;
        }
    }

    /// Re-sync the live bindings of one command with its stored state.
    /// Returns the number of accelerators registered afterwards.
    pub fn refresh_command_hotkeys(&self, command_id: &str) -> Result<usize> {
        let stale: Vec<String> = self
            .live
            .lock()
            .iter()
            .filter(|(_, owner)| owner.as_str() == command_id)
            .map(|(accel, _)| accel.clone())
            .collect();
        for accelerator in &stale {
            self.unregister_hotkey(accelerator);
        }

        let mut registered = 0;
        if let Some(command) = self.registry.get_command(command_id)? {
            if command.enabled {
                for hotkey in command.global_hotkeys() {
                    if self.register_hotkey(&command.id, &hotkey.accelerator) {
                        registered += 1;
                    }
                }
            }
        }

        debug!(command_id, dropped = stale.len(), registered, "Command hotkeys refreshed");
        Ok(registered)
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        if !self.live.get_mut().is_empty() {
            self.unregister_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentOutcome;
    use crate::events::BroadcastNotifier;
    use crate::models::{CommandAction, CommandPatch};
    use crate::registry::tests::{registry_with, user_command, RecordingAgents};
    use crate::shortcuts::{HeadlessShortcuts, ShortcutCallback};
    use crate::store::SqliteCommandStore;
    use serde_json::json;

    struct Harness {
        registry: Arc<CommandRegistry>,
        backend: Arc<HeadlessShortcuts>,
        notifier: Arc<BroadcastNotifier>,
        manager: Arc<HotkeyManager>,
        triggers: Option<HotkeyTriggers>,
    }

    fn harness() -> Harness {
        let registry = Arc::new(registry_with(Arc::new(RecordingAgents::default())));
        let backend = Arc::new(HeadlessShortcuts::new());
        let notifier = Arc::new(BroadcastNotifier::new(16));
        let (manager, triggers) =
            HotkeyManager::new(registry.clone(), backend.clone(), notifier.clone());
        Harness {
            registry,
            backend,
            notifier,
            manager: Arc::new(manager),
            triggers: Some(triggers),
        }
    }

    struct FailingBackend;

    impl ShortcutBackend for FailingBackend {
        fn register(&self, _accelerator: &str, _callback: ShortcutCallback) -> anyhow::Result<bool> {
            anyhow::bail!("display unavailable")
        }

        fn unregister(&self, _accelerator: &str) -> anyhow::Result<()> {
            anyhow::bail!("display unavailable")
        }

        fn unregister_all(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_unregister_round_trip() {
        let h = harness();
        let command = user_command(&h.registry, "Mine", CommandAction::navigate("mine"));

        assert!(h.manager.register_hotkey(&command.id, "Ctrl+K"));
        assert!(!h.manager.is_accelerator_available("Ctrl+K"));
        assert_eq!(h.manager.command_for_accelerator("Ctrl+K"), Some(command.id.clone()));
        assert!(h.backend.is_registered("Ctrl+K"));

        h.manager.unregister_hotkey("Ctrl+K");
        assert!(h.manager.is_accelerator_available("Ctrl+K"));
        assert_eq!(h.manager.command_for_accelerator("Ctrl+K"), None);
        assert!(!h.backend.is_registered("Ctrl+K"));

        // Not live, nothing to do
        h.manager.unregister_hotkey("Ctrl+K");
    }

    #[test]
    fn test_reregistering_replaces_owner() {
        let h = harness();
        assert!(h.manager.register_hotkey("one", "Ctrl+K"));
        assert!(h.manager.register_hotkey("two", "Ctrl+K"));
        assert_eq!(
            h.manager.live_accelerators(),
            vec![("Ctrl+K".to_string(), "two".to_string())]
        );
        assert_eq!(h.backend.registered(), vec!["Ctrl+K".to_string()]);
    }

    #[test]
    fn test_backend_refusal_leaves_live_table_unchanged() {
        let h = harness();
        h.backend.claim_externally("Ctrl+Space");

        assert!(!h.manager.register_hotkey("one", "Ctrl+Space"));
        assert!(h.manager.live_accelerators().is_empty());
        assert!(h.manager.is_accelerator_available("Ctrl+Space"));
    }

    #[test]
    fn test_failing_backend_is_contained() {
        let registry = Arc::new(registry_with(Arc::new(RecordingAgents::default())));
        let notifier = Arc::new(BroadcastNotifier::new(4));
        let (manager, _triggers) = HotkeyManager::new(registry, Arc::new(FailingBackend), notifier);

        assert!(!manager.register_hotkey("one", "Ctrl+K"));
        assert!(manager.live_accelerators().is_empty());
        manager.unregister_all();
    }

    #[test]
    fn test_register_all_only_enabled_global() {
        let h = harness();
        let enabled = user_command(&h.registry, "Enabled", CommandAction::navigate("a"));
        let disabled = user_command(&h.registry, "Disabled", CommandAction::navigate("b"));
        h.registry.add_hotkey(&enabled.id, "Ctrl+1", true).unwrap();
        h.registry.add_hotkey(&enabled.id, "Ctrl+2", false).unwrap();
        h.registry.add_hotkey(&disabled.id, "Ctrl+3", true).unwrap();
        h.registry
            .update_command(
                &disabled.id,
                CommandPatch {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(h.manager.initialize().unwrap(), 1);
        assert_eq!(h.manager.initialize().unwrap(), 0);
        assert_eq!(
            h.manager.live_accelerators(),
            vec![("Ctrl+1".to_string(), enabled.id.clone())]
        );
    }

    #[test]
    fn test_refresh_drops_stale_and_adds_new() {
        let h = harness();
        let command = user_command(&h.registry, "Mine", CommandAction::navigate("mine"));
        let first = h.registry.add_hotkey(&command.id, "Ctrl+1", true).unwrap();
        let second = h.registry.add_hotkey(&command.id, "Ctrl+2", true).unwrap();
        h.manager.register_all_global_hotkeys().unwrap();
        assert_eq!(h.backend.registered(), vec!["Ctrl+1", "Ctrl+2"]);

        h.registry.remove_hotkey(&first.id).unwrap();
        h.registry.remove_hotkey(&second.id).unwrap();
        h.registry.add_hotkey(&command.id, "Ctrl+3", true).unwrap();

        assert_eq!(h.manager.refresh_command_hotkeys(&command.id).unwrap(), 1);
        assert_eq!(
            h.manager.live_accelerators(),
            vec![("Ctrl+3".to_string(), command.id.clone())]
        );
        assert_eq!(h.backend.registered(), vec!["Ctrl+3"]);
    }

    #[test]
    fn test_refresh_of_disabled_or_deleted_command_registers_nothing() {
        let h = harness();
        let command = user_command(&h.registry, "Mine", CommandAction::navigate("mine"));
        h.registry.add_hotkey(&command.id, "Ctrl+1", true).unwrap();
        h.manager.register_all_global_hotkeys().unwrap();

        h.registry
            .update_command(
                &command.id,
                CommandPatch {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(h.manager.refresh_command_hotkeys(&command.id).unwrap(), 0);
        assert!(h.manager.live_accelerators().is_empty());

        assert_eq!(h.manager.refresh_command_hotkeys("gone").unwrap(), 0);
    }

    #[test]
    fn test_unreadable_command_does_not_block_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.db");
        let store = Arc::new(SqliteCommandStore::open(&path).unwrap());
        let registry = Arc::new(CommandRegistry::new(
            store,
            Arc::new(RecordingAgents::default()),
        ));

        let healthy = user_command(&registry, "Healthy", CommandAction::navigate("ok"));
        let broken = user_command(&registry, "Broken", CommandAction::navigate("bad"));
        registry.add_hotkey(&healthy.id, "Ctrl+G", true).unwrap();
        registry.add_hotkey(&broken.id, "Ctrl+B", true).unwrap();

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute(
                r#"UPDATE commands SET action_payload = '{"route": 42}' WHERE id = ?"#,
                [&broken.id],
            )
            .unwrap();

        let backend = Arc::new(HeadlessShortcuts::new());
        let (manager, _triggers) = HotkeyManager::new(
            registry.clone(),
            backend.clone(),
            Arc::new(BroadcastNotifier::new(4)),
        );

        assert_eq!(manager.initialize().unwrap(), 1);
        assert_eq!(
            manager.live_accelerators(),
            vec![("Ctrl+G".to_string(), healthy.id.clone())]
        );
        assert_eq!(backend.registered(), vec!["Ctrl+G"]);
    }

    #[test]
    fn test_drop_releases_registrations() {
        let h = harness();
        let backend = h.backend.clone();
        assert!(h.manager.register_hotkey("one", "Ctrl+K"));
        drop(h);
        assert!(backend.registered().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_loop_emits_to_focused_window() {
        let mut h = harness();
        let command = user_command(&h.registry, "Settings", CommandAction::navigate("settings"));
        h.registry.add_hotkey(&command.id, "Ctrl+,", true).unwrap();
        h.manager.initialize().unwrap();

        h.notifier.set_focused_window(Some("main".to_string()));
        let mut events = h.notifier.subscribe();

        let manager = h.manager.clone();
        let triggers = h.triggers.take().unwrap();
        let loop_task = tokio::spawn(async move { manager.run(triggers).await });

        assert!(h.backend.trigger("Ctrl+,"));
        let notification = events.recv().await.unwrap();
        assert_eq!(notification.target, NotifyTarget::Window("main".to_string()));
        assert_eq!(notification.event, CommandEvent::EXECUTED);
        assert_eq!(
            notification.payload,
            json!({"commandId": command.id, "output": {"action": "navigate", "route": "settings"}})
        );

        loop_task.abort();
    }

    #[tokio::test]
    async fn test_failed_execution_broadcasts_error_without_focus() {
        let agents = Arc::new(RecordingAgents::default());
        *agents.outcome.lock() = Some(AgentOutcome {
            success: false,
            output: None,
            error: None,
        });
        let registry = Arc::new(registry_with(agents));
        let notifier = Arc::new(BroadcastNotifier::new(4));
        let (manager, _triggers) = HotkeyManager::new(
            registry.clone(),
            Arc::new(HeadlessShortcuts::new()),
            notifier.clone(),
        );
        let mut events = notifier.subscribe();

        manager.handle_hotkey_triggered("missing", "Ctrl+K").await;
        let notification = events.recv().await.unwrap();
        assert_eq!(notification.target, NotifyTarget::All);
        assert_eq!(notification.event, CommandEvent::ERROR);
        assert_eq!(
            notification.payload,
            json!({"commandId": "missing", "error": "Command not found: missing"})
        );

        let command = user_command(&registry, "Agent", CommandAction::agent("quiet"));
        manager.handle_hotkey_triggered(&command.id, "Ctrl+K").await;
        let notification = events.recv().await.unwrap();
        assert_eq!(notification.payload["error"], "Command failed");
    }
}
