//! Host-facing command API.
//!
//! Each method is one request a UI or CLI can make. Persistence goes through
//! the registry; afterwards the service decides which live OS bindings have
//! to follow.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::accelerator::is_accelerator_valid;
use crate::error::{CommandError, Result};
use crate::hotkeys::HotkeyManager;
use crate::models::{
    Command, CommandFilter, CommandPatch, ExecutionContext, ExecutionResult, Hotkey, NewCommand,
};
use crate::registry::CommandRegistry;

/// A stored hotkey plus whether it is live in the OS table right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyBinding {
    pub hotkey: Hotkey,
    pub registered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorCheck {
    pub valid: bool,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_command_id: Option<String>,
}

pub struct CommandService {
    registry: Arc<CommandRegistry>,
    manager: Arc<HotkeyManager>,
}

impl CommandService {
    pub fn new(registry: Arc<CommandRegistry>, manager: Arc<HotkeyManager>) -> Self {
        Self { registry, manager }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn manager(&self) -> &Arc<HotkeyManager> {
        &self.manager
    }

    /// Seed built-ins (unless `seed_builtins` is false) and register every
    /// global hotkey. Returns how many hotkeys went live.
    pub fn initialize(&self, seed_builtins: bool) -> Result<usize> {
        if seed_builtins {
            self.registry.initialize()?;
        }
        let registered = self.manager.initialize()?;
        info!(registered, "Command service ready");
        Ok(registered)
    }

    pub fn shutdown(&self) {
        self.manager.unregister_all();
    }

    pub fn list_commands(&self, filter: &CommandFilter) -> Result<Vec<Command>> {
        self.registry.list_commands(filter)
    }

    pub fn get_command(&self, id: &str) -> Result<Command> {
        self.registry
            .get_command(id)?
            .ok_or_else(|| CommandError::CommandNotFound(id.to_string()))
    }

    pub fn create_command(&self, input: NewCommand) -> Result<Command> {
        self.registry.create_command(input)
    }

    pub fn update_command(&self, id: &str, patch: CommandPatch) -> Result<Command> {
        let command = self.registry.update_command(id, patch)?;
        self.manager.refresh_command_hotkeys(id)?;
        Ok(command)
    }

    pub fn delete_command(&self, id: &str) -> Result<Command> {
        let command = self.registry.delete_command(id)?;
        // Row is gone, so refreshing only drops what was live
        self.manager.refresh_command_hotkeys(id)?;
        Ok(command)
    }

    pub async fn execute_command(&self, id: &str, context: Option<ExecutionContext>) -> ExecutionResult {
        self.registry.execute_command(id, context).await
    }

    pub fn add_hotkey(&self, command_id: &str, accelerator: &str, is_global: bool) -> Result<HotkeyBinding> {
        if !is_accelerator_valid(accelerator) {
            return Err(CommandError::InvalidAccelerator(accelerator.to_string()));
        }

        let hotkey = self.registry.add_hotkey(command_id, accelerator, is_global)?;

        let mut registered = false;
        if is_global {
            let enabled = self
                .registry
                .get_command(command_id)?
                .is_some_and(|c| c.enabled);
            if enabled {
                registered = self.manager.register_hotkey(command_id, accelerator);
            }
        }

        Ok(HotkeyBinding { hotkey, registered })
    }

    pub fn remove_hotkey(&self, hotkey_id: &str) -> Result<Hotkey> {
        let hotkey = self.registry.remove_hotkey(hotkey_id)?;
        if hotkey.is_global {
            self.manager.unregister_hotkey(&hotkey.accelerator);
        }
        Ok(hotkey)
    }

    pub fn update_hotkey(&self, hotkey_id: &str, accelerator: &str) -> Result<Hotkey> {
        if !is_accelerator_valid(accelerator) {
            return Err(CommandError::InvalidAccelerator(accelerator.to_string()));
        }
        let hotkey = self.registry.update_hotkey(hotkey_id, accelerator)?;
        self.manager.refresh_command_hotkeys(&hotkey.command_id)?;
        Ok(hotkey)
    }

    /// Syntax, live-table and stored-binding checks for a candidate
    /// accelerator. `available` is false if anything already holds it.
    pub fn validate_accelerator(&self, accelerator: &str) -> Result<AcceleratorCheck> {
        let valid = self.manager.is_accelerator_valid(accelerator);
        let live_owner = self.manager.command_for_accelerator(accelerator);
        let stored_owner = self
            .registry
            .hotkey_for_accelerator(accelerator)?
            .map(|h| h.command_id);

        let conflict_command_id = stored_owner.or(live_owner);
        Ok(AcceleratorCheck {
            valid,
            available: conflict_command_id.is_none(),
            conflict_command_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::UnavailableOrchestrator;
    use crate::events::BroadcastNotifier;
    use crate::models::{CommandAction, CommandType};
    use crate::registry::tests::{registry_with, user_command, RecordingAgents};
    use crate::shortcuts::HeadlessShortcuts;
    use crate::store::SqliteCommandStore;

    fn service() -> (CommandService, Arc<HeadlessShortcuts>) {
        let registry = Arc::new(registry_with(Arc::new(RecordingAgents::default())));
        let backend = Arc::new(HeadlessShortcuts::new());
        let (manager, _triggers) = HotkeyManager::new(
            registry.clone(),
            backend.clone(),
            Arc::new(BroadcastNotifier::new(4)),
        );
        (CommandService::new(registry, Arc::new(manager)), backend)
    }

    #[test]
    fn test_initialize_registers_builtin_global_hotkeys() {
        let (service, backend) = service();
        assert_eq!(service.initialize(true).unwrap(), 1);
        assert_eq!(backend.registered(), vec!["CommandOrControl+Shift+Space"]);
        assert_eq!(
            service.manager().command_for_accelerator("CommandOrControl+Shift+Space"),
            Some("app.quick-capture".to_string())
        );

        service.shutdown();
        assert!(backend.registered().is_empty());
    }

    #[test]
    fn test_initialize_without_seeding() {
        let (service, _backend) = service();
        assert_eq!(service.initialize(false).unwrap(), 0);
        assert!(service.list_commands(&CommandFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_add_hotkey_validates_and_registers_global() {
        let (service, backend) = service();
        let command = user_command(service.registry(), "Mine", CommandAction::navigate("mine"));

        assert!(matches!(
            service.add_hotkey(&command.id, "Hyper+K", true),
            Err(CommandError::InvalidAccelerator(_))
        ));
        assert!(matches!(
            service.add_hotkey(&command.id, "Ctrl+", true),
            Err(CommandError::InvalidAccelerator(_))
        ));

        let local = service.add_hotkey(&command.id, "Ctrl+L", false).unwrap();
        assert!(!local.registered);

        let global = service.add_hotkey(&command.id, "Ctrl+G", true).unwrap();
        assert!(global.registered);
        assert_eq!(backend.registered(), vec!["Ctrl+G"]);
    }

    #[test]
    fn test_refused_global_hotkey_keeps_the_row() {
        let (service, backend) = service();
        backend.claim_externally("Ctrl+Space");
        let command = user_command(service.registry(), "Mine", CommandAction::navigate("mine"));

        let binding = service.add_hotkey(&command.id, "Ctrl+Space", true).unwrap();
        assert!(!binding.registered);
        assert_eq!(service.get_command(&command.id).unwrap().hotkeys.len(), 1);
    }

    #[test]
    fn test_remove_global_hotkey_unregisters() {
        let (service, backend) = service();
        let command = user_command(service.registry(), "Mine", CommandAction::navigate("mine"));
        let binding = service.add_hotkey(&command.id, "Ctrl+G", true).unwrap();

        let removed = service.remove_hotkey(&binding.hotkey.id).unwrap();
        assert_eq!(removed.accelerator, "Ctrl+G");
        assert!(backend.registered().is_empty());
        assert!(service.manager().is_accelerator_available("Ctrl+G"));
    }

    #[test]
    fn test_disabling_and_reenabling_follows_live_table() {
        let (service, backend) = service();
        let command = user_command(service.registry(), "Mine", CommandAction::navigate("mine"));
        service.add_hotkey(&command.id, "Ctrl+G", true).unwrap();

        let disable = CommandPatch {
            enabled: Some(false),
            ..Default::default()
        };
        service.update_command(&command.id, disable).unwrap();
        assert!(backend.registered().is_empty());

        let enable = CommandPatch {
            enabled: Some(true),
            ..Default::default()
        };
        service.update_command(&command.id, enable).unwrap();
        assert_eq!(backend.registered(), vec!["Ctrl+G"]);

        // Disabled commands do not go live when a hotkey is added
        service
            .update_command(
                &command.id,
                CommandPatch {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        let binding = service.add_hotkey(&command.id, "Ctrl+H", true).unwrap();
        assert!(!binding.registered);
    }

    #[test]
    fn test_update_hotkey_moves_live_binding() {
        let (service, backend) = service();
        let command = user_command(service.registry(), "Mine", CommandAction::navigate("mine"));
        let binding = service.add_hotkey(&command.id, "Ctrl+G", true).unwrap();

        assert!(matches!(
            service.update_hotkey(&binding.hotkey.id, "G+"),
            Err(CommandError::InvalidAccelerator(_))
        ));

        let moved = service.update_hotkey(&binding.hotkey.id, "Alt+G").unwrap();
        assert_eq!(moved.accelerator, "Alt+G");
        assert_eq!(backend.registered(), vec!["Alt+G"]);
    }

    #[test]
    fn test_delete_command_releases_live_bindings() {
        let (service, backend) = service();
        let command = user_command(service.registry(), "Mine", CommandAction::navigate("mine"));
        service.add_hotkey(&command.id, "Ctrl+G", true).unwrap();

        service.delete_command(&command.id).unwrap();
        assert!(backend.registered().is_empty());
        assert!(matches!(
            service.get_command(&command.id),
            Err(CommandError::CommandNotFound(_))
        ));
    }

    #[test]
    fn test_validate_accelerator() {
        let (service, _backend) = service();
        let command = user_command(service.registry(), "Mine", CommandAction::navigate("mine"));
        service.add_hotkey(&command.id, "Ctrl+L", false).unwrap();

        assert_eq!(
            service.validate_accelerator("Ctrl+L").unwrap(),
            AcceleratorCheck {
                valid: true,
                available: false,
                conflict_command_id: Some(command.id.clone()),
            }
        );
        assert_eq!(
            service.validate_accelerator("Ctrl+Q").unwrap(),
            AcceleratorCheck {
                valid: true,
                available: true,
                conflict_command_id: None,
            }
        );
        assert!(!service.validate_accelerator("Ctrl+").unwrap().valid);
    }

    #[tokio::test]
    async fn test_on_disk_service_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.db");

        {
            let store = Arc::new(SqliteCommandStore::open(&path).unwrap());
            let registry = Arc::new(CommandRegistry::new(store, Arc::new(UnavailableOrchestrator)));
            let (manager, _triggers) = HotkeyManager::new(
                registry.clone(),
                Arc::new(HeadlessShortcuts::new()),
                Arc::new(BroadcastNotifier::new(4)),
            );
            let service = CommandService::new(registry, Arc::new(manager));
            service.initialize(true).unwrap();

            let summarize = service
                .create_command(NewCommand::new(
                    "Summarize",
                    CommandType::Agent,
                    CommandAction::agent("summarizer"),
                ))
                .unwrap();
            let result = service.execute_command(&summarize.id, None).await;
            assert_eq!(
                result.error.as_deref(),
                Some("No agent orchestrator available to run agent: summarizer")
            );
            service.shutdown();
        }

        let store = Arc::new(SqliteCommandStore::open(&path).unwrap());
        let registry = CommandRegistry::new(store, Arc::new(UnavailableOrchestrator));
        assert_eq!(registry.initialize().unwrap(), 0);
        let result = registry.execute_command("nav.settings", None).await;
        assert!(result.success);
    }
}
