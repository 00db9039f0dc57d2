//! Command Registry
//!
//! Owns the command catalog: seeds built-ins, manages user commands and
//! their hotkey rows, and is the single entry point for executing a
//! command. It never talks to the OS shortcut table; keeping live global
//! registrations in sync is the hotkey manager's job.

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agents::AgentOrchestrator;
use crate::builtins::{BuiltinCommand, BUILTIN_COMMANDS};
use crate::error::{CommandError, Result};
use crate::models::{
    generate_command_id, generate_hotkey_id, now_secs, Command, CommandAction, CommandFilter,
    CommandPatch, CommandSource, ExecutionContext, ExecutionResult, Hotkey, NewCommand,
};
use crate::store::CommandStore;

pub struct CommandRegistry {
    store: Arc<dyn CommandStore>,
    agents: Arc<dyn AgentOrchestrator>,
    catalog: &'static [BuiltinCommand],
    initialized: AtomicBool,
}

/// `{"action": <action>, <key>: <value>}`, leaving `key` out when absent.
fn action_output(action: &str, key: &str, value: Option<Value>) -> Value {
    let mut output = Map::new();
    output.insert("action".to_string(), Value::String(action.to_string()));
    if let Some(value) = value {
        output.insert(key.to_string(), value);
    }
    Value::Object(output)
}

impl CommandRegistry {
    pub fn new(store: Arc<dyn CommandStore>, agents: Arc<dyn AgentOrchestrator>) -> Self {
        Self::with_catalog(store, agents, BUILTIN_COMMANDS)
    }

    pub fn with_catalog(
        store: Arc<dyn CommandStore>,
        agents: Arc<dyn AgentOrchestrator>,
        catalog: &'static [BuiltinCommand],
    ) -> Self {
        Self {
            store,
            agents,
            catalog,
            initialized: AtomicBool::new(false),
        }
    }

    /// Seed every built-in whose id is not stored yet, with its default
    /// hotkey. Later calls on the same registry are no-ops. Returns the
    /// number of commands seeded.
    pub fn initialize(&self) -> Result<usize> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(0);
        }

        let mut seeded = 0;
        for builtin in self.catalog {
            if self.store.find_command(builtin.id)?.is_some() {
                continue;
            }

            // Row and default hotkey are written in one transaction
            let now = now_secs();
            let mut command = builtin.to_command(now);
            if let Some(default) = builtin.default_hotkey {
                command.hotkeys.push(Hotkey {
                    id: generate_hotkey_id(),
                    command_id: builtin.id.to_string(),
                    accelerator: default.accelerator.to_string(),
                    is_global: default.global,
                    created_at: now,
                });
            }

            match self.store.create_command(&command) {
                Ok(()) => {}
                Err(CommandError::AcceleratorConflict {
                    accelerator,
                    command_id,
                }) => {
                    warn!(
                        builtin = builtin.id,
                        %accelerator,
                        holder = %command_id,
                        "Skipping default hotkey already bound to another command"
                    );
                    command.hotkeys.clear();
                    self.store.create_command(&command)?;
                }
                Err(e) => return Err(e),
            }
            seeded += 1;
        }

        self.initialized.store(true, Ordering::SeqCst);
        info!(seeded, catalog = self.catalog.len(), "Command registry initialized");
        Ok(seeded)
    }

    /// Commands matching `filter`, sorted by category then name.
    pub fn list_commands(&self, filter: &CommandFilter) -> Result<Vec<Command>> {
        let mut commands = self.store.find_commands(filter)?;
        commands.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(commands)
    }

    pub fn get_command(&self, id: &str) -> Result<Option<Command>> {
        self.store.find_command(id)
    }

    pub fn create_command(&self, input: NewCommand) -> Result<Command> {
        let now = now_secs();
        let command = Command {
            id: generate_command_id(),
            name: input.name,
            description: input.description,
            command_type: input.command_type,
            action: input.action,
            enabled: input.enabled.unwrap_or(true),
            is_built_in: false,
            source: input.source.unwrap_or(CommandSource::User),
            category: input.category,
            hotkeys: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.store.create_command(&command)?;
        info!(command_id = %command.id, name = %command.name, "Command created");
        Ok(command)
    }

    pub fn update_command(&self, id: &str, patch: CommandPatch) -> Result<Command> {
        if !self.store.update_command(id, &patch, now_secs())? {
            return Err(CommandError::CommandNotFound(id.to_string()));
        }
        debug!(command_id = id, ?patch, "Command updated");
        self.store
            .find_command(id)?
            .ok_or_else(|| CommandError::CommandNotFound(id.to_string()))
    }

    /// Delete a user command and its hotkeys. Returns the removed command
    /// so the caller can release any live registrations it held.
    pub fn delete_command(&self, id: &str) -> Result<Command> {
        let command = self
            .store
            .find_command(id)?
            .ok_or_else(|| CommandError::CommandNotFound(id.to_string()))?;
        if command.is_built_in {
            return Err(CommandError::BuiltInCommand(id.to_string()));
        }

        self.store.delete_command(id)?;
        info!(command_id = id, hotkeys = command.hotkeys.len(), "Command deleted");
        Ok(command)
    }

    /// Bind `accelerator` to a command. Fails if any hotkey anywhere
    /// already uses it. Does not register anything with the OS.
    pub fn add_hotkey(&self, command_id: &str, accelerator: &str, is_global: bool) -> Result<Hotkey> {
        if self.store.find_command(command_id)?.is_none() {
            return Err(CommandError::CommandNotFound(command_id.to_string()));
        }
        if let Some(existing) = self.store.find_hotkey_by_accelerator(accelerator)? {
            return Err(CommandError::AcceleratorConflict {
                accelerator: accelerator.to_string(),
                command_id: existing.command_id,
            });
        }

        let hotkey = Hotkey {
            id: generate_hotkey_id(),
            command_id: command_id.to_string(),
            accelerator: accelerator.to_string(),
            is_global,
            created_at: now_secs(),
        };
        self.store.create_hotkey(&hotkey)?;
        debug!(command_id, accelerator, is_global, "Hotkey added");
        Ok(hotkey)
    }

    /// Delete a binding and return it. A live OS registration for it is
    /// left alone; unregistering is the caller's decision.
    pub fn remove_hotkey(&self, hotkey_id: &str) -> Result<Hotkey> {
        let hotkey = self
            .store
            .find_hotkey(hotkey_id)?
            .ok_or_else(|| CommandError::HotkeyNotFound(hotkey_id.to_string()))?;
        self.store.delete_hotkey(hotkey_id)?;
        debug!(hotkey_id, accelerator = %hotkey.accelerator, "Hotkey removed");
        Ok(hotkey)
    }

    /// Rebind an existing hotkey. Renaming to its current accelerator is a
    /// no-op; colliding with any other hotkey is a conflict.
    pub fn update_hotkey(&self, hotkey_id: &str, accelerator: &str) -> Result<Hotkey> {
        let mut hotkey = self
            .store
            .find_hotkey(hotkey_id)?
            .ok_or_else(|| CommandError::HotkeyNotFound(hotkey_id.to_string()))?;

        if let Some(existing) = self.store.find_hotkey_by_accelerator(accelerator)? {
            if existing.id != hotkey.id {
                return Err(CommandError::AcceleratorConflict {
                    accelerator: accelerator.to_string(),
                    command_id: existing.command_id,
                });
            }
            return Ok(hotkey);
        }

        self.store.update_hotkey_accelerator(hotkey_id, accelerator)?;
        debug!(hotkey_id, from = %hotkey.accelerator, to = accelerator, "Hotkey rebound");
        hotkey.accelerator = accelerator.to_string();
        Ok(hotkey)
    }

    /// Store-wide lookup of whoever holds `accelerator`, global or not.
    pub fn hotkey_for_accelerator(&self, accelerator: &str) -> Result<Option<Hotkey>> {
        self.store.find_hotkey_by_accelerator(accelerator)
    }

    /// Run a command. Every failure, including a missing or disabled
    /// command and agent errors, comes back as `success: false`.
    pub async fn execute_command(&self, id: &str, context: Option<ExecutionContext>) -> ExecutionResult {
        let command = match self.store.find_command(id) {
            Ok(Some(command)) => command,
            Ok(None) => return ExecutionResult::failed(format!("Command not found: {}", id)),
            Err(e) => return ExecutionResult::failed(e.to_string()),
        };

        if !command.enabled {
            return ExecutionResult::failed(format!("Command is disabled: {}", id));
        }

        let result = self.dispatch(&command, context.unwrap_or_default()).await;
        info!(
            command_id = id,
            action_type = command.action.action_type(),
            success = result.success,
            "Command executed"
        );
        result
    }

    async fn dispatch(&self, command: &Command, context: ExecutionContext) -> ExecutionResult {
        match &command.action {
            CommandAction::Navigate { route } => ExecutionResult::ok(action_output(
                "navigate",
                "route",
                route.clone().map(Value::String),
            )),
            CommandAction::Toggle { params } => ExecutionResult::ok(action_output(
                "toggle",
                "params",
                params.clone().map(Value::Object),
            )),
            CommandAction::Execute { params } => ExecutionResult::ok(action_output(
                "execute",
                "params",
                params.clone().map(Value::Object),
            )),
            CommandAction::AgentExecute { agent_id, .. } => {
                let Some(agent_id) = agent_id.as_deref().filter(|a| !a.is_empty()) else {
                    return ExecutionResult::failed("No agentId specified in command payload");
                };
                match self
                    .agents
                    .execute_agent(agent_id, context.into_agent_input())
                    .await
                {
                    Ok(outcome) => outcome.into(),
                    Err(e) => {
                        warn!(command_id = %command.id, agent_id, error = %e, "Agent execution failed");
                        ExecutionResult::failed(e.to_string())
                    }
                }
            }
            CommandAction::Unsupported { action_type } => {
                ExecutionResult::failed(format!("Unknown actionType: {}", action_type))
            }
        }
    }
}
