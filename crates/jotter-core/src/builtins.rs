//! Commands shipped with the application.
//!
//! Seeded once per id by `CommandRegistry::initialize`; an existing row is
//! never overwritten, so user changes to enabled state or hotkeys survive
//! upgrades.

use serde_json::{Map, Value};

use crate::models::{Command, CommandAction, CommandSource, CommandType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAction {
    Navigate(&'static str),
    /// Toggle the named piece of UI state
    Toggle(&'static str),
    /// Run the named operation
    Execute(&'static str),
}

impl BuiltinAction {
    fn to_action(self) -> CommandAction {
        match self {
            BuiltinAction::Navigate(route) => CommandAction::navigate(route),
            BuiltinAction::Toggle(target) => CommandAction::Toggle {
                params: Some(single_param("target", target)),
            },
            BuiltinAction::Execute(operation) => CommandAction::Execute {
                params: Some(single_param("operation", operation)),
            },
        }
    }
}

fn single_param(key: &str, value: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(key.to_string(), Value::String(value.to_string()));
    params
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultHotkey {
    pub accelerator: &'static str,
    pub global: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinCommand {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub command_type: CommandType,
    pub category: &'static str,
    pub action: BuiltinAction,
    pub default_hotkey: Option<DefaultHotkey>,
}

impl BuiltinCommand {
    pub const fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        command_type: CommandType,
        category: &'static str,
        action: BuiltinAction,
    ) -> Self {
        Self {
            id,
            name,
            description,
            command_type,
            category,
            action,
            default_hotkey: None,
        }
    }

    /// Bound while the app window has focus
    pub const fn local(mut self, accelerator: &'static str) -> Self {
        self.default_hotkey = Some(DefaultHotkey {
            accelerator,
            global: false,
        });
        self
    }

    /// Registered with the OS
    pub const fn global(mut self, accelerator: &'static str) -> Self {
        self.default_hotkey = Some(DefaultHotkey {
            accelerator,
            global: true,
        });
        self
    }

    pub fn to_command(&self, now: i64) -> Command {
        Command {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            command_type: self.command_type,
            action: self.action.to_action(),
            enabled: true,
            is_built_in: true,
            source: CommandSource::System,
            category: Some(self.category.to_string()),
            hotkeys: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

pub const BUILTIN_COMMANDS: &[BuiltinCommand] = &[
    // Navigation
    BuiltinCommand::new(
        "nav.dashboard",
        "Go to Dashboard",
        "Open the dashboard",
        CommandType::Navigation,
        "Navigation",
        BuiltinAction::Navigate("dashboard"),
    )
    .local("CommandOrControl+1"),
    BuiltinCommand::new(
        "nav.notes",
        "Go to Notes",
        "Open the notes list",
        CommandType::Navigation,
        "Navigation",
        BuiltinAction::Navigate("notes"),
    )
    .local("CommandOrControl+2"),
    BuiltinCommand::new(
        "nav.collections",
        "Go to Collections",
        "Open collections and folders",
        CommandType::Navigation,
        "Navigation",
        BuiltinAction::Navigate("collections"),
    )
    .local("CommandOrControl+3"),
    BuiltinCommand::new(
        "nav.agents",
        "Go to Agents",
        "Open the agent list",
        CommandType::Navigation,
        "Navigation",
        BuiltinAction::Navigate("agents"),
    ),
    BuiltinCommand::new(
        "nav.settings",
        "Open Settings",
        "Open application settings",
        CommandType::Navigation,
        "Navigation",
        BuiltinAction::Navigate("settings"),
    )
    .local("CommandOrControl+,"),
    // Application
    BuiltinCommand::new(
        "app.command-palette",
        "Command Palette",
        "Search and run any command",
        CommandType::Application,
        "Application",
        BuiltinAction::Toggle("commandPalette"),
    )
    .local("CommandOrControl+Shift+P"),
    BuiltinCommand::new(
        "app.toggle-sidebar",
        "Toggle Sidebar",
        "Show or hide the sidebar",
        CommandType::Application,
        "Application",
        BuiltinAction::Toggle("sidebar"),
    )
    .local("CommandOrControl+B"),
    BuiltinCommand::new(
        "app.toggle-theme",
        "Toggle Theme",
        "Switch between light and dark theme",
        CommandType::Application,
        "Application",
        BuiltinAction::Toggle("theme"),
    ),
    BuiltinCommand::new(
        "app.quick-capture",
        "Quick Capture",
        "Bring the app forward and start a new note from anywhere",
        CommandType::Application,
        "Application",
        BuiltinAction::Execute("quickCapture"),
    )
    .global("CommandOrControl+Shift+Space"),
    // Notes and collections
    BuiltinCommand::new(
        "crud.note.create",
        "New Note",
        "Create a note in the current collection",
        CommandType::Crud,
        "Notes",
        BuiltinAction::Execute("createNote"),
    )
    .local("CommandOrControl+N"),
    BuiltinCommand::new(
        "crud.collection.create",
        "New Collection",
        "Create a collection",
        CommandType::Crud,
        "Notes",
        BuiltinAction::Execute("createCollection"),
    ),
];
