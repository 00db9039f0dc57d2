use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::Hotkey;

/// Free-form parameters passed through to the UI or to an agent.
pub type Params = Map<String, Value>;

/// Display/categorization tag. Never affects dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Navigation,
    Crud,
    Application,
    Agent,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Navigation => "navigation",
            CommandType::Crud => "crud",
            CommandType::Application => "application",
            CommandType::Agent => "agent",
        }
    }
}

impl FromStr for CommandType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "navigation" => Ok(CommandType::Navigation),
            "crud" => Ok(CommandType::Crud),
            "application" => Ok(CommandType::Application),
            "agent" => Ok(CommandType::Agent),
            _ => Err(format!(
                "Invalid command type '{}'. Must be one of: navigation, crud, application, agent",
                s
            )),
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a command definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    System,
    User,
    Plugin,
}

impl CommandSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandSource::System => "system",
            CommandSource::User => "user",
            CommandSource::Plugin => "plugin",
        }
    }
}

impl FromStr for CommandSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "system" => Ok(CommandSource::System),
            "user" => Ok(CommandSource::User),
            "plugin" => Ok(CommandSource::Plugin),
            _ => Err(format!(
                "Invalid command source '{}'. Must be one of: system, user, plugin",
                s
            )),
        }
    }
}

/// What executing a command does.
///
/// Persisted as an `action_type` string plus a JSON payload with the keys
/// `route`, `agentId` and `params`. Each variant only carries the keys it
/// reads.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    Navigate {
        route: Option<String>,
    },
    Toggle {
        params: Option<Params>,
    },
    Execute {
        params: Option<Params>,
    },
    AgentExecute {
        agent_id: Option<String>,
        params: Option<Params>,
    },
    /// A stored action type this build does not know about. Loading it
    /// succeeds; executing it fails.
    Unsupported {
        action_type: String,
    },
}

/// Wire form of the action payload.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    params: Option<Params>,
}

impl CommandAction {
    pub fn navigate(route: impl Into<String>) -> Self {
        CommandAction::Navigate {
            route: Some(route.into()),
        }
    }

    pub fn agent(agent_id: impl Into<String>) -> Self {
        CommandAction::AgentExecute {
            agent_id: Some(agent_id.into()),
            params: None,
        }
    }

    pub fn action_type(&self) -> &str {
        match self {
            CommandAction::Navigate { .. } => "navigate",
            CommandAction::Toggle { .. } => "toggle",
            CommandAction::Execute { .. } => "execute",
            CommandAction::AgentExecute { .. } => "agent-execute",
            CommandAction::Unsupported { action_type } => action_type,
        }
    }

    /// The JSON payload stored next to `action_type`.
    pub fn payload(&self) -> Value {
        let payload = match self.clone() {
            CommandAction::Navigate { route } => ActionPayload {
                route,
                ..Default::default()
            },
            CommandAction::Toggle { params } | CommandAction::Execute { params } => {
                ActionPayload {
                    params,
                    ..Default::default()
                }
            }
            CommandAction::AgentExecute { agent_id, params } => ActionPayload {
                agent_id,
                params,
                ..Default::default()
            },
            CommandAction::Unsupported { .. } => ActionPayload::default(),
        };
        serde_json::to_value(payload).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Rebuild an action from its stored `(action_type, payload)` pair.
    /// Unknown action types load as `Unsupported`; a payload whose known
    /// keys have the wrong shape is an error.
    pub fn from_parts(action_type: &str, payload: Value) -> Result<Self, serde_json::Error> {
        let payload: ActionPayload = if payload.is_null() {
            ActionPayload::default()
        } else {
            serde_json::from_value(payload)?
        };

        Ok(match action_type {
            "navigate" => CommandAction::Navigate {
                route: payload.route,
            },
            "toggle" => CommandAction::Toggle {
                params: payload.params,
            },
            "execute" => CommandAction::Execute {
                params: payload.params,
            },
            "agent-execute" => CommandAction::AgentExecute {
                agent_id: payload.agent_id,
                params: payload.params,
            },
            other => CommandAction::Unsupported {
                action_type: other.to_string(),
            },
        })
    }
}

impl Serialize for CommandAction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("actionType", self.action_type())?;
        map.serialize_entry("actionPayload", &self.payload())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for CommandAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Parts {
            action_type: String,
            #[serde(default)]
            action_payload: Value,
        }

        let parts = Parts::deserialize(deserializer)?;
        CommandAction::from_parts(&parts.action_type, parts.action_payload)
            .map_err(serde::de::Error::custom)
    }
}

/// A named, executable action with its hotkey bindings attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(flatten)]
    pub action: CommandAction,
    pub enabled: bool,
    pub is_built_in: bool,
    pub source: CommandSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub hotkeys: Vec<Hotkey>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Command {
    pub fn global_hotkeys(&self) -> impl Iterator<Item = &Hotkey> {
        self.hotkeys.iter().filter(|h| h.is_global)
    }
}

/// Input for `CommandRegistry::create_command`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCommand {
    pub name: String,
    pub description: Option<String>,
    pub command_type: CommandType,
    pub action: CommandAction,
    pub category: Option<String>,
    /// Defaults to `CommandSource::User`
    pub source: Option<CommandSource>,
    /// Defaults to `true`
    pub enabled: Option<bool>,
}

impl NewCommand {
    pub fn new(name: impl Into<String>, command_type: CommandType, action: CommandAction) -> Self {
        Self {
            name: name.into(),
            description: None,
            command_type,
            action,
            category: None,
            source: None,
            enabled: None,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub action: Option<CommandAction>,
    pub category: Option<String>,
}

impl CommandPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.enabled.is_none()
            && self.action.is_none()
            && self.category.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandFilter {
    pub command_type: Option<CommandType>,
    pub enabled: Option<bool>,
}

impl CommandFilter {
    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_parts_roundtrip_keeps_only_used_keys() {
        let action = CommandAction::from_parts(
            "agent-execute",
            json!({"agentId": "summarizer", "route": "ignored", "params": {"tone": "brief"}}),
        )
        .unwrap();

        assert_eq!(action.action_type(), "agent-execute");
        assert_eq!(
            action.payload(),
            json!({"agentId": "summarizer", "params": {"tone": "brief"}})
        );
    }

    #[test]
    fn test_unknown_action_type_loads_as_unsupported() {
        let action = CommandAction::from_parts("teleport", json!({})).unwrap();
        assert_eq!(
            action,
            CommandAction::Unsupported {
                action_type: "teleport".to_string()
            }
        );
        assert_eq!(action.action_type(), "teleport");
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        assert!(CommandAction::from_parts("navigate", json!({"route": 42})).is_err());
    }

    #[test]
    fn test_command_serializes_flat_action_fields() {
        let command = Command {
            id: "nav.settings".to_string(),
            name: "Open Settings".to_string(),
            description: None,
            command_type: CommandType::Navigation,
            action: CommandAction::navigate("settings"),
            enabled: true,
            is_built_in: true,
            source: CommandSource::System,
            category: Some("Navigation".to_string()),
            hotkeys: Vec::new(),
            created_at: 1,
            updated_at: 1,
        };

        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["type"], "navigation");
        assert_eq!(value["actionType"], "navigate");
        assert_eq!(value["actionPayload"], json!({"route": "settings"}));
        assert_eq!(value["isBuiltIn"], true);

        let parsed: Command = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, command);
    }

    #[test]
    fn test_command_type_parse() {
        assert_eq!("crud".parse::<CommandType>().unwrap(), CommandType::Crud);
        assert!("macro".parse::<CommandType>().is_err());
        assert_eq!("plugin".parse::<CommandSource>().unwrap(), CommandSource::Plugin);
    }
}
