use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Params;

/// Caller-supplied context for an execution (the open note, the current
/// selection, free-form parameters).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
}

impl ExecutionContext {
    /// Input map handed to an agent: `noteId`, `selectedText`, then the
    /// context params spread over the top.
    pub fn into_agent_input(self) -> Map<String, Value> {
        let mut input = Map::new();
        if let Some(note_id) = self.note_id {
            input.insert("noteId".to_string(), Value::String(note_id));
        }
        if let Some(selected_text) = self.selected_text {
            input.insert("selectedText".to_string(), Value::String(selected_text));
        }
        if let Some(params) = self.params {
            input.extend(params);
        }
        input
    }
}

/// Uniform outcome of "doing a thing". Execution never reports failure any
/// other way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}
