//! Agent orchestration seam used by `agent-execute` commands.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::ExecutionResult;

/// Input handed to an agent: `noteId`, `selectedText` and any extra params.
pub type AgentInput = Map<String, Value>;

/// What an agent run reported. Relayed to the caller unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<AgentOutcome> for ExecutionResult {
    fn from(outcome: AgentOutcome) -> Self {
        ExecutionResult {
            success: outcome.success,
            output: outcome.output,
            error: outcome.error,
        }
    }
}

#[async_trait]
pub trait AgentOrchestrator: Send + Sync {
    async fn execute_agent(&self, agent_id: &str, input: AgentInput) -> Result<AgentOutcome>;
}

/// Orchestrator for hosts that run without any agent runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableOrchestrator;

#[async_trait]
impl AgentOrchestrator for UnavailableOrchestrator {
    async fn execute_agent(&self, agent_id: &str, _input: AgentInput) -> Result<AgentOutcome> {
        anyhow::bail!("No agent orchestrator available to run agent: {}", agent_id)
    }
}
