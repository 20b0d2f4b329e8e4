//! The scheduling unit (`ScheduledCommand`) and its outcome
//! (`CommandResult`) — the two halves of the data model (§3) that travel
//! between the gate, the priority queue, and the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::{Action, ParsedCommand};
use crate::types::{CommandId, ExecutionId, UserId};

/// An EXECUTE command awaiting or undergoing execution.
#[derive(Debug, Clone)]
pub struct ScheduledCommand {
    pub id: CommandId,
    pub execution_id: ExecutionId,
    pub user_id: UserId,
    /// 1 (highest) .. 3 (lowest).
    pub priority: u8,
    /// Monotonic-enough wall-clock milliseconds at enqueue time, used as the
    /// FIFO tiebreak within a priority class (I3).
    pub timestamp_ms: i64,
    pub parsed: ParsedCommand,
}

/// Public view of a command exposing only {action, requestedReplicas} —
/// never raw user text or identity (§4.8, Glossary: "Sanitized command").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedCommand {
    pub action: Option<Action>,
    #[serde(rename = "requestedReplicas", skip_serializing_if = "Option::is_none")]
    pub requested_replicas: Option<i64>,
}

impl From<&ScheduledCommand> for SanitizedCommand {
    fn from(cmd: &ScheduledCommand) -> Self {
        Self {
            action: cmd.parsed.action,
            requested_replicas: cmd.parsed.target_replicas,
        }
    }
}

/// Lifecycle status of a `ScheduledCommand`'s execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Pending,
    Running,
    Success,
    Failed,
}

/// Outcome of a command's execution. Created PENDING at dequeue, mutated
/// exactly once at completion (I4).
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub command_id: CommandId,
    pub status: CommandStatus,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CommandResult {
    pub fn pending(command_id: CommandId) -> Self {
        Self {
            command_id,
            status: CommandStatus::Pending,
            error: None,
            completed_at: None,
        }
    }

    pub fn running(command_id: CommandId) -> Self {
        Self {
            command_id,
            status: CommandStatus::Running,
            error: None,
            completed_at: None,
        }
    }

    pub fn success(command_id: CommandId) -> Self {
        Self {
            command_id,
            status: CommandStatus::Success,
            error: None,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn failed(command_id: CommandId, error: impl Into<String>) -> Self {
        Self {
            command_id,
            status: CommandStatus::Failed,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
        }
    }
}
