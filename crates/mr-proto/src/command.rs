//! Command envelopes carried on broker queues and channels.
//!
//! [`Command`] keeps a minimal shape — one optional `job_uuid` payload
//! field, everything else routed by name — so an unrecognized `command`
//! string still deserializes instead of failing the whole message;
//! unknown commands are simply logged and ignored by every node.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A command dict as it travels the wire: `{"command": "...", "job_uuid": "..."}`.
/// Two envelopes compare equal by field value, not by serialized byte
/// order, which is what the broker's "remove by logical equality"
/// contract for queue removal relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_uuid: Option<Uuid>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Command { command: name.into(), job_uuid: None }
    }

    pub fn with_job(name: impl Into<String>, job_uuid: Uuid) -> Self {
        Command { command: name.into(), job_uuid: Some(job_uuid) }
    }

    pub fn process_job(job_uuid: Uuid) -> Self {
        Self::with_job(CommandName::ProcessJob.as_str(), job_uuid)
    }

    pub fn complete_job(job_uuid: Uuid) -> Self {
        Self::with_job(CommandName::CompleteJob.as_str(), job_uuid)
    }

    pub fn kill_job(job_uuid: Uuid) -> Self {
        Self::with_job(CommandName::KillJob.as_str(), job_uuid)
    }

    pub fn update_status() -> Self {
        Self::new(CommandName::UpdateStatus.as_str())
    }

    pub fn stop_processing_queue() -> Self {
        Self::new(CommandName::StopProcessingQueue.as_str())
    }

    pub fn stop_processing_channels() -> Self {
        Self::new(CommandName::StopProcessingChannels.as_str())
    }

    /// The known variant this envelope's `command` field names, or `None`
    /// for a forward-compatible unknown verb.
    pub fn name(&self) -> Option<CommandName> {
        CommandName::parse(&self.command)
    }
}

/// The fixed command vocabulary. A `Command` whose `command` field
/// doesn't match any of these is still a valid, decodable message — just
/// one with `name() == None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    ProcessJob,
    CompleteJob,
    KillJob,
    UpdateStatus,
    StopProcessingQueue,
    StopProcessingChannels,
}

impl CommandName {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::ProcessJob => "PROCESS_JOB",
            CommandName::CompleteJob => "COMPLETE_JOB",
            CommandName::KillJob => "KILL_JOB",
            CommandName::UpdateStatus => "UPDATE_STATUS",
            CommandName::StopProcessingQueue => "STOP_PROCESSING_QUEUE",
            CommandName::StopProcessingChannels => "STOP_PROCESSING_CHANNELS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "PROCESS_JOB" => CommandName::ProcessJob,
            "COMPLETE_JOB" => CommandName::CompleteJob,
            "KILL_JOB" => CommandName::KillJob,
            "UPDATE_STATUS" => CommandName::UpdateStatus,
            "STOP_PROCESSING_QUEUE" => CommandName::StopProcessingQueue,
            "STOP_PROCESSING_CHANNELS" => CommandName::StopProcessingChannels,
            _ => return None,
        })
    }
}

impl std::fmt::Display for CommandName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_still_decodes() {
        let json = r#"{"command":"FUTURE_VERB","job_uuid":null}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(command.name(), None);
        assert_eq!(command.command, "FUTURE_VERB");
    }

    #[test]
    fn process_job_round_trips_and_carries_uuid() {
        let uuid = Uuid::new_v4();
        let command = Command::process_job(uuid);
        let encoded = serde_json::to_string(&command).unwrap();
        let decoded: Command = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(decoded.name(), Some(CommandName::ProcessJob));
        assert_eq!(decoded.job_uuid, Some(uuid));
    }

    #[test]
    fn envelopes_without_job_uuid_omit_the_field_on_the_wire() {
        let encoded = serde_json::to_string(&Command::update_status()).unwrap();
        assert_eq!(encoded, r#"{"command":"UPDATE_STATUS"}"#);
    }

    #[test]
    fn equality_is_by_field_not_serialized_form() {
        let a = Command::new("STOP_PROCESSING_QUEUE");
        let b: Command = serde_json::from_str(r#"{"job_uuid":null,"command":"STOP_PROCESSING_QUEUE"}"#).unwrap();
        assert_eq!(a, b);
    }
}
