//! # Pipeline Events
//!
//! Internal event model for pipeline lifecycle notifications, the Jenkins
//! wire format they are translated from, and the bus that fans them out.
//!
//! - `jenkins`: webhook payload types and translation
//! - `notifier`: [`EventNotifier`] and subscriber registration

pub mod jenkins;
pub mod notifier;

pub use jenkins::{
    JenkinsArtifact, JenkinsBuildState, JenkinsEvent, JenkinsInputState, JenkinsJobState,
    JenkinsTestState,
};
pub use notifier::{register_default_subscribers, EventHandlers, EventNotifier};

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("unknown Jenkins event type {0:?}")]
    UnknownType(String),

    #[error("malformed Jenkins event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Pipeline lifecycle moments published on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    #[serde(rename = "pipeline.started")]
    PipelineStarted,
    #[serde(rename = "pipeline.completed")]
    PipelineCompleted,
    #[serde(rename = "pipeline.finalized")]
    PipelineFinalized,
    #[serde(rename = "pipeline.input.started")]
    PipelineInputStarted,
    #[serde(rename = "pipeline.input.proceeded")]
    PipelineInputProceeded,
    #[serde(rename = "pipeline.input.aborted")]
    PipelineInputAborted,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::PipelineStarted,
        EventType::PipelineCompleted,
        EventType::PipelineFinalized,
        EventType::PipelineInputStarted,
        EventType::PipelineInputProceeded,
        EventType::PipelineInputAborted,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PipelineStarted => "pipeline.started",
            EventType::PipelineCompleted => "pipeline.completed",
            EventType::PipelineFinalized => "pipeline.finalized",
            EventType::PipelineInputStarted => "pipeline.input.started",
            EventType::PipelineInputProceeded => "pipeline.input.proceeded",
            EventType::PipelineInputAborted => "pipeline.input.aborted",
        }
    }

    /// Internal type for a Jenkins event type string
    #[must_use]
    pub fn from_jenkins(jenkins_type: &str) -> Option<Self> {
        match jenkins_type {
            "jenkins.job.started" => Some(EventType::PipelineStarted),
            "jenkins.job.completed" => Some(EventType::PipelineCompleted),
            "jenkins.job.finalized" => Some(EventType::PipelineFinalized),
            "jenkins.job.input.started" => Some(EventType::PipelineInputStarted),
            "jenkins.job.input.proceeded" => Some(EventType::PipelineInputProceeded),
            "jenkins.job.input.aborted" => Some(EventType::PipelineInputAborted),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline event, as handed to every subscriber
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Epoch milliseconds, as sent by Jenkins
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub args: EventArgs,
}

impl Event {
    /// `timestamp` as a UTC time, if it is in range
    pub fn time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventArgs {
    pub pipeline_state: PipelineState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    pub name: String,
    pub display_name: String,
    pub url: String,
    /// Jenkins folder, which is the project's admin namespace
    pub project_id: String,
    pub pipeline: String,
    pub build: Option<BuildState>,
    pub previous_completed_build: Option<BuildState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildState {
    pub artifacts: BTreeMap<String, Artifact>,
    pub full_url: String,
    pub number: i64,
    pub queue_id: i64,
    pub phase: String,
    pub timestamp: i64,
    pub status: String,
    pub url: String,
    pub display_name: String,
    pub parameters: BTreeMap<String, String>,
    pub test_state: Option<TestState>,
    pub review_state: Option<ReviewState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub archive: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestState {
    pub total: i64,
    pub failed: i64,
    pub passed: i64,
    pub skipped: i64,
}

/// A pending or answered `input` step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    pub id: String,
    pub message: String,
    pub submitter: String,
    pub proceed_text: String,
    pub approver: String,
}
