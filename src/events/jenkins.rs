//! Jenkins webhook payloads and their translation into [`Event`]s.
//!
//! Missing fields default to empty values; Jenkins omits most of them for
//! queued or running builds.

use super::{
    Artifact, BuildState, Event, EventArgs, EventError, EventType, PipelineState, ReviewState,
    TestState,
};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JenkinsEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: i64,
    pub data: JenkinsJobState,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JenkinsJobState {
    pub name: String,
    pub display_name: String,
    /// Job path such as `job/<folder>/job/<pipeline>/`
    pub url: String,
    pub build: Option<JenkinsBuildState>,
    pub previous_completed_build: Option<JenkinsBuildState>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JenkinsBuildState {
    pub artifacts: BTreeMap<String, JenkinsArtifact>,
    pub full_url: String,
    pub number: i64,
    pub queue_id: i64,
    pub phase: String,
    pub timestamp: i64,
    pub status: String,
    pub url: String,
    pub display_name: String,
    pub parameters: BTreeMap<String, String>,
    pub test_summary: Option<JenkinsTestState>,
    pub input_state: Option<JenkinsInputState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JenkinsArtifact {
    pub archive: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JenkinsTestState {
    pub total: i64,
    pub failed: i64,
    pub passed: i64,
    pub skipped: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JenkinsInputState {
    pub id: String,
    pub message: String,
    pub submitter: String,
    pub proceed_text: String,
    pub approver: String,
}

impl JenkinsEvent {
    /// Decode a webhook body
    ///
    /// # Errors
    /// Returns [`EventError::Decode`] if the body is not a Jenkins event document
    pub fn from_slice(body: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Translate into the internal event model
    ///
    /// # Errors
    /// Returns [`EventError::UnknownType`] for event types outside the pipeline lifecycle
    pub fn to_event(&self) -> Result<Event, EventError> {
        let event_type = EventType::from_jenkins(&self.event_type)
            .ok_or_else(|| EventError::UnknownType(self.event_type.clone()))?;
        Ok(Event {
            timestamp: self.timestamp,
            event_type,
            args: EventArgs {
                pipeline_state: self.data.to_pipeline_state(),
            },
        })
    }
}

impl JenkinsJobState {
    /// Project and pipeline are recovered from the job URL. Any URL that is
    /// not exactly one folder deep yields an empty state.
    pub fn to_pipeline_state(&self) -> PipelineState {
        let segments: Vec<&str> = self.url.split("job/").collect();
        let [_, project_id, pipeline] = segments.as_slice() else {
            return PipelineState::default();
        };
        PipelineState {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            url: self.url.clone(),
            project_id: project_id.trim_end_matches('/').to_string(),
            pipeline: pipeline.trim_end_matches('/').to_string(),
            build: self.build.as_ref().map(JenkinsBuildState::to_build_state),
            previous_completed_build: self
                .previous_completed_build
                .as_ref()
                .map(JenkinsBuildState::to_build_state),
        }
    }
}

impl JenkinsBuildState {
    pub fn to_build_state(&self) -> BuildState {
        BuildState {
            artifacts: self
                .artifacts
                .iter()
                .map(|(name, a)| {
                    (
                        name.clone(),
                        Artifact {
                            archive: a.archive.clone(),
                        },
                    )
                })
                .collect(),
            full_url: self.full_url.clone(),
            number: self.number,
            queue_id: self.queue_id,
            phase: self.phase.clone(),
            timestamp: self.timestamp,
            status: self.status.clone(),
            url: self.url.clone(),
            display_name: self.display_name.clone(),
            parameters: self.parameters.clone(),
            test_state: self.test_summary.as_ref().map(|t| TestState {
                total: t.total,
                failed: t.failed,
                passed: t.passed,
                skipped: t.skipped,
            }),
            review_state: self.input_state.as_ref().map(|i| ReviewState {
                id: i.id.clone(),
                message: i.message.clone(),
                submitter: i.submitter.clone(),
                proceed_text: i.proceed_text.clone(),
                approver: i.approver.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(url: &str) -> JenkinsJobState {
        JenkinsJobState {
            name: "artifacts_test".to_string(),
            url: url.to_string(),
            ..JenkinsJobState::default()
        }
    }

    #[test]
    fn test_full_url_splits_into_project_and_pipeline() {
        let state = job("http://jenkins.local/job/demo7x9kq/job/build/").to_pipeline_state();
        assert_eq!(state.project_id, "demo7x9kq");
        assert_eq!(state.pipeline, "build");
    }

    #[test]
    fn test_nested_folder_yields_empty_state() {
        let state = job("job/a/job/b/job/c/").to_pipeline_state();
        assert_eq!(state, PipelineState::default());
        assert_eq!(job("").to_pipeline_state(), PipelineState::default());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let event = JenkinsEvent {
            event_type: "jenkins.job.deleted".to_string(),
            ..JenkinsEvent::default()
        };
        assert!(matches!(
            event.to_event(),
            Err(EventError::UnknownType(t)) if t == "jenkins.job.deleted"
        ));
    }

    #[test]
    fn test_input_state_becomes_review_state() {
        let build = JenkinsBuildState {
            input_state: Some(JenkinsInputState {
                id: "approve".to_string(),
                message: "Deploy?".to_string(),
                ..JenkinsInputState::default()
            }),
            ..JenkinsBuildState::default()
        };
        let review = build.to_build_state().review_state.unwrap();
        assert_eq!(review.id, "approve");
        assert_eq!(review.message, "Deploy?");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            JenkinsEvent::from_slice(b"not json"),
            Err(EventError::Decode(_))
        ));
    }
}
