//! # Event Bus Integration Tests
//!
//! Jenkins payload translation and delivery through the notifier.

use devops_controller::events::{
    Artifact, BuildState, EventHandlers, EventNotifier, EventType, JenkinsEvent, JenkinsJobState,
    PipelineState, ReviewState, TestState,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const STARTED_EVENT: &str = r##"{
  "type": "jenkins.job.started",
  "timestamp": 1582530838425,
  "data": {
    "_class": "org.jenkinsci.plugins.workflow.job.WorkflowJob",
    "displayName": "artifacts_test",
    "name": "artifacts_test",
    "url": "job/folder/job/artifacts_test/",
    "build": {
      "_class": "org.jenkinsci.plugins.workflow.job.WorkflowRun",
      "artifacts": {
        "report.xml": { "archive": "artifacts/report.xml" }
      },
      "fullUrl": "http://jenkins/job/folder/job/artifacts_test/7/",
      "number": 7,
      "queueId": 42,
      "phase": "STARTED",
      "timestamp": 1582530838400,
      "status": "SUCCESS",
      "url": "job/folder/job/artifacts_test/7/",
      "displayName": "#7",
      "parameters": { "BRANCH": "main" },
      "testSummary": { "total": 10, "failed": 1, "passed": 8, "skipped": 1 },
      "inputState": {
        "id": "Deploy",
        "message": "Ship it?",
        "submitter": "admin",
        "proceedText": "Proceed",
        "approver": "admin"
      }
    },
    "previousCompletedBuild": {
      "number": 6,
      "status": "FAILURE",
      "phase": "FINALIZED"
    }
  }
}"##;

#[test]
fn test_started_event_translates_field_for_field() {
    let event = JenkinsEvent::from_slice(STARTED_EVENT.as_bytes())
        .unwrap()
        .to_event()
        .unwrap();

    assert_eq!(event.event_type, EventType::PipelineStarted);
    assert_eq!(event.timestamp, 1_582_530_838_425);

    let expected = PipelineState {
        name: "artifacts_test".to_string(),
        display_name: "artifacts_test".to_string(),
        url: "job/folder/job/artifacts_test/".to_string(),
        project_id: "folder".to_string(),
        pipeline: "artifacts_test".to_string(),
        build: Some(BuildState {
            artifacts: BTreeMap::from([(
                "report.xml".to_string(),
                Artifact {
                    archive: "artifacts/report.xml".to_string(),
                },
            )]),
            full_url: "http://jenkins/job/folder/job/artifacts_test/7/".to_string(),
            number: 7,
            queue_id: 42,
            phase: "STARTED".to_string(),
            timestamp: 1_582_530_838_400,
            status: "SUCCESS".to_string(),
            url: "job/folder/job/artifacts_test/7/".to_string(),
            display_name: "#7".to_string(),
            parameters: BTreeMap::from([("BRANCH".to_string(), "main".to_string())]),
            test_state: Some(TestState {
                total: 10,
                failed: 1,
                passed: 8,
                skipped: 1,
            }),
            review_state: Some(ReviewState {
                id: "Deploy".to_string(),
                message: "Ship it?".to_string(),
                submitter: "admin".to_string(),
                proceed_text: "Proceed".to_string(),
                approver: "admin".to_string(),
            }),
        }),
        previous_completed_build: Some(BuildState {
            number: 6,
            status: "FAILURE".to_string(),
            phase: "FINALIZED".to_string(),
            ..BuildState::default()
        }),
    };
    assert_eq!(event.args.pipeline_state, expected);
}

#[test]
fn test_url_without_one_folder_level_gives_empty_state() {
    for url in [
        "",
        "job/artifacts_test/",
        "job/a/job/b/job/c/",
        "not-a-jenkins-url",
    ] {
        let job = JenkinsJobState {
            name: "artifacts_test".to_string(),
            url: url.to_string(),
            ..JenkinsJobState::default()
        };
        assert_eq!(job.to_pipeline_state(), PipelineState::default(), "url {url:?}");
    }
}

#[test]
fn test_unknown_jenkins_type_is_rejected() {
    let body = STARTED_EVENT.replace("jenkins.job.started", "jenkins.job.deleted");
    let err = JenkinsEvent::from_slice(body.as_bytes())
        .unwrap()
        .to_event()
        .unwrap_err();
    assert!(err.to_string().contains("jenkins.job.deleted"));
}

#[test]
fn test_every_handler_sees_started_event_in_registration_order() {
    let notifier = EventNotifier::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for id in 1..=3 {
        let seen = seen.clone();
        notifier.register_event_handler(EventHandlers::new().on_pipeline_started(move |e| {
            seen.lock().unwrap().push((id, e.clone()));
        }));
    }
    let event = JenkinsEvent::from_slice(STARTED_EVENT.as_bytes())
        .unwrap()
        .to_event()
        .unwrap();

    notifier.notify(&event);

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(seen.iter().all(|(_, e)| *e == event));
}

#[test]
fn test_handlers_for_other_types_are_not_called() {
    let notifier = EventNotifier::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let started = calls.clone();
    let completed = calls.clone();
    notifier.register_event_handler(
        EventHandlers::new()
            .on_pipeline_started(move |_| started.lock().unwrap().push("started"))
            .on_pipeline_completed(move |_| completed.lock().unwrap().push("completed")),
    );
    let mut event = JenkinsEvent::from_slice(STARTED_EVENT.as_bytes())
        .unwrap()
        .to_event()
        .unwrap();
    event.event_type = EventType::PipelineCompleted;

    notifier.notify(&event);

    assert_eq!(*calls.lock().unwrap(), vec!["completed"]);
}
