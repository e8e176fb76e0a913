//! 分诊工作流集成测试

use std::sync::Arc;
use std::time::Duration;

use carepath::config::AppConfig;
use carepath::core::{
    spawn_driver, Command, ConsultationOutcome, StepOutcome, WorkflowError, WorkflowStage,
};
use carepath::gateway::{Capability, CapabilityRegistry, MockAgentTransport, MockReply};
use carepath::history::{FileKvStore, HistoryLedger, KvStore, MemoryKvStore};
use carepath::triage::{Gender, IntakeForm};
use carepath::{CareClient, ClientBuilder};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn chest_pain_form() -> IntakeForm {
    IntakeForm {
        age: "34".into(),
        gender: Some(Gender::Female),
        existing_conditions: String::new(),
        symptoms: "chest pain, shortness of breath".into(),
        duration: "2 hours".into(),
        severity: 8,
    }
}

fn critical_triage() -> Value {
    json!({
        "assessment_id": "A-CRIT-1",
        "patient_summary": {
            "red_flags": { "red_flag_detected": true, "severity": "CRITICAL" },
            "risk_assessment": { "risk_score": 92, "urgency_level": "CRITICAL" },
            "specialist_recommendations": {
                "primary_specialist": { "specialty": "Cardiology", "reason": "Suspected ACS" }
            }
        },
        "comprehensive_summary": "Possible acute coronary syndrome"
    })
}

fn agent(capability: Capability) -> String {
    CapabilityRegistry::default().id(capability).to_string()
}

fn client_with(mock: &MockAgentTransport) -> CareClient {
    ClientBuilder::new(AppConfig::default())
        .with_transport(Arc::new(mock.clone()))
        .with_store(Arc::new(MemoryKvStore::new()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_critical_assessment_is_recorded_and_advances() {
    let mock = MockAgentTransport::new();
    mock.on(&agent(Capability::Triage), MockReply::ok(critical_triage()));
    let client = client_with(&mock);

    let outcome = client.workflow().submit_assessment(chest_pain_form()).await.unwrap();
    assert_eq!(outcome, StepOutcome::Completed);

    let snapshot = client.workflow().snapshot().await;
    assert_eq!(snapshot.stage, WorkflowStage::Assessed);
    let triage = snapshot.triage.unwrap();
    assert!(triage.red_flag_detected());
    assert_eq!(triage.risk_score(), 92);
    assert_eq!(
        serde_json::to_value(&triage).unwrap()["assessment_id"],
        "A-CRIT-1"
    );

    let history = client.workflow().history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].urgency_level, "CRITICAL");
    assert_eq!(history[0].risk_score, 92);
    assert_eq!(history[0].intake, chest_pain_form());

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].message,
        "Patient age 34, gender female.\nExisting conditions: None.\nSymptoms: chest pain, shortness of breath.\nDuration: 2 hours.\nSeverity: 8/10."
    );
}

#[tokio::test]
async fn test_wrapped_triage_envelope_is_unwrapped() {
    let raw_text = format!(
        "Here is the assessment.\n```json\n{}\n```\nStay safe.",
        json!({ "result": critical_triage() })
    );
    let mock = MockAgentTransport::new();
    mock.on(
        &agent(Capability::Triage),
        MockReply::ok(json!({ "status": "success", "result": { "raw_text": raw_text } })),
    );
    let client = client_with(&mock);

    client.workflow().submit_assessment(chest_pain_form()).await.unwrap();
    let snapshot = client.workflow().snapshot().await;
    assert_eq!(snapshot.stage, WorkflowStage::Assessed);
    assert_eq!(snapshot.triage.unwrap().urgency_level(), "CRITICAL");
}

#[tokio::test]
async fn test_unrecognized_payload_leaves_intake_untouched() {
    let mock = MockAgentTransport::new();
    mock.on(&agent(Capability::Triage), MockReply::ok(json!(["not", "an", "object"])));
    let client = client_with(&mock);

    let err = client
        .workflow()
        .submit_assessment(chest_pain_form())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Normalization(_)));

    let snapshot = client.workflow().snapshot().await;
    assert_eq!(snapshot.stage, WorkflowStage::Intake);
    assert!(snapshot.triage.is_none());
    assert!(snapshot.last_error.is_some());
    assert!(client.workflow().history().await.is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_surfaced_and_retryable() {
    let mock = MockAgentTransport::new();
    mock.on(&agent(Capability::Triage), MockReply::failed("HTTP 502: bad gateway"));
    let client = client_with(&mock);

    let err = client
        .workflow()
        .submit_assessment(chest_pain_form())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(client.workflow().snapshot().await.stage, WorkflowStage::Intake);

    // 手动重试
    mock.on(&agent(Capability::Triage), MockReply::ok(critical_triage()));
    client.workflow().submit_assessment(chest_pain_form()).await.unwrap();
    assert_eq!(client.workflow().snapshot().await.stage, WorkflowStage::Assessed);
    assert_eq!(mock.call_count(&agent(Capability::Triage)), 2);
}

#[tokio::test]
async fn test_partial_consultation_keeps_the_successful_half() {
    let mock = MockAgentTransport::new();
    mock.on(&agent(Capability::Triage), MockReply::ok(critical_triage()));
    mock.on(
        &agent(Capability::VideoProvisioning),
        MockReply::ok(json!({ "room_id": "room-7", "room_url": "https://video.example.org/room-7" })),
    );
    mock.on(
        &agent(Capability::InsuranceVerification),
        MockReply::failed("payer unreachable"),
    );
    let client = client_with(&mock);
    client.workflow().submit_assessment(chest_pain_form()).await.unwrap();

    let outcome = client.workflow().start_consultation().await.unwrap();
    let ConsultationOutcome::Settled(report) = outcome else {
        panic!("expected settled consultation");
    };
    assert!(report.video_error.is_none());
    assert!(matches!(
        report.insurance_error,
        Some(WorkflowError::Transport { capability: Capability::InsuranceVerification, .. })
    ));

    let snapshot = client.workflow().snapshot().await;
    assert_eq!(snapshot.stage, WorkflowStage::Consultation);
    assert_eq!(snapshot.video_room.unwrap().room_id, "room-7");
    assert!(snapshot.insurance.is_none());
    assert!(snapshot.last_error.unwrap().contains("payer unreachable"));

    // 视频与保险使用同一个患者编号
    let calls = mock.calls();
    let insurance_call = calls
        .iter()
        .find(|c| c.agent_id == agent(Capability::InsuranceVerification))
        .unwrap();
    assert!(insurance_call.message.contains(&report.patient_id));
}

#[tokio::test(start_paused = true)]
async fn test_consultation_waits_for_slow_call_without_blocking_the_other() {
    let mock = MockAgentTransport::new();
    mock.on(&agent(Capability::Triage), MockReply::ok(critical_triage()));
    mock.on(
        &agent(Capability::VideoProvisioning),
        MockReply::ok(json!({ "room_id": "room-fast" })),
    );
    mock.on(
        &agent(Capability::InsuranceVerification),
        MockReply::ok(json!({ "coverage_status": "ACTIVE" })).with_delay(Duration::from_secs(10)),
    );
    let client = client_with(&mock);
    client.workflow().submit_assessment(chest_pain_form()).await.unwrap();

    let mut rx = client.workflow().subscribe();
    let workflow = client.workflow().clone();
    let pending = tokio::spawn(async move { workflow.start_consultation().await });

    // 视频结果先到即被缓存，此时阶段尚未切换
    let early = rx.wait_for(|s| s.video_room.is_some()).await.unwrap().clone();
    assert!(early.insurance.is_none());
    assert!(early.busy.consultation);
    assert_eq!(early.stage, WorkflowStage::Assessed);

    let outcome = pending.await.unwrap().unwrap();
    assert!(matches!(outcome, ConsultationOutcome::Settled(ref r) if r.fully_succeeded()));
    assert_eq!(client.workflow().snapshot().await.stage, WorkflowStage::Consultation);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_submission_while_busy_is_a_no_op() {
    let mock = MockAgentTransport::new();
    mock.on(
        &agent(Capability::Triage),
        MockReply::ok(critical_triage()).with_delay(Duration::from_secs(5)),
    );
    let client = client_with(&mock);
    let mut rx = client.workflow().subscribe();

    let workflow = client.workflow().clone();
    let first = tokio::spawn(async move { workflow.submit_assessment(chest_pain_form()).await });
    rx.wait_for(|s| s.busy.assessment).await.unwrap();

    let before = client.workflow().snapshot().await;
    let second = client.workflow().submit_assessment(chest_pain_form()).await.unwrap();
    assert_eq!(second, StepOutcome::Busy);
    let after = client.workflow().snapshot().await;
    assert_eq!(before.stage, after.stage);
    assert!(after.triage.is_none());
    assert_eq!(mock.call_count(&agent(Capability::Triage)), 1);

    assert_eq!(first.await.unwrap().unwrap(), StepOutcome::Completed);
    assert_eq!(mock.call_count(&agent(Capability::Triage)), 1);
    assert_eq!(client.workflow().history().await.len(), 1);
}

#[tokio::test]
async fn test_go_back_keeps_every_cached_result() {
    let mock = MockAgentTransport::demo(&CapabilityRegistry::default());
    let client = client_with(&mock);
    let workflow = client.workflow();

    workflow.submit_assessment(chest_pain_form()).await.unwrap();
    workflow.lookup_facilities().await.unwrap();
    workflow.start_consultation().await.unwrap();
    let before = workflow.snapshot().await;
    let calls_before = mock.calls().len();

    for stage in [
        WorkflowStage::Routed,
        WorkflowStage::Assessed,
        WorkflowStage::Intake,
        WorkflowStage::Consultation,
    ] {
        workflow.go_back(stage).await;
        let now = workflow.snapshot().await;
        assert_eq!(now.stage, stage);
        assert_eq!(now.triage, before.triage);
        assert_eq!(now.location, before.location);
        assert_eq!(now.video_room, before.video_room);
        assert_eq!(now.insurance, before.insurance);
    }
    assert_eq!(mock.calls().len(), calls_before);
}

#[tokio::test]
async fn test_history_survives_across_clients_with_file_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let mock = MockAgentTransport::new();
    mock.on(&agent(Capability::Triage), MockReply::ok(critical_triage()));

    for _ in 0..2 {
        let client = ClientBuilder::new(AppConfig::default())
            .with_transport(Arc::new(mock.clone()))
            .with_store(Arc::new(FileKvStore::new(dir.path())))
            .build()
            .unwrap();
        client.workflow().submit_assessment(chest_pain_form()).await.unwrap();
    }

    let store: Arc<dyn KvStore> = Arc::new(FileKvStore::new(dir.path()));
    let ledger = HistoryLedger::new(store, "assessmentHistory");
    assert_eq!(ledger.read_all().await.len(), 2);
}

#[tokio::test]
async fn test_read_all_on_empty_storage_is_empty() {
    let ledger = HistoryLedger::new(Arc::new(MemoryKvStore::new()), "assessmentHistory");
    assert!(ledger.read_all().await.is_empty());
}

#[tokio::test]
async fn test_driver_runs_commands_and_publishes_snapshots() {
    let mock = MockAgentTransport::demo(&CapabilityRegistry::default());
    let client = client_with(&mock);
    let shutdown = CancellationToken::new();
    let mut handle = spawn_driver(&client, shutdown.clone());

    handle
        .commands
        .send(Command::SubmitAssessment(chest_pain_form()))
        .unwrap();
    handle
        .snapshots
        .wait_for(|s| s.stage == WorkflowStage::Assessed)
        .await
        .unwrap();

    handle.commands.send(Command::LookupFacilities).unwrap();
    handle
        .snapshots
        .wait_for(|s| s.stage == WorkflowStage::Routed)
        .await
        .unwrap();

    handle.commands.send(Command::OpenAssistant).unwrap();
    handle
        .commands
        .send(Command::SendAssistant("how do I start a video call?".into()))
        .unwrap();
    handle.transcript.wait_for(|t| t.len() == 2).await.unwrap();
    assert!(handle.snapshots.borrow().overlays.assistant_open);

    handle.commands.send(Command::CloseOverlay).unwrap();
    handle
        .snapshots
        .wait_for(|s| !s.overlays.assistant_open)
        .await
        .unwrap();

    shutdown.cancel();
    handle.task.await.unwrap();
    assert!(handle.commands.send(Command::LookupFacilities).is_err());
}

#[tokio::test]
async fn test_driver_stops_on_quit() {
    let mock = MockAgentTransport::demo(&CapabilityRegistry::default());
    let client = client_with(&mock);
    let shutdown = CancellationToken::new();
    let handle = spawn_driver(&client, shutdown.clone());

    handle.commands.send(Command::OpenHistory).unwrap();
    handle.commands.send(Command::Quit).unwrap();
    handle.task.await.unwrap();

    // 循环已退出：命令通道关闭，令牌未被触发
    assert!(handle.commands.send(Command::LookupFacilities).is_err());
    assert!(!shutdown.is_cancelled());
    assert!(handle.snapshots.borrow().overlays.history_view);
    assert!(mock.calls().is_empty());
}
