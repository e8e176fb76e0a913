//! 工作流状态机
//!
//! Intake → Assessed → Routed → Consultation，可随时 go_back 到任一阶段。
//! 状态只经由本类型的方法读写；每次变更后向 watch 通道发布快照。
//!
//! 锁只在读写状态时短暂持有，绝不跨越网关调用：
//! 1. 持锁检查在途标志与阶段，置位在途标志并记下导航纪元；
//! 2. 释放锁后调用网关并归一化；
//! 3. 再次持锁写缓存、清标志；仅当导航纪元未变时推进阶段（推进本身也会递增纪元）。

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, RwLock};

use crate::core::prompts::{
    assessment_instruction, facility_instruction, insurance_instruction, new_patient_id,
    video_room_instruction, GENERAL_SPECIALTY,
};
use crate::core::state::{BusyFlags, Overlays, StepOutcome, WorkflowSnapshot, WorkflowStage};
use crate::core::WorkflowError;
use crate::gateway::{AgentGateway, Capability};
use crate::history::{HistoryLedger, HistoryRecord};
use crate::normalize::normalize_as;
use crate::triage::{InsuranceResult, IntakeForm, LocationResult, TriageResult, VideoRoomResult};

/// start_consultation 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ConsultationOutcome {
    /// 上一次问诊请求仍在途，本次被忽略
    Busy,
    /// 两个调用都已落定（各自成功或失败）
    Settled(ConsultationReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationReport {
    pub patient_id: String,
    pub video_error: Option<WorkflowError>,
    pub insurance_error: Option<WorkflowError>,
}

impl ConsultationReport {
    pub fn fully_succeeded(&self) -> bool {
        self.video_error.is_none() && self.insurance_error.is_none()
    }
}

#[derive(Debug, Default)]
struct WorkflowState {
    stage: WorkflowStage,
    overlays: Overlays,
    busy: BusyFlags,
    /// go_back 或阶段推进时递增；晚到的结果照常缓存，但纪元变了就不再推进阶段
    nav_epoch: u64,
    triage: Option<TriageResult>,
    location: Option<LocationResult>,
    video_room: Option<VideoRoomResult>,
    insurance: Option<InsuranceResult>,
    last_error: Option<String>,
}

impl WorkflowState {
    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            stage: self.stage,
            overlays: self.overlays,
            busy: self.busy,
            triage: self.triage.clone(),
            location: self.location.clone(),
            video_room: self.video_room.clone(),
            insurance: self.insurance.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn specialty(&self) -> String {
        self.triage
            .as_ref()
            .and_then(|t| t.primary_specialty())
            .unwrap_or(GENERAL_SPECIALTY)
            .to_string()
    }
}

pub struct WorkflowMachine {
    gateway: Arc<AgentGateway>,
    ledger: Arc<HistoryLedger>,
    state: RwLock<WorkflowState>,
    snapshot_tx: watch::Sender<WorkflowSnapshot>,
}

impl WorkflowMachine {
    pub fn new(gateway: Arc<AgentGateway>, ledger: Arc<HistoryLedger>) -> Self {
        let (snapshot_tx, _) = watch::channel(WorkflowSnapshot::default());
        Self {
            gateway,
            ledger,
            state: RwLock::new(WorkflowState::default()),
            snapshot_tx,
        }
    }

    /// 提交问诊表单：仅允许在 Intake；成功后缓存分诊结果、写入历史并进入 Assessed
    pub async fn submit_assessment(&self, form: IntakeForm) -> Result<StepOutcome, WorkflowError> {
        let epoch = {
            let mut state = self.state.write().await;
            if state.busy.assessment {
                return Ok(StepOutcome::Busy);
            }
            if state.stage != WorkflowStage::Intake {
                return Err(WorkflowError::InvalidStage {
                    operation: "submit_assessment",
                    stage: state.stage,
                });
            }
            if let Err(e) = form.validate() {
                return Err(self.record_failure(&mut state, e));
            }
            state.busy.assessment = true;
            self.publish(&state);
            state.nav_epoch
        };

        let result = self
            .gateway
            .invoke(&assessment_instruction(&form), Capability::Triage)
            .await
            .into_payload(Capability::Triage)
            .and_then(|payload| normalize_as::<TriageResult>(&payload).map_err(WorkflowError::from));

        let triage = match result {
            Ok(triage) => triage,
            Err(e) => {
                let mut state = self.state.write().await;
                state.busy.assessment = false;
                tracing::warn!("Assessment failed: {}", e);
                return Err(self.record_failure(&mut state, e));
            }
        };

        let record = HistoryRecord::derive(&form, &triage, Utc::now());
        let append_error = match self.ledger.append(record).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("History append failed: {}", e);
                Some(format!("history not saved: {}", e))
            }
        };

        let mut state = self.state.write().await;
        state.busy.assessment = false;
        tracing::info!(
            urgency = triage.urgency_level(),
            risk_score = triage.risk_score(),
            red_flag = triage.red_flag_detected(),
            "Assessment accepted"
        );
        state.triage = Some(triage);
        state.last_error = append_error;
        self.advance(&mut state, epoch, WorkflowStage::Assessed);
        self.publish(&state);
        Ok(StepOutcome::Completed)
    }

    /// 按分诊结果中的首选专科查找就近设施；允许在 Assessed 或 Routed（重复查询）
    pub async fn lookup_facilities(&self) -> Result<StepOutcome, WorkflowError> {
        let (epoch, specialty) = {
            let mut state = self.state.write().await;
            if state.busy.facilities {
                return Ok(StepOutcome::Busy);
            }
            if !matches!(state.stage, WorkflowStage::Assessed | WorkflowStage::Routed) {
                return Err(WorkflowError::InvalidStage {
                    operation: "lookup_facilities",
                    stage: state.stage,
                });
            }
            if state.triage.is_none() {
                let err = WorkflowError::MissingPrecondition(
                    "no triage result available for facility lookup".to_string(),
                );
                return Err(self.record_failure(&mut state, err));
            }
            state.busy.facilities = true;
            self.publish(&state);
            (state.nav_epoch, state.specialty())
        };

        let result = self
            .gateway
            .invoke(&facility_instruction(&specialty), Capability::FacilityRouting)
            .await
            .into_payload(Capability::FacilityRouting)
            .and_then(|payload| normalize_as::<LocationResult>(&payload).map_err(WorkflowError::from));

        let mut state = self.state.write().await;
        state.busy.facilities = false;
        match result {
            Ok(location) => {
                tracing::info!(
                    facilities = location.recommended_facilities.len(),
                    "Facility lookup completed for {}",
                    specialty
                );
                state.location = Some(location);
                state.last_error = None;
                self.advance(&mut state, epoch, WorkflowStage::Routed);
                self.publish(&state);
                Ok(StepOutcome::Completed)
            }
            Err(e) => {
                tracing::warn!("Facility lookup failed: {}", e);
                Err(self.record_failure(&mut state, e))
            }
        }
    }

    /// 并发发起视频房间与保险核验；各自结果到达即缓存，两者都落定后进入 Consultation
    pub async fn start_consultation(&self) -> Result<ConsultationOutcome, WorkflowError> {
        let (epoch, specialty) = {
            let mut state = self.state.write().await;
            if state.busy.consultation {
                return Ok(ConsultationOutcome::Busy);
            }
            if !matches!(state.stage, WorkflowStage::Assessed | WorkflowStage::Routed) {
                return Err(WorkflowError::InvalidStage {
                    operation: "start_consultation",
                    stage: state.stage,
                });
            }
            state.busy.consultation = true;
            // 新一轮问诊使用新的患者编号，上一轮的房间与保险结果作废
            state.video_room = None;
            state.insurance = None;
            self.publish(&state);
            (state.nav_epoch, state.specialty())
        };

        let patient_id = new_patient_id();
        tracing::info!("Starting consultation for patient {} ({})", patient_id, specialty);

        let video = async {
            let result = self
                .gateway
                .invoke(
                    &video_room_instruction(&patient_id, &specialty),
                    Capability::VideoProvisioning,
                )
                .await
                .into_payload(Capability::VideoProvisioning)
                .and_then(|payload| normalize_as::<VideoRoomResult>(&payload).map_err(WorkflowError::from));
            match result {
                Ok(room) => {
                    let mut state = self.state.write().await;
                    state.video_room = Some(room);
                    self.publish(&state);
                    None
                }
                Err(e) => {
                    tracing::warn!("Video room provisioning failed: {}", e);
                    Some(e)
                }
            }
        };

        let insurance = async {
            let result = self
                .gateway
                .invoke(
                    &insurance_instruction(&patient_id),
                    Capability::InsuranceVerification,
                )
                .await
                .into_payload(Capability::InsuranceVerification)
                .and_then(|payload| normalize_as::<InsuranceResult>(&payload).map_err(WorkflowError::from));
            match result {
                Ok(coverage) => {
                    let mut state = self.state.write().await;
                    state.insurance = Some(coverage);
                    self.publish(&state);
                    None
                }
                Err(e) => {
                    tracing::warn!("Insurance verification failed: {}", e);
                    Some(e)
                }
            }
        };

        let (video_error, insurance_error) = tokio::join!(video, insurance);

        let mut state = self.state.write().await;
        state.busy.consultation = false;
        let errors: Vec<String> = video_error
            .iter()
            .chain(insurance_error.iter())
            .map(|e| e.to_string())
            .collect();
        state.last_error = (!errors.is_empty()).then(|| errors.join("; "));
        self.advance(&mut state, epoch, WorkflowStage::Consultation);
        self.publish(&state);

        Ok(ConsultationOutcome::Settled(ConsultationReport {
            patient_id,
            video_error,
            insurance_error,
        }))
    }

    /// 无条件切换到目标阶段；不清空任何缓存，不重发任何调用
    pub async fn go_back(&self, target: WorkflowStage) {
        let mut state = self.state.write().await;
        tracing::debug!("Navigating {:?} -> {:?}", state.stage, target);
        state.stage = target;
        state.nav_epoch += 1;
        self.publish(&state);
    }

    /// 打开历史视图并返回历史记录（新记录在前）
    pub async fn open_history(&self) -> Vec<HistoryRecord> {
        {
            let mut state = self.state.write().await;
            state.overlays.history_view = true;
            self.publish(&state);
        }
        self.ledger.read_all().await
    }

    pub async fn open_assistant(&self) {
        let mut state = self.state.write().await;
        state.overlays.assistant_open = true;
        self.publish(&state);
    }

    /// 关闭所有覆盖层，回到当前阶段的视图
    pub async fn close_overlay(&self) {
        let mut state = self.state.write().await;
        state.overlays = Overlays::default();
        self.publish(&state);
    }

    pub async fn history(&self) -> Vec<HistoryRecord> {
        self.ledger.read_all().await
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.state.read().await.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// 阶段真正改变时递增纪元，使更早发起、仍在途的转换落定后不能把阶段拉回去
    fn advance(&self, state: &mut WorkflowState, epoch: u64, target: WorkflowStage) {
        if state.nav_epoch == epoch {
            if state.stage != target {
                tracing::info!("Stage {:?} -> {:?}", state.stage, target);
                state.stage = target;
                state.nav_epoch += 1;
            }
        } else {
            tracing::info!(
                "Result for {:?} arrived after navigation; staying at {:?}",
                target,
                state.stage
            );
        }
    }

    fn record_failure(&self, state: &mut WorkflowState, err: WorkflowError) -> WorkflowError {
        state.last_error = Some(err.to_string());
        self.publish(state);
        err
    }

    fn publish(&self, state: &WorkflowState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }
}
