//! 命令驱动循环：渲染层发命令，状态机发布快照
//!
//! 三通道：UI -> Core 命令（mpsc）；Core -> UI 工作流快照与对话记录（watch）。
//! 会触达网关的命令各自在独立任务中执行，因此不同阶段可以同时在途；同一阶段的重复命令由在途标志忽略。
//! 取消令牌只停止循环，不中断已发出的调用。

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::assistant::{AssistantSession, Turn};
use crate::core::{CareClient, WorkflowMachine, WorkflowSnapshot, WorkflowStage};
use crate::triage::IntakeForm;

/// 从渲染层发往状态机的命令
#[derive(Debug, Clone)]
pub enum Command {
    SubmitAssessment(IntakeForm),
    LookupFacilities,
    StartConsultation,
    GoBack(WorkflowStage),
    OpenHistory,
    OpenAssistant,
    /// 关闭历史视图与助手面板
    CloseOverlay,
    SendAssistant(String),
    Quit,
}

/// spawn_driver 返回的句柄
pub struct DriverHandle {
    pub commands: mpsc::UnboundedSender<Command>,
    pub snapshots: watch::Receiver<WorkflowSnapshot>,
    pub transcript: watch::Receiver<Vec<Turn>>,
    pub task: JoinHandle<()>,
}

pub fn spawn_driver(client: &CareClient, shutdown: CancellationToken) -> DriverHandle {
    let workflow = client.workflow().clone();
    let assistant = client.assistant().clone();
    let snapshots = workflow.subscribe();
    let transcript = assistant.subscribe();
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Quit) | None => break,
                    Some(cmd) => dispatch(cmd, &workflow, &assistant).await,
                },
            }
        }
        tracing::info!("Command driver stopped");
    });

    DriverHandle {
        commands: cmd_tx,
        snapshots,
        transcript,
        task,
    }
}

async fn dispatch(cmd: Command, workflow: &Arc<WorkflowMachine>, assistant: &Arc<AssistantSession>) {
    match cmd {
        Command::SubmitAssessment(form) => {
            let workflow = workflow.clone();
            tokio::spawn(async move {
                if let Err(e) = workflow.submit_assessment(form).await {
                    tracing::debug!("submit_assessment: {}", e);
                }
            });
        }
        Command::LookupFacilities => {
            let workflow = workflow.clone();
            tokio::spawn(async move {
                if let Err(e) = workflow.lookup_facilities().await {
                    tracing::debug!("lookup_facilities: {}", e);
                }
            });
        }
        Command::StartConsultation => {
            let workflow = workflow.clone();
            tokio::spawn(async move {
                if let Err(e) = workflow.start_consultation().await {
                    tracing::debug!("start_consultation: {}", e);
                }
            });
        }
        Command::SendAssistant(message) => {
            let assistant = assistant.clone();
            tokio::spawn(async move {
                if let Err(e) = assistant.send(&message).await {
                    tracing::warn!("Assistant message failed: {}", e);
                }
            });
        }
        // 以下命令不触达网关，按到达顺序就地执行
        Command::GoBack(stage) => workflow.go_back(stage).await,
        Command::OpenHistory => {
            workflow.open_history().await;
        }
        Command::OpenAssistant => workflow.open_assistant().await,
        Command::CloseOverlay => workflow.close_overlay().await,
        Command::Quit => {}
    }
}
