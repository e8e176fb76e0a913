//! 助手会话
//!
//! send 先乐观地追加用户轮次，再经网关调用助手能力；成功则追加助手轮次，失败不追加任何内容，由调用方展示错误。
//! 对话记录严格按追加顺序，不去重、不重排；会话对象存活多久，记录就保留多久。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::assistant::{AssistantReply, Turn};
use crate::core::WorkflowError;
use crate::gateway::{AgentGateway, Capability};
use crate::normalize::normalize_as;

/// send 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 收到回复（可能是兜底回复）
    Replied(String),
    /// 空白输入，未做任何事
    Ignored,
    /// 上一条消息仍在途
    Busy,
}

pub struct AssistantSession {
    gateway: Arc<AgentGateway>,
    fallback_reply: String,
    transcript: RwLock<Vec<Turn>>,
    busy: AtomicBool,
    transcript_tx: watch::Sender<Vec<Turn>>,
}

/// 在途标志守卫：无论 send 从哪个分支返回都会复位
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AssistantSession {
    pub fn new(gateway: Arc<AgentGateway>, fallback_reply: impl Into<String>) -> Self {
        let (transcript_tx, _) = watch::channel(Vec::new());
        Self {
            gateway,
            fallback_reply: fallback_reply.into(),
            transcript: RwLock::new(Vec::new()),
            busy: AtomicBool::new(false),
            transcript_tx,
        }
    }

    pub async fn send(&self, message: &str) -> Result<SendOutcome, WorkflowError> {
        if message.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Assistant message dropped: previous message still in flight");
            return Ok(SendOutcome::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        self.push(Turn::user(message)).await;

        let payload = self
            .gateway
            .invoke(message, Capability::Assistant)
            .await
            .into_payload(Capability::Assistant)?;

        let reply = match normalize_as::<AssistantReply>(&payload) {
            Ok(reply) => reply
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.fallback_reply.clone()),
            Err(e) if e.is_malformed() => return Err(e.into()),
            Err(_) => self.fallback_reply.clone(),
        };

        self.push(Turn::assistant(reply.clone())).await;
        Ok(SendOutcome::Replied(reply))
    }

    pub async fn transcript(&self) -> Vec<Turn> {
        self.transcript.read().await.clone()
    }

    /// 订阅对话记录变化（每追加一轮推送一次完整记录）
    pub fn subscribe(&self) -> watch::Receiver<Vec<Turn>> {
        self.transcript_tx.subscribe()
    }

    async fn push(&self, turn: Turn) {
        let mut transcript = self.transcript.write().await;
        transcript.push(turn);
        self.transcript_tx.send_replace(transcript.clone());
    }
}
