//! 客户端构建器：按配置组装传输层、网关、历史账本、状态机与助手会话
//!
//! 测试可通过 with_transport / with_store 注入 Mock 实现；未注入时：
//! - 配置了 gateway.base_url 则使用 HTTP 传输层，否则回退到演示用 Mock；
//! - 存储后端由 storage.backend 决定。

use std::sync::Arc;

use chrono::Utc;

use crate::assistant::AssistantSession;
use crate::config::AppConfig;
use crate::core::WorkflowMachine;
use crate::gateway::{AgentGateway, AgentTransport, CapabilityRegistry, HttpAgentTransport, MockAgentTransport};
use crate::history::{create_store_from_config, HistoryLedger, HistoryReport, KvStore};

/// 组装完成的客户端：一个工作流实例 + 一个助手会话，共享同一网关与历史账本
pub struct CareClient {
    workflow: Arc<WorkflowMachine>,
    assistant: Arc<AssistantSession>,
    ledger: Arc<HistoryLedger>,
}

impl CareClient {
    pub fn workflow(&self) -> &Arc<WorkflowMachine> {
        &self.workflow
    }

    pub fn assistant(&self) -> &Arc<AssistantSession> {
        &self.assistant
    }

    pub fn ledger(&self) -> &Arc<HistoryLedger> {
        &self.ledger
    }

    /// 以当前日期（UTC）为窗口终点生成历史统计
    pub async fn report(&self) -> HistoryReport {
        let records = self.ledger.read_all().await;
        HistoryReport::from_records(&records, Utc::now().date_naive())
    }
}

pub struct ClientBuilder {
    config: AppConfig,
    transport: Option<Arc<dyn AgentTransport>>,
    store: Option<Arc<dyn KvStore>>,
}

impl ClientBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            transport: None,
            store: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn AgentTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> anyhow::Result<CareClient> {
        let cfg = self.config;
        let registry = CapabilityRegistry::from_config(&cfg.gateway.agents);

        let transport: Arc<dyn AgentTransport> = match self.transport {
            Some(transport) => transport,
            None => match cfg.gateway.base_url.as_deref() {
                Some(url) => {
                    tracing::info!("Using HTTP agent transport ({})", url);
                    Arc::new(HttpAgentTransport::new(
                        url,
                        cfg.gateway.api_key.as_deref(),
                        cfg.gateway.request_timeout_secs,
                    )?)
                }
                None => {
                    tracing::warn!("No gateway.base_url configured, using demo Mock transport");
                    Arc::new(MockAgentTransport::demo(&registry))
                }
            },
        };

        let store = match self.store {
            Some(store) => store,
            None => create_store_from_config(&cfg)?,
        };

        let gateway = Arc::new(AgentGateway::new(
            transport,
            registry,
            cfg.gateway.request_timeout_secs,
        ));
        let ledger = Arc::new(HistoryLedger::new(store, cfg.storage.history_key.clone()));
        let workflow = Arc::new(WorkflowMachine::new(gateway.clone(), ledger.clone()));
        let assistant = Arc::new(AssistantSession::new(
            gateway,
            cfg.assistant.fallback_reply.clone(),
        ));

        Ok(CareClient {
            workflow,
            assistant,
            ledger,
        })
    }
}
