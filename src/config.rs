//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CAREPATH__*` 覆盖（双下划线表示嵌套，如 `CAREPATH__STORAGE__BACKEND=sqlite`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub assistant: AssistantSection,
}

/// [app] 段：应用名、数据目录
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 历史记录等本地数据的根目录，默认 ./data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// [gateway] 段：Agent 端点、密钥、超时与各能力的 Agent ID
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    /// 未设置时使用 Mock 传输层（仅用于本地演示）
    pub base_url: Option<String>,
    /// 未设置时读取环境变量 CAREPATH_API_KEY
    pub api_key: Option<String>,
    /// 单次调用超时（秒），0 表示不设上限
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub agents: AgentIdsSection,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            agents: AgentIdsSection::default(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// [gateway.agents] 段：每个能力对应一个不透明的 Agent ID
#[derive(Debug, Clone, Deserialize)]
pub struct AgentIdsSection {
    #[serde(default = "default_triage_agent")]
    pub triage: String,
    #[serde(default = "default_facility_agent")]
    pub facility_routing: String,
    #[serde(default = "default_video_agent")]
    pub video_provisioning: String,
    #[serde(default = "default_insurance_agent")]
    pub insurance_verification: String,
    #[serde(default = "default_assistant_agent")]
    pub assistant: String,
}

impl Default for AgentIdsSection {
    fn default() -> Self {
        Self {
            triage: default_triage_agent(),
            facility_routing: default_facility_agent(),
            video_provisioning: default_video_agent(),
            insurance_verification: default_insurance_agent(),
            assistant: default_assistant_agent(),
        }
    }
}

fn default_triage_agent() -> String {
    "69858825e17e33c11eed19c6".to_string()
}

fn default_facility_agent() -> String {
    "69858862ab4bf65a66ad07bc".to_string()
}

fn default_video_agent() -> String {
    "69858842b90162af337b1ed7".to_string()
}

fn default_insurance_agent() -> String {
    "698588bb1caa4e686dd66e26".to_string()
}

fn default_assistant_agent() -> String {
    "698588802237a2c55706b02a".to_string()
}

/// [storage] 段：历史记录存储后端
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// memory / file / sqlite
    #[serde(default = "default_backend")]
    pub backend: String,
    /// 覆盖默认路径（file 后端为目录，sqlite 后端为数据库文件）
    pub path: Option<PathBuf>,
    /// 历史集合使用的固定键
    #[serde(default = "default_history_key")]
    pub history_key: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            history_key: default_history_key(),
        }
    }
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_history_key() -> String {
    "assessmentHistory".to_string()
}

/// [assistant] 段：助手回复缺少 message 字段时的兜底文案
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantSection {
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_fallback_reply() -> String {
    "I can help you navigate the platform.".to_string()
}

/// 从 config 目录加载配置，环境变量 CAREPATH__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CAREPATH__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CAREPATH")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
