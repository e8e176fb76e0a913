//! 核心编排层：错误类型、状态投影、指令模板、工作流状态机、命令驱动循环、客户端构建

pub mod builder;
pub mod driver;
pub mod error;
pub mod prompts;
pub mod state;
pub mod workflow;

pub use builder::{CareClient, ClientBuilder};
pub use driver::{spawn_driver, Command, DriverHandle};
pub use error::WorkflowError;
pub use state::{BusyFlags, Overlays, StepOutcome, WorkflowSnapshot, WorkflowStage};
pub use workflow::{ConsultationOutcome, ConsultationReport, WorkflowMachine};
