//! Agent 调用网关：能力注册、调用信封、传输层抽象与实现（HTTP / Mock）

pub mod capability;
pub mod envelope;
pub mod executor;
pub mod http;
pub mod mock;
pub mod transport;

pub use capability::{Capability, CapabilityRegistry};
pub use envelope::Envelope;
pub use executor::AgentGateway;
pub use http::HttpAgentTransport;
pub use mock::{MockAgentTransport, MockReply, RecordedCall};
pub use transport::AgentTransport;
