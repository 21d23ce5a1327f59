pub mod catalog;
pub mod config;
pub mod fallback;
pub mod orchestrator;
pub mod providers;
pub mod resolver;

pub use catalog::{Complexity, ModelCatalog};
pub use config::{GatewayConfig, ProviderEndpoint};
pub use fallback::FallbackExecutor;
pub use orchestrator::{AiChatInput, AiChatMessage, AiChatResponse, AiOrchestrator, ChatBackend};
pub use resolver::{ProviderResolver, ResolvedConfig};
