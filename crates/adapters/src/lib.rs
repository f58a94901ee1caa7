//! Trait boundaries for the external collaborators an agent turn talks
//! to: the LLM client and the code execution sandbox.

pub mod http_llm;
pub mod llm;
pub mod sandbox;

pub use http_llm::HttpLlmClient;
pub use llm::{ChatMessage, CompletionChunk, LlmClient, MessageRole};
pub use sandbox::{SandboxClient, SandboxHandle, SandboxOutput};

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    pub use crate::llm::fake::FakeLlmClient;
    pub use crate::sandbox::fake::FakeSandboxClient;
}
