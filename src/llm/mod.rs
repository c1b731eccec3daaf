//! 推理引擎层：抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockEngine, ScriptedEngine};
pub use openai::{OpenAiEngine, TokenUsage};
pub use traits::ReasoningEngine;
