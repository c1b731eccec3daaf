//! 推理引擎抽象
//!
//! 研究循环只依赖这一窄接口：给一段 prompt 文本，返回一段回复文本。失败以字符串返回，
//! 由调用方统一映射为 `AgentError::ReasoningUnavailable`。

use async_trait::async_trait;

#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// 非流式完成
    async fn complete(&self, prompt: &str) -> Result<String, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
