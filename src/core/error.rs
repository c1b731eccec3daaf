//! 错误类型与恢复动作
//!
//! 三个层次：
//! - `AgentError`：一次研究运行级别的错误（规划、停滞、限流耗尽、推理引擎不可用等），对当前运行致命；
//! - `SearchError`：Search Provider 返回，`RateLimited` 由 Research Pipeline 在本地重试；
//! - `FetchError`：单个 URL 的抓取/解析失败，作为数据写入 EvidenceItem，永不中断研究调用。

use thiserror::Error;

/// 研究运行过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// 推理引擎返回了无法解析或为空的 Action
    #[error("Planning error: {0}")]
    Planning(String),

    /// 连续两次提出完全相同的 (tool, input)
    #[error("Stalled plan: repeated action {tool}({input})")]
    StalledPlan { tool: String, input: String },

    /// 搜索在限流下重试耗尽
    #[error("Search rate limited after {attempts} attempts")]
    SearchRateLimited { attempts: u32 },

    /// 搜索失败（非限流）
    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Reasoning engine unavailable: {0}")]
    ReasoningUnavailable(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Search Provider 错误：RateLimited 可重试，Failed 立即上抛
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("rate limited")]
    RateLimited,

    #[error("{0}")]
    Failed(String),
}

/// 单个 URL 的失败原因（FetchFailed / ParseFailed 两类）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Http(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse failed: {0}")]
    Parse(String),

    /// fan-out 总截止时间到达时仍未完成，被放弃
    #[error("abandoned at fan-out deadline")]
    DeadlineExceeded,

    /// 抓取或抽取过程 panic，已在本地捕获
    #[error("worker crashed: {0}")]
    Crashed(String),
}

impl FetchError {
    /// 是否属于 ParseFailed（其余均为 FetchFailed）
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, FetchError::Parse(_))
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 不执行本轮动作，把提示注入下一次规划
    RetryWithPrompt(String),
    /// 把错误作为 Observation 写入 Scratchpad，继续循环
    RecordObservation(String),
    /// 终止当前运行
    Abort,
}
