//! 错误恢复引擎
//!
//! 根据 AgentError 与当前是否已发出过重复动作警告，返回 RecoveryAction，供研究循环决定是警告重规划、
//! 记录为 Observation 还是终止。

use serde::Deserialize;

use crate::core::{AgentError, RecoveryAction};

/// 重复动作处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallPolicy {
    /// 第一次重复时把警告转发给下一次规划，紧接着再重复才判定停滞
    #[default]
    WarnThenFail,
    /// 一旦重复立即判定停滞
    Fail,
}

#[derive(Debug, Default)]
pub struct RecoveryEngine {
    stall_policy: StallPolicy,
}

impl RecoveryEngine {
    pub fn new(stall_policy: StallPolicy) -> Self {
        Self { stall_policy }
    }

    /// `already_warned`：上一轮是否已经因为重复动作发出过警告
    pub fn handle(&self, err: &AgentError, already_warned: bool) -> RecoveryAction {
        match err {
            AgentError::StalledPlan { tool, input } => {
                if self.stall_policy == StallPolicy::WarnThenFail && !already_warned {
                    RecoveryAction::RetryWithPrompt(format!(
                        "WARNING: the action {tool} with input \"{input}\" was just executed and \
                         would return the same result. Choose a different tool or a different, \
                         more specific input, or call the finalize tool if enough information \
                         has been gathered."
                    ))
                } else {
                    RecoveryAction::Abort
                }
            }
            AgentError::SearchFailed(msg) => {
                RecoveryAction::RecordObservation(format!("Error: search failed: {msg}"))
            }
            AgentError::SearchRateLimited { .. } => RecoveryAction::Abort,
            AgentError::Planning(_) => RecoveryAction::Abort,
            AgentError::ReasoningUnavailable(_) => RecoveryAction::Abort,
            AgentError::Cancelled => RecoveryAction::Abort,
            AgentError::ConfigError(_) => RecoveryAction::Abort,
        }
    }
}
