//! 工具执行器
//!
//! 持有 ToolRegistry，按名解析动作并执行研究工具；每次执行输出结构化审计日志（JSON）。

use std::time::Instant;

use crate::core::AgentError;
use crate::tools::{RegisteredAction, Tool, ToolRegistry};

/// 审计日志中输入预览的最大字符数
const INPUT_PREVIEW_CHARS: usize = 200;

pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn resolve(&self, name: &str) -> Option<RegisteredAction> {
        self.registry.resolve(name)
    }

    /// 执行研究工具并输出审计日志；错误原样返回，由调用方交给 RecoveryEngine
    pub async fn execute(&self, tool: &dyn Tool, input: &str) -> Result<String, AgentError> {
        let start = Instant::now();
        let result = tool.execute(input).await;

        let outcome = match &result {
            Ok(_) => "ok".to_string(),
            Err(e) => e.to_string(),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool.name(),
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "input_preview": input_preview(input),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result
    }
}

fn input_preview(input: &str) -> String {
    if input.chars().count() > INPUT_PREVIEW_CHARS {
        format!("{}...", input.chars().take(INPUT_PREVIEW_CHARS).collect::<String>())
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_preview_truncates_by_chars() {
        let long = "é".repeat(300);
        let preview = input_preview(&long);
        assert_eq!(preview.chars().count(), INPUT_PREVIEW_CHARS + 3);
        assert_eq!(input_preview("short"), "short");
    }
}
