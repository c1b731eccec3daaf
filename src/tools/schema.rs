//! 结构化动作 JSON Schema（schemars 自动生成）
//!
//! 注入规划 prompt，让支持结构化输出的后端直接返回 `{"action": "...", "action_input": "..."}`。

use schemars::schema_for;

use crate::core::PlannedAction;

/// 返回 PlannedAction 的 JSON Schema 字符串，可拼入 prompt
pub fn planned_action_schema_json() -> String {
    let schema = schema_for!(PlannedAction);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}
