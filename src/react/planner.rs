//! Planner：下一步动作规划与最终回答合成
//!
//! 推理引擎的回复按严格语法解析：优先识别 JSON 动作 `{"action": "...", "action_input": "..."}`，
//! 否则读取第一个 `Action:` 行及其后的 `Action Input:`。两者都没有则为规划错误，绝不猜测默认动作。

use std::sync::Arc;

use crate::core::{AgentError, PlannedAction, TaskState};
use crate::llm::ReasoningEngine;
use crate::react::prompts::{final_prompt, PlannerPrompt};
use crate::tools::{planned_action_schema_json, ToolRegistry};

/// Action Input 在遇到这些行首时结束
const INPUT_TERMINATORS: &[&str] = &[
    "Action Output:",
    "Observation:",
    "Action:",
    "Task:",
    "Final Answer:",
];

/// 提取 JSON 块（```json ... ``` 或第一个 `{` 到最后一个 `}`）
fn json_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// 去掉 markdown 粗体标记与行首列表符号，便于匹配 `Action:` 前缀
fn clean_line(line: &str) -> String {
    line.replace("**", "")
        .trim()
        .trim_start_matches(['-', '*', ' '])
        .to_string()
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return s[1..s.len() - 1].trim();
        }
    }
    s
}

fn valid_action_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn parse_json_action(text: &str) -> Option<PlannedAction> {
    let block = json_block(text)?;
    let parsed: PlannedAction = serde_json::from_str(block).ok()?;
    let action = parsed.action.trim();
    valid_action_name(action).then(|| PlannedAction::new(action, parsed.action_input.trim()))
}

fn parse_text_action(text: &str) -> Result<PlannedAction, AgentError> {
    let lines: Vec<String> = text.lines().map(clean_line).collect();

    let action_idx = lines
        .iter()
        .position(|l| l.starts_with("Action:"))
        .ok_or_else(|| AgentError::Planning("no 'Action:' line in planner output".to_string()))?;
    let action = strip_quotes(&lines[action_idx]["Action:".len()..]).to_string();
    if !valid_action_name(&action) {
        return Err(AgentError::Planning(format!("invalid action name: {action:?}")));
    }

    let input_idx = lines[action_idx + 1..]
        .iter()
        .position(|l| l.starts_with("Action Input:"))
        .map(|i| i + action_idx + 1)
        .ok_or_else(|| {
            AgentError::Planning(format!("no 'Action Input:' line after action {action}"))
        })?;

    let mut input_lines = vec![lines[input_idx]["Action Input:".len()..].trim().to_string()];
    input_lines.extend(
        lines[input_idx + 1..]
            .iter()
            .take_while(|l| !INPUT_TERMINATORS.iter().any(|t| l.starts_with(t)))
            .cloned(),
    );
    let input = strip_quotes(input_lines.join("\n").trim()).to_string();

    Ok(PlannedAction::new(action, input))
}

/// 解析推理引擎的规划输出
pub fn parse_planner_output(output: &str) -> Result<PlannedAction, AgentError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(AgentError::Planning("empty planner output".to_string()));
    }
    match parse_json_action(trimmed) {
        Some(action) => Ok(action),
        None => parse_text_action(trimmed),
    }
}

/// Planner：持有推理引擎，负责规划与最终回答
pub struct Planner {
    engine: Arc<dyn ReasoningEngine>,
    schema: String,
}

impl Planner {
    pub fn new(engine: Arc<dyn ReasoningEngine>) -> Self {
        Self {
            engine,
            schema: planned_action_schema_json(),
        }
    }

    /// 获取推理引擎累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.engine.token_usage()
    }

    pub async fn plan(
        &self,
        state: &TaskState,
        registry: &ToolRegistry,
    ) -> Result<PlannedAction, AgentError> {
        let tools = registry.to_manifest_json();
        let scratchpad = state.scratchpad().render();
        let prompt = PlannerPrompt {
            query: state.query().as_str(),
            scratchpad: &scratchpad,
            tools: &tools,
            finalize_name: registry.finalize_name(),
            schema: &self.schema,
            warning: state.warning(),
        }
        .render();

        let output = self
            .engine
            .complete(&prompt)
            .await
            .map_err(AgentError::ReasoningUnavailable)?;
        tracing::debug!(output = %output, "planner output");
        parse_planner_output(&output)
    }

    /// 基于完整 Scratchpad 合成最终回答
    pub async fn synthesize(&self, state: &TaskState) -> Result<String, AgentError> {
        let prompt = final_prompt(state.query().as_str(), &state.scratchpad().render());
        self.engine
            .complete(&prompt)
            .await
            .map(|answer| answer.trim().to_string())
            .map_err(AgentError::ReasoningUnavailable)
    }
}
