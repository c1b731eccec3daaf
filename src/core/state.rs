//! 数据模型：Query、Scratchpad、TaskState 与循环阶段
//!
//! TaskState 在循环迭代之间按值传递：每个状态转换方法都消费 `self` 并返回新状态，
//! 因此一次迭代的副作用全部体现在返回值上，不存在跨迭代的共享可变别名。

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 用户的原始研究问题，会话开始时创建，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 推理引擎提出的下一步动作：工具名 + 自由文本输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlannedAction {
    /// 工具名，必须与 Available tools 中的 name 完全一致
    pub action: String,
    /// 传给工具的唯一输入
    #[serde(default)]
    pub action_input: String,
}

impl PlannedAction {
    pub fn new(action: impl Into<String>, action_input: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            action_input: action_input.into(),
        }
    }
}

/// Scratchpad 中的一条记录：动作 + 观察 + 单调递增的步号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchpadEntry {
    pub step: usize,
    pub tool: String,
    pub input: String,
    pub observation: String,
    pub recorded_at: DateTime<Utc>,
}

impl ScratchpadEntry {
    /// 是否与给定动作完全相同（用于重复动作检测）
    pub fn repeats(&self, action: &PlannedAction) -> bool {
        self.tool == action.action && self.input == action.action_input
    }
}

impl fmt::Display for ScratchpadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Step {}", self.step)?;
        writeln!(f, "Action: {}", self.tool)?;
        writeln!(f, "Action Input: {}", self.input)?;
        write!(f, "Observation: {}", self.observation)
    }
}

/// 只追加的 (action, observation) 日志；步号由 push 分配，从 0 开始连续递增
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条记录，返回分配的步号
    pub fn push(
        &mut self,
        tool: impl Into<String>,
        input: impl Into<String>,
        observation: impl Into<String>,
    ) -> usize {
        let step = self.entries.len();
        self.entries.push(ScratchpadEntry {
            step,
            tool: tool.into(),
            input: input.into(),
            observation: observation.into(),
            recorded_at: Utc::now(),
        });
        step
    }

    pub fn entries(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ScratchpadEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 渲染为纯文本（供 prompt 与 CLI 输出）
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// 循环状态机阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Planning,
    Researching,
    Finalizing,
    Done,
    Stalled,
    BudgetExhausted,
    /// 规划错误、推理引擎不可用、限流耗尽或取消
    Failed,
}

impl LoopPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoopPhase::Done | LoopPhase::Stalled | LoopPhase::BudgetExhausted | LoopPhase::Failed
        )
    }
}

/// 一次运行的完整状态，由 Orchestrator 独占
#[derive(Debug, Clone)]
pub struct TaskState {
    query: Query,
    scratchpad: Scratchpad,
    step: usize,
    phase: LoopPhase,
    next_action: Option<PlannedAction>,
    /// 转发给下一次规划调用的警告（如重复动作）
    warning: Option<String>,
    result: Option<String>,
}

impl TaskState {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            scratchpad: Scratchpad::new(),
            step: 0,
            phase: LoopPhase::Planning,
            next_action: None,
            warning: None,
            result: None,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    /// 已消耗的迭代数（包含被警告跳过的迭代）
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn next_action(&self) -> Option<&PlannedAction> {
        self.next_action.as_ref()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// 提议的动作是否与上一条记录完全相同
    pub fn repeats_last(&self, action: &PlannedAction) -> bool {
        self.scratchpad
            .last()
            .map(|e| e.repeats(action))
            .unwrap_or(false)
    }

    /// 写入规划结果并进入执行阶段
    pub fn planned(mut self, action: PlannedAction, phase: LoopPhase) -> Self {
        self.next_action = Some(action);
        self.phase = phase;
        self
    }

    /// 执行完成：把 next_action 与 observation 追加到 Scratchpad，回到 Planning
    pub fn observed(mut self, observation: impl Into<String>) -> Self {
        if let Some(action) = self.next_action.take() {
            self.scratchpad
                .push(action.action, action.action_input, observation);
        }
        self.warning = None;
        self.step += 1;
        self.phase = LoopPhase::Planning;
        self
    }

    /// 本轮动作不执行，只把警告带给下一次规划；消耗一次迭代
    pub fn skipped(mut self, warning: impl Into<String>) -> Self {
        self.next_action = None;
        self.warning = Some(warning.into());
        self.step += 1;
        self.phase = LoopPhase::Planning;
        self
    }

    /// 设置最终结果（只会在循环最后一步发生一次）
    pub fn finished(mut self, answer: impl Into<String>) -> Self {
        debug_assert!(self.result.is_none(), "terminal result set twice");
        let answer = answer.into();
        if let Some(action) = self.next_action.take() {
            self.scratchpad
                .push(action.action, action.action_input, answer.clone());
        }
        self.result = Some(answer);
        self.warning = None;
        self.step += 1;
        self.phase = LoopPhase::Done;
        self
    }

    /// 进入非 Done 的终止阶段（Stalled / BudgetExhausted / Failed）
    pub fn halted(mut self, phase: LoopPhase) -> Self {
        self.next_action = None;
        self.phase = phase;
        self
    }

    pub fn into_scratchpad(self) -> Scratchpad {
        self.scratchpad
    }
}

/// 正常完成的方式：推理驱动的 finalize，或策略驱动的预算耗尽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Done,
    BudgetExhausted,
}

/// 运行结果：最终回答（BudgetExhausted 时为空）与完整 Scratchpad
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub answer: Option<String>,
    pub scratchpad: Scratchpad,
    pub iterations: usize,
}

/// 运行失败：错误本身 + 已积累的 Scratchpad（调用方总能拿到可审计的轨迹）
#[derive(Debug, Clone, thiserror::Error)]
#[error("run ended in {phase:?}: {error}")]
pub struct RunFailure {
    pub error: crate::core::AgentError,
    pub phase: LoopPhase,
    pub scratchpad: Scratchpad,
}
