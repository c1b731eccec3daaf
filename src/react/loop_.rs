//! 研究主循环
//!
//! Plan -> Research -> Observe -> 下一轮 Plan，直到推理引擎选择 finalize、迭代预算耗尽或出现不可恢复的错误。
//! TaskState 按值在迭代之间传递；每轮只由本循环推进，Scratchpad 只追加。
//! 重复动作先警告（本轮不执行、不记录，但消耗一次迭代），紧接着再次重复则判定停滞。

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::core::{
    AgentError, LoopPhase, PlannedAction, Query, RecoveryAction, RecoveryEngine, RunFailure,
    RunReport, RunStatus, TaskState,
};
use crate::react::Planner;
use crate::tools::{RegisteredAction, Tool, ToolExecutor};

/// 默认迭代预算
pub const DEFAULT_MAX_ITERATIONS: usize = 12;
/// Observation 日志预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

pub struct ResearchLoop {
    planner: Planner,
    executor: ToolExecutor,
    recovery: RecoveryEngine,
    max_iterations: usize,
    cancel_token: CancellationToken,
}

/// 终止运行：停滞错误进入 Stalled，其余进入 Failed；Scratchpad 随失败一起返回
fn fail(state: TaskState, error: AgentError) -> RunFailure {
    let phase = match error {
        AgentError::StalledPlan { .. } => LoopPhase::Stalled,
        _ => LoopPhase::Failed,
    };
    RunFailure {
        error,
        phase,
        scratchpad: state.halted(phase).into_scratchpad(),
    }
}

fn report(state: TaskState) -> RunReport {
    let status = match state.phase() {
        LoopPhase::Done => RunStatus::Done,
        _ => RunStatus::BudgetExhausted,
    };
    let answer = state.result().map(str::to_string);
    let iterations = state.step();
    RunReport {
        status,
        answer,
        scratchpad: state.into_scratchpad(),
        iterations,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(OBSERVATION_PREVIEW_CHARS).collect()
}

impl ResearchLoop {
    pub fn new(planner: Planner, executor: ToolExecutor) -> Self {
        Self {
            planner,
            executor,
            recovery: RecoveryEngine::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_recovery(mut self, recovery: RecoveryEngine) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// 取消令牌（Ctrl-C 等外部信号通过它结束运行）
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 针对一个问题运行完整的研究循环
    pub async fn run(&self, query: &str) -> Result<RunReport, RunFailure> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("research_run", %run_id);
        self.drive(Query::new(query)).instrument(span).await
    }

    async fn drive(&self, query: Query) -> Result<RunReport, RunFailure> {
        tracing::info!(query = %query, max_iterations = self.max_iterations, "research run started");
        let init_usage = self.planner.token_usage();

        let mut state = TaskState::new(query);
        let outcome = loop {
            match self.advance(state).await {
                Ok(next) if next.phase().is_terminal() => break Ok(next),
                Ok(next) => state = next,
                Err(failure) => break Err(failure),
            }
        };

        let (prompt, completion, total) = self.planner.token_usage();
        tracing::info!(
            prompt_tokens = prompt.saturating_sub(init_usage.0),
            completion_tokens = completion.saturating_sub(init_usage.1),
            total_tokens = total.saturating_sub(init_usage.2),
            "token usage"
        );

        match outcome {
            Ok(state) => {
                let report = report(state);
                tracing::info!(status = ?report.status, iterations = report.iterations, "research run finished");
                Ok(report)
            }
            Err(failure) => {
                tracing::warn!(
                    error = %failure.error,
                    phase = ?failure.phase,
                    entries = failure.scratchpad.len(),
                    "research run failed"
                );
                Err(failure)
            }
        }
    }

    /// 一次迭代：预算检查 -> 规划 -> 分派
    async fn advance(&self, state: TaskState) -> Result<TaskState, RunFailure> {
        if self.cancel_token.is_cancelled() {
            return Err(fail(state, AgentError::Cancelled));
        }
        if state.step() >= self.max_iterations {
            tracing::warn!(iterations = state.step(), "iteration budget exhausted");
            return Ok(state.halted(LoopPhase::BudgetExhausted));
        }

        let planned = tokio::select! {
            r = self.planner.plan(&state, self.executor.registry()) => r,
            _ = self.cancel_token.cancelled() => Err(AgentError::Cancelled),
        };
        let action = match planned {
            Ok(action) => action,
            Err(e) => return Err(fail(state, e)),
        };
        tracing::info!(
            step = state.step(),
            action = %action.action,
            input = %action.action_input,
            "planned action"
        );

        match self.executor.resolve(&action.action) {
            Some(RegisteredAction::Finalize) => self.finalize(state, action).await,
            Some(RegisteredAction::Research(tool)) => {
                self.research(state, action, tool.as_ref()).await
            }
            None => {
                let known = self.executor.registry().action_names().join(", ");
                let err = AgentError::Planning(format!(
                    "unknown action {:?} (available: {known})",
                    action.action
                ));
                Err(fail(state, err))
            }
        }
    }

    async fn research(
        &self,
        state: TaskState,
        action: PlannedAction,
        tool: &dyn Tool,
    ) -> Result<TaskState, RunFailure> {
        if action.action_input.trim().is_empty() {
            let err = AgentError::Planning(format!("empty input for {}", action.action));
            return Err(fail(state, err));
        }

        if state.repeats_last(&action) {
            let err = AgentError::StalledPlan {
                tool: action.action.clone(),
                input: action.action_input.clone(),
            };
            return match self.recovery.handle(&err, state.warning().is_some()) {
                RecoveryAction::RetryWithPrompt(warning) => {
                    tracing::warn!(tool = %action.action, "repeated action skipped, warning planner");
                    Ok(state.planned(action, LoopPhase::Researching).skipped(warning))
                }
                _ => Err(fail(state, err)),
            };
        }

        let input = action.action_input.clone();
        let state = state.planned(action, LoopPhase::Researching);
        let result = tokio::select! {
            r = self.executor.execute(tool, &input) => r,
            _ = self.cancel_token.cancelled() => Err(AgentError::Cancelled),
        };

        match result {
            Ok(observation) => {
                tracing::debug!(observation = %preview(&observation), "observation");
                Ok(state.observed(observation))
            }
            Err(e) => match self.recovery.handle(&e, false) {
                RecoveryAction::RecordObservation(observation) => {
                    tracing::warn!(error = %e, "tool error recorded as observation");
                    Ok(state.observed(observation))
                }
                _ => Err(fail(state, e)),
            },
        }
    }

    async fn finalize(
        &self,
        state: TaskState,
        action: PlannedAction,
    ) -> Result<TaskState, RunFailure> {
        let state = state.planned(action, LoopPhase::Finalizing);
        let answer = tokio::select! {
            r = self.planner.synthesize(&state) => r,
            _ = self.cancel_token.cancelled() => Err(AgentError::Cancelled),
        };
        match answer {
            Ok(answer) => Ok(state.finished(answer)),
            Err(e) => Err(fail(state, e)),
        }
    }
}
