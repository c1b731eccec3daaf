//! Mock 推理引擎（用于测试与离线运行，无需 API）
//!
//! - `MockEngine`：根据 prompt 类型给出固定行为：第一次规划时研究原始问题，之后直接 finalize；
//!   摘要与最终回答直接回显证据片段，便于在没有 API Key 时本地跑通整个流程。
//! - `ScriptedEngine`：按调用序号返回预设回复，并记录收到的每条 prompt，供测试断言。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::ReasoningEngine;
use crate::react::prompts::{FINAL_MARKER, PLANNER_MARKER, SUMMARIZER_MARKER};

/// 回显内容的最大字符数
const MOCK_ECHO_CHARS: usize = 600;

#[derive(Debug, Default)]
pub struct MockEngine;

fn section_after<'a>(prompt: &'a str, header: &str) -> &'a str {
    prompt
        .find(header)
        .map(|i| prompt[i + header.len()..].trim())
        .unwrap_or("")
}

/// `header` 之后、最后一个 `footer` 之前的内容
fn section_between<'a>(prompt: &'a str, header: &str, footer: &str) -> &'a str {
    let rest = section_after(prompt, header);
    rest.rfind(footer).map(|i| rest[..i].trim()).unwrap_or(rest)
}

fn echo(body: &str) -> String {
    format!(
        "Echo from Mock: {}",
        body.chars().take(MOCK_ECHO_CHARS).collect::<String>()
    )
}

#[async_trait]
impl ReasoningEngine for MockEngine {
    async fn complete(&self, prompt: &str) -> Result<String, String> {
        if prompt.contains(PLANNER_MARKER) {
            let query = section_after(prompt, "Query:")
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            let scratchpad = section_after(prompt, "Current scratchpad:");
            return Ok(if scratchpad.is_empty() || scratchpad == "(empty)" {
                format!(
                    "Task: Look up the question on the web.\nAction: internet_researcher\nAction Input: {query}"
                )
            } else {
                "Task: Enough information has been gathered.\nAction: prepare_answer\nAction Input: "
                    .to_string()
            });
        }
        if prompt.contains(SUMMARIZER_MARKER) {
            return Ok(echo(section_between(
                prompt,
                "raw content from the search results:",
                "Provide a clear and concise summary",
            )));
        }
        if prompt.contains(FINAL_MARKER) {
            return Ok(echo(section_between(prompt, "Scratchpad:", "Final Answer:")));
        }
        Ok(echo(prompt))
    }
}

type Responder = Box<dyn Fn(&str, usize) -> Result<String, String> + Send + Sync>;

/// 脚本化引擎：第 n 次调用返回 `responder(prompt, n)`
pub struct ScriptedEngine {
    responder: Responder,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    /// 依次返回给定回复；脚本用完后返回 Err
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self::from_fn(move |_, n| {
            responses
                .get(n)
                .cloned()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        })
    }

    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的 prompt（按调用顺序）
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn complete(&self, prompt: &str) -> Result<String, String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        (self.responder)(prompt, n)
    }
}
