//! 研究工具：internet_researcher / news_researcher
//!
//! 执行一次 Research Pipeline，把证据（排序后的片段或按搜索顺序的正文）拼接并截断到摘要预算，
//! 交给推理引擎摘要；摘要加上来源清单即为写入 Scratchpad 的 Observation。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::ReasoningEngine;
use crate::react::prompts::summarizer_prompt;
use crate::research::{truncate_chars, EvidenceSet, ResearchPipeline, SearchKind};
use crate::tools::Tool;

/// 摘要输入的默认字符预算
pub const DEFAULT_DISTILL_CHARS: usize = 7800;

pub struct ResearchTool {
    name: String,
    description: String,
    kind: SearchKind,
    pipeline: Arc<ResearchPipeline>,
    engine: Arc<dyn ReasoningEngine>,
    max_results: usize,
    distill_chars: usize,
}

impl ResearchTool {
    pub fn new(
        name: impl Into<String>,
        kind: SearchKind,
        pipeline: Arc<ResearchPipeline>,
        engine: Arc<dyn ReasoningEngine>,
    ) -> Self {
        let description = match kind {
            SearchKind::Web => "Given input will be searched on the internet. Content from the first few links will be summarized and returned",
            SearchKind::News => "Given input will be searched in news articles. Content from the first few links will be summarized and returned",
        };
        Self {
            name: name.into(),
            description: description.to_string(),
            kind,
            pipeline,
            engine,
            max_results: 5,
            distill_chars: DEFAULT_DISTILL_CHARS,
        }
    }

    /// 默认 web 研究工具
    pub fn web(pipeline: Arc<ResearchPipeline>, engine: Arc<dyn ReasoningEngine>) -> Self {
        Self::new("internet_researcher", SearchKind::Web, pipeline, engine)
    }

    /// 默认新闻研究工具
    pub fn news(pipeline: Arc<ResearchPipeline>, engine: Arc<dyn ReasoningEngine>) -> Self {
        Self::new("news_researcher", SearchKind::News, pipeline, engine)
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn with_distill_chars(mut self, chars: usize) -> Self {
        self.distill_chars = chars;
        self
    }
}

/// 来源清单：每个尝试过的 URL 一行，失败项附带原因
fn sources_section(evidence: &EvidenceSet) -> String {
    evidence
        .items
        .iter()
        .map(|item| match &item.error {
            None => format!("- {}", item.url),
            Some(e) => format!("- {} (failed: {})", item.url, e),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for ResearchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_hint(&self) -> &str {
        "A specific search query; it is the only input passed to the tool"
    }

    async fn execute(&self, input: &str) -> Result<String, AgentError> {
        let evidence = self
            .pipeline
            .research(input, self.max_results, self.kind)
            .await?;

        if evidence.is_empty() {
            return Ok(format!("No search results found for \"{input}\"."));
        }
        if evidence.succeeded() == 0 {
            return Ok(format!(
                "No usable content could be retrieved for \"{input}\". Sources attempted:\n{}",
                sources_section(&evidence)
            ));
        }

        let digest = truncate_chars(&evidence.digest_text(), self.distill_chars);
        let summary = self
            .engine
            .complete(&summarizer_prompt(&digest, input))
            .await
            .map_err(AgentError::ReasoningUnavailable)?;

        Ok(format!(
            "{}\nSources:\n{}",
            summary.trim(),
            sources_section(&evidence)
        ))
    }
}
