//! Prompt 模板：规划、摘要、最终回答
//!
//! 每类 prompt 以固定的开头标识，Mock 引擎据此区分调用类型。
//! 规划 prompt 中 `Current scratchpad:` 一节固定放在最后。

/// 规划 prompt 标识
pub const PLANNER_MARKER: &str = "You are a planner agent";
/// 摘要 prompt 标识
pub const SUMMARIZER_MARKER: &str = "You are a summarizer";
/// 最终回答 prompt 标识
pub const FINAL_MARKER: &str = "Use the research notes below";

/// Scratchpad 为空时的占位
pub const EMPTY_SCRATCHPAD: &str = "(empty)";

/// 规划 prompt 的输入
pub struct PlannerPrompt<'a> {
    pub query: &'a str,
    pub scratchpad: &'a str,
    /// 工具清单（JSON）
    pub tools: &'a str,
    pub finalize_name: &'a str,
    /// PlannedAction 的 JSON Schema；为空则不提示 JSON 输出
    pub schema: &'a str,
    pub warning: Option<&'a str>,
}

impl PlannerPrompt<'_> {
    pub fn render(&self) -> String {
        let mut prompt = format!(
            "{PLANNER_MARKER} equipped with high-level tools to solve user questions.\n\
             Based on the query and scratchpad, decide the next task and pick one tool to execute it. \
             Try to be specific in your input to the tool to get the best results.\n\
             Do not repeat the same tool with the same input if it already appears in the scratchpad; \
             it will not give a different result.\n\n\
             You can use these tools:\n{tools}\n\n\
             Use this exact format for your reasoning:\n\
             Task: Describe your thinking or what you need to do.\n\
             Action: The tool name to use (exact match from the above list).\n\
             Action Input: The input string for that tool. Be as specific as possible as this will be the only input passed to the tool.\n\
             Action Output: (Leave this blank, it will be filled after the tool is called.)\n\n\
             Guidelines:\n\
             - Think step-by-step.\n\
             - Use one tool per step.\n\
             - Call `{finalize}` only when enough information has been gathered.\n",
            tools = self.tools,
            finalize = self.finalize_name,
        );

        if !self.schema.is_empty() {
            prompt.push_str(
                "\nInstead of the text format you may reply with a single JSON object matching this schema:\n",
            );
            prompt.push_str(self.schema);
            prompt.push('\n');
        }

        if let Some(warning) = self.warning {
            prompt.push('\n');
            prompt.push_str(warning);
            prompt.push('\n');
        }

        let scratchpad = if self.scratchpad.trim().is_empty() {
            EMPTY_SCRATCHPAD
        } else {
            self.scratchpad
        };
        prompt.push_str(&format!(
            "\nQuery: {}\n\nCurrent scratchpad:\n{}\n",
            self.query, scratchpad
        ));
        prompt
    }
}

/// 研究工具的摘要 prompt
pub fn summarizer_prompt(content: &str, topic: &str) -> String {
    format!(
        "{SUMMARIZER_MARKER}. Here is the raw content from the search results:\n{content}\n\n\
         Provide a clear and concise summary of your findings in less than 1000 tokens. \
         The topic is: {topic}.\n"
    )
}

/// 最终回答 prompt：只基于 Scratchpad 作答，不编造信息
pub fn final_prompt(query: &str, scratchpad: &str) -> String {
    format!(
        "You are a helpful assistant. {FINAL_MARKER} to provide a complete and final answer to the original query.\n\
         Do not make up any information. If the information is insufficient, state that clearly.\n\n\
         Query: {query}\n\n\
         Scratchpad:\n{scratchpad}\n\n\
         Final Answer:\n"
    )
}
