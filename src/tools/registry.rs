//! 动作注册表
//!
//! 启动时一次性声明：研究工具按名注册（实现 Tool trait），另有一个固定的 finalize 动作。
//! 研究循环只通过 `resolve` 把推理引擎给出的动作名映射到处理方式，不做任何运行期反射。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::AgentError;

/// 研究工具：名称、描述与输入说明（供推理引擎理解），异步执行返回 Observation 文本
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（对应 prompt 中的 Action）
    fn name(&self) -> &str;

    /// 工具描述（供推理引擎理解功能）
    fn description(&self) -> &str;

    /// 对 Action Input 的要求
    fn input_hint(&self) -> &str {
        "Free text input"
    }

    async fn execute(&self, input: &str) -> Result<String, AgentError>;
}

/// finalize 动作名
pub const FINALIZE_ACTION: &str = "prepare_answer";

/// 动作名解析结果
#[derive(Clone)]
pub enum RegisteredAction {
    Research(Arc<dyn Tool>),
    Finalize,
}

/// 工具注册表：保持注册顺序（决定 prompt 中的展示顺序）
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// 同名工具后注册者覆盖先注册者
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(Arc::new(tool));
    }

    pub fn finalize_name(&self) -> &str {
        FINALIZE_ACTION
    }

    pub fn resolve(&self, name: &str) -> Option<RegisteredAction> {
        if name == FINALIZE_ACTION {
            return Some(RegisteredAction::Finalize);
        }
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .map(RegisteredAction::Research)
    }

    /// 全部动作名（研究工具 + finalize）
    pub fn action_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|t| t.name().to_string())
            .chain(std::iter::once(FINALIZE_ACTION.to_string()))
            .collect()
    }

    /// 生成 prompt 中的工具清单（JSON 数组：name / description / input）
    pub fn to_manifest_json(&self) -> String {
        let mut entries: Vec<serde_json::Value> = self
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input": t.input_hint(),
                })
            })
            .collect();
        entries.push(json!({
            "name": FINALIZE_ACTION,
            "description": "Useful for preparing the final answer from collected information",
            "input": "No input required; the full scratchpad is used to prepare the answer",
        }));
        serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl Tool for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "fixed"
        }

        async fn execute(&self, input: &str) -> Result<String, AgentError> {
            Ok(format!("{}:{}", self.0, input))
        }
    }

    #[tokio::test]
    async fn test_resolve_research_and_finalize() {
        let mut registry = ToolRegistry::new();
        registry.register(Fixed("internet_researcher"));
        match registry.resolve("internet_researcher") {
            Some(RegisteredAction::Research(tool)) => {
                assert_eq!(tool.execute("x").await.unwrap(), "internet_researcher:x");
            }
            _ => panic!("Expected research tool"),
        }
        assert!(matches!(
            registry.resolve(FINALIZE_ACTION),
            Some(RegisteredAction::Finalize)
        ));
        assert!(registry.resolve("calculator").is_none());
    }

    #[test]
    fn test_manifest_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Fixed("internet_researcher"));
        registry.register(Fixed("news_researcher"));
        assert_eq!(
            registry.action_names(),
            vec!["internet_researcher", "news_researcher", "prepare_answer"]
        );
        let manifest: Vec<serde_json::Value> =
            serde_json::from_str(&registry.to_manifest_json()).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest[2]["name"], "prepare_answer");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Fixed("a"));
        registry.register(Fixed("a"));
        assert_eq!(registry.action_names(), vec!["a", "prepare_answer"]);
    }
}
