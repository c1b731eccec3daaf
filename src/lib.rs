//! Forager - 迭代式研究智能体
//!
//! 模块划分：
//! - **agent**: 按配置装配推理引擎、研究流水线、工具与研究循环
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、TaskState / Scratchpad、限流重试
//! - **llm**: 推理引擎抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **research**: 搜索、抓取、正文抽取、相关性排序与并发研究流水线
//! - **react**: Prompt 模板、Planner、研究主循环
//! - **tools**: 动作注册表、执行器与研究工具

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod react;
pub mod research;
pub mod tools;

pub use crate::core::{AgentError, RunFailure, RunReport, RunStatus, Scratchpad};
pub use crate::react::ResearchLoop;
