//! 认知层：Prompt 模板、Planner 与研究主循环

pub mod loop_;
pub mod planner;
pub mod prompts;

pub use loop_::ResearchLoop;
pub use planner::{parse_planner_output, Planner};
