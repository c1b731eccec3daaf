//! 工具层：动作注册表、执行器、研究工具与结构化动作 Schema

pub mod executor;
pub mod registry;
pub mod research;
pub mod schema;

pub use executor::ToolExecutor;
pub use registry::{RegisteredAction, Tool, ToolRegistry, FINALIZE_ACTION};
pub use research::{ResearchTool, DEFAULT_DISTILL_CHARS};
pub use schema::planned_action_schema_json;
