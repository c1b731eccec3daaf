//! 核心层：错误与恢复、运行状态与 Scratchpad、限流重试

pub mod error;
pub mod recovery;
pub mod retry;
pub mod state;

pub use error::{AgentError, FetchError, RecoveryAction, SearchError};
pub use recovery::{RecoveryEngine, StallPolicy};
pub use retry::RetryPolicy;
pub use state::{
    LoopPhase, PlannedAction, Query, RunFailure, RunReport, RunStatus, Scratchpad,
    ScratchpadEntry, TaskState,
};
