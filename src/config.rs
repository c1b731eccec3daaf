//! 应用配置：从 config/default.toml、--config 文件与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FORAGER__*` 覆盖（双下划线表示嵌套，如 `FORAGER__SEARCH__MAX_RESULTS=8`）。
//! API Key 只从环境变量读取（`DEEPSEEK_API_KEY` / `OPENAI_API_KEY`），不进入配置文件。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::{RetryPolicy, StallPolicy};
use crate::research::{PipelineSettings, DEFAULT_USER_AGENT};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub search: SearchSection,
    pub fetch: FetchSection,
    pub ranking: RankingSection,
    pub orchestrator: OrchestratorSection,
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；最终选择还取决于环境中是否有 API Key
    pub provider: String,
    pub model: Option<String>,
    /// OpenAI 兼容端点；deepseek 后端未配置时默认 https://api.deepseek.com
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: None,
            base_url: None,
        }
    }
}

/// [search] 段：搜索后端、结果数与限流重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// duckduckgo / searxng
    pub provider: String,
    pub searxng_url: Option<String>,
    pub max_results: usize,
    pub timeout_secs: u64,
    /// 含首次调用在内的总尝试次数
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            searxng_url: None,
            max_results: 5,
            timeout_secs: 15,
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

impl SearchSection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// [fetch] 段：抓取超时、并发上限、fan-out 截止时间与单条证据字符上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub max_in_flight: usize,
    pub fanout_deadline_secs: u64,
    pub max_evidence_chars: usize,
    pub user_agent: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            timeout_secs: 15,
            max_in_flight: 4,
            fanout_deadline_secs: 30,
            max_evidence_chars: 1500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// [ranking] 段：是否启用相关性排序及切片参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingSection {
    pub enabled: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RankingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: 1000,
            chunk_overlap: 50,
        }
    }
}

/// [orchestrator] 段：迭代预算、摘要输入预算与重复动作策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub max_iterations: usize,
    pub distill_char_budget: usize,
    pub stall_policy: StallPolicy,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_iterations: 12,
            distill_char_budget: 7800,
            stall_policy: StallPolicy::WarnThenFail,
        }
    }
}

impl AppConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_in_flight: self.fetch.max_in_flight.max(1),
            fanout_deadline: Duration::from_secs(self.fetch.fanout_deadline_secs),
            chunk_size: self.ranking.chunk_size,
            chunk_overlap: self.ranking.chunk_overlap,
        }
    }
}

/// 加载配置，环境变量 FORAGER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（可覆盖前面的键）；显式指定的文件不存在视为错误
/// 3. 最后叠加环境变量 FORAGER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "default"] {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("FORAGER")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.search.max_results, 5);
        assert_eq!(cfg.search.max_attempts, 5);
        assert_eq!(cfg.fetch.max_in_flight, 4);
        assert_eq!(cfg.fetch.max_evidence_chars, 1500);
        assert_eq!(cfg.orchestrator.max_iterations, 12);
        assert_eq!(cfg.orchestrator.distill_char_budget, 7800);
        assert!(cfg.ranking.enabled);
        assert_eq!(cfg.search.retry_policy().delay_for(1), Duration::from_millis(500));
    }

    #[test]
    fn test_file_overrides_keep_other_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[search]\nprovider = \"searxng\"\nsearxng_url = \"http://localhost:8888\"\nmax_results = 8\n\n[orchestrator]\nstall_policy = \"fail\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.search.provider, "searxng");
        assert_eq!(cfg.search.searxng_url.as_deref(), Some("http://localhost:8888"));
        assert_eq!(cfg.search.max_results, 8);
        assert_eq!(cfg.search.timeout_secs, 15);
        assert_eq!(cfg.orchestrator.stall_policy, StallPolicy::Fail);
        assert_eq!(cfg.orchestrator.max_iterations, 12);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("nope.toml"))).is_err());
    }
}
