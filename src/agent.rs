//! 组件装配：按配置构建推理引擎、研究流水线、工具注册表与研究循环
//!
//! create_engine 按 provider 与环境中的 API Key 选择后端（没有 Key 时退回 Mock），
//! build_research_loop 组装 CLI 使用的完整 ResearchLoop。

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::core::{AgentError, RecoveryEngine};
use crate::llm::{MockEngine, OpenAiEngine, ReasoningEngine};
use crate::react::{Planner, ResearchLoop};
use crate::research::{
    build_http_client, ContentExtractor, DuckDuckGoSearch, HttpFetcher, KeywordRanker,
    ResearchPipeline, SearchProvider, SearxngSearch,
};
use crate::tools::{ResearchTool, ToolExecutor, ToolRegistry};

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const DEEPSEEK_MODEL: &str = "deepseek-chat";
const OPENAI_MODEL: &str = "gpt-4o-mini";

/// 选定的推理后端；远程后端都走 OpenAI 兼容协议，只是端点与默认模型不同
#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    Mock,
    Remote {
        label: &'static str,
        base_url: Option<String>,
        model: String,
        api_key: String,
    },
}

/// 根据 [llm] 配置与可用 Key 决定后端
///
/// deepseek 优先用 DEEPSEEK_API_KEY，没有时借用 OPENAI_API_KEY；base_url/model 未配置时取 DeepSeek 默认值。
fn select_backend(
    cfg: &AppConfig,
    deepseek_key: Option<String>,
    openai_key: Option<String>,
) -> Backend {
    let provider = cfg.llm.provider.to_lowercase();
    match provider.as_str() {
        "mock" => Backend::Mock,
        "openai" => match openai_key {
            Some(api_key) => Backend::Remote {
                label: "openai",
                base_url: cfg.llm.base_url.clone(),
                model: cfg.llm.model.clone().unwrap_or_else(|| OPENAI_MODEL.to_string()),
                api_key,
            },
            None => Backend::Mock,
        },
        _ => match deepseek_key.or(openai_key) {
            Some(api_key) => Backend::Remote {
                label: "deepseek",
                base_url: Some(
                    cfg.llm
                        .base_url
                        .clone()
                        .unwrap_or_else(|| DEEPSEEK_BASE_URL.to_string()),
                ),
                model: cfg.llm.model.clone().unwrap_or_else(|| DEEPSEEK_MODEL.to_string()),
                api_key,
            },
            None => Backend::Mock,
        },
    }
}

/// 按配置选择推理引擎
pub fn create_engine(cfg: &AppConfig) -> Arc<dyn ReasoningEngine> {
    let backend = select_backend(
        cfg,
        std::env::var("DEEPSEEK_API_KEY").ok(),
        std::env::var("OPENAI_API_KEY").ok(),
    );
    match backend {
        Backend::Remote {
            label,
            base_url,
            model,
            api_key,
        } => {
            tracing::info!(backend = label, model = %model, "Using remote reasoning engine");
            Arc::new(OpenAiEngine::new(
                base_url.as_deref(),
                &model,
                Some(api_key.as_str()),
            ))
        }
        Backend::Mock => {
            if cfg.llm.provider.eq_ignore_ascii_case("mock") {
                tracing::info!("Using mock reasoning engine");
            } else {
                tracing::warn!(provider = %cfg.llm.provider, "No API key set, using mock reasoning engine");
            }
            Arc::new(MockEngine)
        }
    }
}

/// 按配置选择搜索后端
pub fn create_search_provider(cfg: &AppConfig) -> Result<Arc<dyn SearchProvider>, AgentError> {
    let client = build_http_client(
        Duration::from_secs(cfg.fetch.connect_timeout_secs),
        Duration::from_secs(cfg.search.timeout_secs),
        &cfg.fetch.user_agent,
    )?;
    match cfg.search.provider.to_lowercase().as_str() {
        "duckduckgo" | "ddg" => Ok(Arc::new(DuckDuckGoSearch::new(client))),
        "searxng" => {
            let url = cfg.search.searxng_url.as_deref().ok_or_else(|| {
                AgentError::ConfigError("search.searxng_url is required for searxng".to_string())
            })?;
            Ok(Arc::new(SearxngSearch::new(client, url)))
        }
        other => Err(AgentError::ConfigError(format!(
            "unknown search provider: {other}"
        ))),
    }
}

/// 组装研究流水线（web 与 news 工具共享同一条流水线与连接池）
pub fn create_pipeline(
    cfg: &AppConfig,
    cancel_token: CancellationToken,
) -> Result<ResearchPipeline, AgentError> {
    let fetch_client = build_http_client(
        Duration::from_secs(cfg.fetch.connect_timeout_secs),
        Duration::from_secs(cfg.fetch.timeout_secs),
        &cfg.fetch.user_agent,
    )?;

    let mut pipeline = ResearchPipeline::new(
        create_search_provider(cfg)?,
        Arc::new(HttpFetcher::new(fetch_client)),
        ContentExtractor::new(cfg.fetch.max_evidence_chars),
    )
    .with_retry(cfg.search.retry_policy())
    .with_settings(cfg.pipeline_settings())
    .with_cancel_token(cancel_token);

    if cfg.ranking.enabled {
        pipeline = pipeline.with_ranker(Arc::new(KeywordRanker::new()));
    }
    Ok(pipeline)
}

/// 注册 internet_researcher / news_researcher 两个研究工具
pub fn create_registry(
    cfg: &AppConfig,
    pipeline: Arc<ResearchPipeline>,
    engine: Arc<dyn ReasoningEngine>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ResearchTool::web(pipeline.clone(), engine.clone())
            .with_max_results(cfg.search.max_results)
            .with_distill_chars(cfg.orchestrator.distill_char_budget),
    );
    registry.register(
        ResearchTool::news(pipeline, engine)
            .with_max_results(cfg.search.max_results)
            .with_distill_chars(cfg.orchestrator.distill_char_budget),
    );
    registry
}

/// 构建完整研究循环
pub fn build_research_loop(
    cfg: &AppConfig,
    cancel_token: CancellationToken,
) -> Result<ResearchLoop, AgentError> {
    let engine = create_engine(cfg);
    build_research_loop_with_engine(cfg, engine, cancel_token)
}

/// 使用外部提供的推理引擎构建研究循环
pub fn build_research_loop_with_engine(
    cfg: &AppConfig,
    engine: Arc<dyn ReasoningEngine>,
    cancel_token: CancellationToken,
) -> Result<ResearchLoop, AgentError> {
    let pipeline = Arc::new(create_pipeline(cfg, cancel_token.clone())?);
    let registry = create_registry(cfg, pipeline, engine.clone());

    Ok(ResearchLoop::new(Planner::new(engine), ToolExecutor::new(registry))
        .with_recovery(RecoveryEngine::new(cfg.orchestrator.stall_policy))
        .with_max_iterations(cfg.orchestrator.max_iterations)
        .with_cancel_token(cancel_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_is_explicit() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        let engine = create_engine(&cfg);
        assert_eq!(engine.token_usage(), (0, 0, 0));
    }

    #[test]
    fn test_deepseek_defaults_and_key_fallback() {
        let cfg = AppConfig::default();
        assert_eq!(select_backend(&cfg, None, None), Backend::Mock);
        assert_eq!(
            select_backend(&cfg, None, Some("sk-openai".to_string())),
            Backend::Remote {
                label: "deepseek",
                base_url: Some("https://api.deepseek.com".to_string()),
                model: "deepseek-chat".to_string(),
                api_key: "sk-openai".to_string(),
            }
        );
    }

    #[test]
    fn test_llm_section_overrides_endpoint_and_model() {
        let mut cfg = AppConfig::default();
        cfg.llm.base_url = Some("http://localhost:9000/v1".to_string());
        cfg.llm.model = Some("deepseek-reasoner".to_string());
        let backend = select_backend(&cfg, Some("sk-ds".to_string()), Some("sk-openai".to_string()));
        assert_eq!(
            backend,
            Backend::Remote {
                label: "deepseek",
                base_url: Some("http://localhost:9000/v1".to_string()),
                model: "deepseek-reasoner".to_string(),
                api_key: "sk-ds".to_string(),
            }
        );

        cfg.llm.provider = "openai".to_string();
        cfg.llm.model = None;
        assert_eq!(select_backend(&cfg, Some("sk-ds".to_string()), None), Backend::Mock);
        assert!(matches!(
            select_backend(&cfg, None, Some("sk-openai".to_string())),
            Backend::Remote { label: "openai", ref model, .. } if model == "gpt-4o-mini"
        ));
    }

    #[test]
    fn test_searxng_requires_url() {
        let mut cfg = AppConfig::default();
        cfg.search.provider = "searxng".to_string();
        assert!(matches!(
            create_search_provider(&cfg),
            Err(AgentError::ConfigError(_))
        ));
        cfg.search.searxng_url = Some("http://localhost:8888".to_string());
        assert!(create_search_provider(&cfg).is_ok());
    }

    #[test]
    fn test_unknown_search_provider() {
        let mut cfg = AppConfig::default();
        cfg.search.provider = "altavista".to_string();
        assert!(create_search_provider(&cfg).is_err());
    }

    #[test]
    fn test_build_loop_from_defaults() {
        let cfg = AppConfig::default();
        let token = CancellationToken::new();
        let research_loop = build_research_loop_with_engine(&cfg, Arc::new(MockEngine), token.clone());
        assert!(research_loop.is_ok());
    }
}
