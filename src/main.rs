//! Forager - 迭代式研究智能体
//!
//! 入口：解析命令行、加载配置、装配研究循环并运行；Ctrl-C 取消当前运行。
//! stdout 输出带步号的 Scratchpad 轨迹与最终回答，日志走 stderr。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use forager::config::{load_config, AppConfig};
use forager::{agent, observability, RunStatus, Scratchpad};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "forager", version, about = "Iterative web research agent")]
struct Cli {
    /// 研究问题（多个参数以空格拼接）
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// 额外的 TOML 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 把 Scratchpad 以 JSON 写入该文件
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

fn print_trace(scratchpad: &Scratchpad) {
    if scratchpad.is_empty() {
        println!("(no steps recorded)");
    } else {
        println!("{}", scratchpad.render());
    }
}

fn write_trace_json(path: &PathBuf, scratchpad: &Scratchpad) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(scratchpad)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write trace to {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cli = Cli::parse();
    let query = cli.query.join(" ");

    let cfg = match load_config(cli.config.clone()) {
        Ok(cfg) => cfg,
        Err(e) if cli.config.is_some() => {
            return Err(e).context("Failed to load config file");
        }
        Err(e) => {
            tracing::warn!("Config load failed ({}), using defaults", e);
            AppConfig::default()
        }
    };

    let cancel_token = CancellationToken::new();
    let research_loop = agent::build_research_loop(&cfg, cancel_token.clone())
        .context("Failed to build research loop")?;

    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            ctrl_c_token.cancel();
        }
    });

    let outcome = research_loop.run(&query).await;

    let scratchpad = match &outcome {
        Ok(report) => &report.scratchpad,
        Err(failure) => &failure.scratchpad,
    };
    print_trace(scratchpad);
    if let Some(path) = &cli.trace_json {
        write_trace_json(path, scratchpad)?;
    }

    match outcome {
        Ok(report) => {
            match (report.status, report.answer) {
                (RunStatus::Done, Some(answer)) => println!("\nFinal Answer:\n{answer}"),
                _ => println!(
                    "\nFinal Answer: (none, iteration budget exhausted after {} steps)",
                    report.iterations
                ),
            }
            Ok(())
        }
        Err(failure) => Err(anyhow::Error::new(failure).context("Research run failed")),
    }
}
