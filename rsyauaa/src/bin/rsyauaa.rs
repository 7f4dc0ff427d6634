//! rsyauaa 命令行工具
//! 功能说明：
//! 1. 解析命令行参数中的 User-Agent，未提供时逐行读取标准输入
//! 2. 支持内置规则或本地规则文件/目录
//! 3. 每条结果输出一行 JSON（--pretty 时格式化输出）
//!
//! 运行命令：
//! cargo run -p rsyauaa --features cli -- "Mozilla/5.0 (X11; Linux x86_64) ..."
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use env_logger::{Builder, Env, Target};
use rsyauaa::{AnalyzerConfig, CustomConfigBuilder, RsyResult, RuleOrigin, UserAgentAnalyzer};

#[derive(Debug, Parser)]
#[command(name = "rsyauaa", version, about = "Rule-driven User-Agent analyzer")]
struct Cli {
    /// 待解析的 User-Agent，留空则读取标准输入（每行一条）
    user_agents: Vec<String>,

    /// 本地规则文件或目录（默认使用内置规则）
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// 格式化 JSON 输出
    #[arg(short, long)]
    pretty: bool,

    /// 在结果中附带命中的匹配键
    #[arg(long)]
    keep_matches: bool,

    /// 输入最大长度
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_MAX_USER_AGENT_LENGTH)]
    max_length: usize,
}

fn main() -> RsyResult<()> {
    Builder::from_env(Env::default().default_filter_or("warn"))
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();
    let origin = match &cli.rules {
        Some(path) => RuleOrigin::LocalFile(path.clone()),
        None => RuleOrigin::Embedded,
    };
    let config = CustomConfigBuilder::new()
        .origin(origin)
        .keep_matches(cli.keep_matches)
        .max_user_agent_length(cli.max_length)
        .build();
    let analyzer = UserAgentAnalyzer::new(config)?;
    log::info!("Analyzer ready | Matchers: {}", analyzer.compiled_lib().matchers().len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.user_agents.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            emit(&mut out, &analyzer, &line, cli.pretty)?;
        }
    } else {
        for user_agent in &cli.user_agents {
            emit(&mut out, &analyzer, user_agent, cli.pretty)?;
        }
    }
    Ok(())
}

fn emit(
    out: &mut impl Write,
    analyzer: &UserAgentAnalyzer,
    user_agent: &str,
    pretty: bool,
) -> RsyResult<()> {
    let json = analyzer.parse(user_agent)?.to_json(pretty)?;
    writeln!(out, "{}", json)?;
    Ok(())
}
