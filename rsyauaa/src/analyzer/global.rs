//! 全局分析器单例管理
//! 核心职责：
//! 1. 维护进程生命周期内唯一的 UserAgentAnalyzer 实例
//! 2. 支持按配置初始化、手动注入规则库、懒加载默认配置
use once_cell::sync::OnceCell;
use rsyauaa_engine::RuleLibrary;

use super::ua_analyzer::UserAgentAnalyzer;
use crate::config::AnalyzerConfig;
use crate::error::{RsyError, RsyResult};
use crate::result::UserAgent;

static GLOBAL_ANALYZER: OnceCell<UserAgentAnalyzer> = OnceCell::new();

/// 初始化全局分析器
/// 幂等：已初始化则直接返回 Ok(())
pub fn init_global_analyzer(config: AnalyzerConfig) -> RsyResult<()> {
    if GLOBAL_ANALYZER.get().is_some() {
        log::debug!("Global analyzer already initialized, skip reinitialization");
        return Ok(());
    }
    let analyzer = UserAgentAnalyzer::new(config).map_err(|e| {
        RsyError::AnalyzerInitError(format!("Failed to create UserAgentAnalyzer instance: {}", e))
    })?;
    install(analyzer)?;
    log::info!("Global UserAgentAnalyzer initialized successfully");
    Ok(())
}

/// 手动注入规则库，初始化全局分析器
pub fn init_global_analyzer_with_rules(rule_lib: RuleLibrary, config: AnalyzerConfig) -> RsyResult<()> {
    if GLOBAL_ANALYZER.get().is_some() {
        log::debug!("Global analyzer already initialized, skip reinitialization with custom rules");
        return Ok(());
    }
    let analyzer = UserAgentAnalyzer::with_rules(rule_lib, config).map_err(|e| {
        RsyError::AnalyzerInitError(format!(
            "Failed to create UserAgentAnalyzer with custom rules: {}",
            e
        ))
    })?;
    install(analyzer)?;
    log::info!("Global UserAgentAnalyzer initialized with custom rule library");
    Ok(())
}

fn install(analyzer: UserAgentAnalyzer) -> RsyResult<()> {
    // 并发初始化时只有一个能成功，另一方的实例直接丢弃
    if GLOBAL_ANALYZER.set(analyzer).is_err() {
        log::debug!("Global analyzer was initialized concurrently, keeping the first instance");
    }
    Ok(())
}

/// 获取全局分析器，未初始化时使用默认配置懒加载
pub fn global_analyzer() -> RsyResult<&'static UserAgentAnalyzer> {
    GLOBAL_ANALYZER.get_or_try_init(|| {
        log::debug!("Lazy initializing global UserAgentAnalyzer with default config");
        UserAgentAnalyzer::new(AnalyzerConfig::default())
    })
}

/// 获取全局分析器（不自动初始化）
pub fn global_analyzer_initialized() -> RsyResult<&'static UserAgentAnalyzer> {
    GLOBAL_ANALYZER.get().ok_or_else(|| {
        RsyError::AnalyzerNotInitialized(
            "Global UserAgentAnalyzer not initialized! Please call init_global_analyzer first"
                .to_string(),
        )
    })
}

/// 使用全局分析器解析
pub fn parse(user_agent: &str) -> RsyResult<UserAgent> {
    global_analyzer()?.parse(user_agent)
}
