//! rsyauaa - 规则驱动的高性能 User-Agent 分析库

pub mod analyzer;
pub mod config;
pub mod error;
pub mod parser;
pub mod result;
pub mod rule;

// 导出全局错误类型
pub use self::error::{RsyError, RsyResult};

// 导出配置模块核心结构体与构建器
pub use crate::config::{AnalyzerConfig, CustomConfigBuilder, RuleOrigin};

// 导出分析模块核心接口（含全局单例封装）
pub use crate::analyzer::{
    global_analyzer, global_analyzer_initialized, init_global_analyzer,
    init_global_analyzer_with_rules, parse, UserAgentAnalyzer,
};

// 导出解析结果
pub use crate::result::{AgentField, MatchedKey, UserAgent, UNKNOWN_VALUE, UNSET_CONFIDENCE};

// 导出规则加载器
pub use crate::rule::RuleLoader;

// 导出匹配引擎中常用的规则与树结构
pub use rsyauaa_engine::{
    CompiledRuleLibrary, JsonRuleParser, MatcherDefinition, RuleLibrary, SyntaxTree,
};
