//! 分析模块：分析器与全局单例
pub mod global;
pub mod ua_analyzer;

pub use self::global::{
    global_analyzer, global_analyzer_initialized, init_global_analyzer,
    init_global_analyzer_with_rules, parse,
};
pub use self::ua_analyzer::UserAgentAnalyzer;
