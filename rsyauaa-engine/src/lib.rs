// 核心公共结构体：语法树、词区间、规则定义、结果接收器
pub mod core;
// 错误类型
pub mod error;
// 分段器（单词/版本号）
pub mod splitter;
// 查找表与集合
pub mod lookup;
// 步骤链：单步语义 + 链式遍历
pub mod walk;
// 路径表达式解析 + 编译
pub mod compiler;
// 语法树扁平化
pub mod flattener;
// 规则动作、匹配器状态、字段仲裁
pub mod matcher;
// 规则索引构建 + 编译规则库
pub mod indexer;
// 规则源解析 (JSON)
pub mod source;
// 日志格式化工具
pub mod utils;

// 顶层导出常用类型
pub use self::core::{
    ExtractDefinition, LookupDefinition, MatcherDefinition, NodeId, NodeKind, ResultSink,
    RuleLibrary, RuleSource, SetDefinition, SyntaxTree, TreeBuilder, WordRange, AGENT, SYNTAX_ERROR,
};
pub use error::{CoreError, CoreResult};
pub use flattener::{Analyzer, TreeFlattener};
pub use indexer::{CompiledRuleLibrary, RuleIndexer};
pub use matcher::{AnalyzeOptions, AnalyzeReport, ConfidenceCollision};
pub use source::JsonRuleParser;
pub use splitter::{Splitter, SplitterKind, VersionSplitter, WordSplitter};
pub use walk::{clean_version, normalize_brand};
