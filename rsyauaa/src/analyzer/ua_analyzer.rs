//! User-Agent 分析器核心
//! 核心职责：
//! 1. 规则库加载与编译（内置/本地/内存文档）
//! 2. 输入守卫 → 分词建树 → 规则匹配 → 派生字段
//! 3. 编译规则库只读共享，每次解析的状态都留在调用栈内
use std::sync::Arc;
use std::time::Instant;

use rsyauaa_engine::utils::preview_compact;
use rsyauaa_engine::{
    AnalyzeOptions, CompiledRuleLibrary, ResultSink, RuleIndexer, RuleLibrary, SYNTAX_ERROR,
};

use crate::config::{AnalyzerConfig, RuleOrigin};
use crate::error::{RsyError, RsyResult};
use crate::parser::{parse_user_agent, UaInputGuard};
use crate::result::{calculate_derived_fields, MatchedKey, UserAgent};
use crate::rule::RuleLoader;

/// 内置规则编译结果：进程内只编译一次
#[cfg(feature = "embedded-rules")]
static EMBEDDED_COMPILED_LIB: once_cell::sync::Lazy<Result<Arc<CompiledRuleLibrary>, String>> =
    once_cell::sync::Lazy::new(|| {
        let library = RuleLoader::new()
            .load_embedded()
            .map_err(|e| e.to_string())?;
        RuleIndexer::build_compiled_library(&library)
            .map(Arc::new)
            .map_err(|e| e.to_string())
    });

/// User-Agent 分析器
/// 设计说明：
/// - compiled_lib: 编译后的规则库（Arc共享，多个分析器/线程复用）
/// - config: 分析器配置
#[derive(Debug, Clone)]
pub struct UserAgentAnalyzer {
    compiled_lib: Arc<CompiledRuleLibrary>,
    config: AnalyzerConfig,
}

impl UserAgentAnalyzer {
    /// 按配置中的规则来源创建分析器
    pub fn new(config: AnalyzerConfig) -> RsyResult<Self> {
        match &config.origin {
            RuleOrigin::Embedded => Self::with_embedded_rules(config),
            origin => {
                let started = Instant::now();
                let rule_lib = RuleLoader::new().load(origin)?;
                log::debug!("Rules loaded | Elapsed: {:?}", started.elapsed());
                Self::with_rules(rule_lib, config)
            }
        }
    }

    /// 使用内存中的规则库创建分析器
    pub fn with_rules(rule_lib: RuleLibrary, config: AnalyzerConfig) -> RsyResult<Self> {
        let compiled_lib = RuleIndexer::build_compiled_library(&rule_lib)?;
        Self::with_compiled_lib(Arc::new(compiled_lib), config)
    }

    #[cfg(feature = "embedded-rules")]
    pub fn with_embedded_rules(config: AnalyzerConfig) -> RsyResult<Self> {
        let compiled_lib = (*EMBEDDED_COMPILED_LIB)
            .as_ref()
            .map_err(|e| RsyError::AnalyzerInitError(format!("内置规则编译失败: {}", e)))?;
        Self::with_compiled_lib(Arc::clone(compiled_lib), config)
    }

    #[cfg(not(feature = "embedded-rules"))]
    pub fn with_embedded_rules(_config: AnalyzerConfig) -> RsyResult<Self> {
        Err(RsyError::FeatureDisabled(
            "embedded-rules feature is disabled, cannot use embedded rule library".to_string(),
        ))
    }

    /// 复用已编译的规则库，配置不合法时返回 InvalidInput
    pub fn with_compiled_lib(
        compiled_lib: Arc<CompiledRuleLibrary>,
        config: AnalyzerConfig,
    ) -> RsyResult<Self> {
        config.validate()?;
        Ok(Self {
            compiled_lib,
            config,
        })
    }

    pub fn compiled_lib(&self) -> &CompiledRuleLibrary {
        &self.compiled_lib
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// 解析一条 User-Agent
    /// 畸形输入不会报错：最坏情况是语法错误标志为 true、其余字段为默认值
    pub fn parse(&self, user_agent: &str) -> RsyResult<UserAgent> {
        let started = Instant::now();
        let input = UaInputGuard::guard(user_agent, self.config.max_user_agent_length);
        let tree = parse_user_agent(&input)?;

        let mut result = UserAgent::new(input.as_ref());
        let flag = if tree.has_syntax_error() { "true" } else { "false" };
        result.set(SYNTAX_ERROR, flag, 0);

        let options = AnalyzeOptions {
            keep_matches: self.config.keep_matches,
        };
        let report = self.compiled_lib.analyze_with(&tree, &mut result, options)?;

        if self.config.keep_matches {
            let matches = report
                .matches
                .entries()
                .iter()
                .map(|m| MatchedKey {
                    key: m.key.clone(),
                    value: m.value.clone(),
                })
                .collect();
            result.set_matches(matches);
        }
        if self.config.calculate_derived_fields {
            calculate_derived_fields(&mut result);
        }

        log::debug!(
            "User-Agent parsed | Input: {} | Fired: {} | Collisions: {} | Elapsed: {:?}",
            preview_compact(&input, 96),
            report.fired_matchers,
            report.collisions.len(),
            started.elapsed()
        );
        Ok(result)
    }
}
