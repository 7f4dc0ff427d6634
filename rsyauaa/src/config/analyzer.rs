//! 分析器配置
use std::path::PathBuf;

use crate::error::{RsyError, RsyResult};

/// 规则来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOrigin {
    Embedded,           // 内置规则（编译期 include）
    LocalFile(PathBuf), // 本地 JSON 文件或目录（运行时）
    Inline(String),     // 内存中的 JSON 文档
}

/// 完整分析器配置
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub origin: RuleOrigin,
    /// 超长输入在分词前按字符边界截断
    pub max_user_agent_length: usize,
    /// 是否计算派生字段（AgentVersionMajor 等）
    pub calculate_derived_fields: bool,
    /// 是否在结果中保留命中明细（诊断用）
    pub keep_matches: bool,
}

impl AnalyzerConfig {
    pub const DEFAULT_MAX_USER_AGENT_LENGTH: usize = 2048;

    /// 内置规则
    pub fn embedded() -> Self {
        Self::default()
    }

    /// 本地规则文件（单个 .json 或包含 .json 的目录）
    pub fn local_file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: RuleOrigin::LocalFile(path.into()),
            ..Self::default()
        }
    }

    pub fn inline(document: impl Into<String>) -> Self {
        Self {
            origin: RuleOrigin::Inline(document.into()),
            ..Self::default()
        }
    }

    /// 校验配置：长度上限为 0 时任何输入都会被截成空串
    pub fn validate(&self) -> RsyResult<()> {
        if self.max_user_agent_length == 0 {
            return Err(RsyError::InvalidInput(
                "max_user_agent_length must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            origin: RuleOrigin::Embedded,
            max_user_agent_length: Self::DEFAULT_MAX_USER_AGENT_LENGTH,
            calculate_derived_fields: true,
            keep_matches: false,
        }
    }
}

/// 自定义构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: AnalyzerConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: RuleOrigin) -> Self {
        self.config.origin = origin;
        self
    }

    pub fn max_user_agent_length(mut self, max: usize) -> Self {
        self.config.max_user_agent_length = max;
        self
    }

    pub fn calculate_derived_fields(mut self, enabled: bool) -> Self {
        self.config.calculate_derived_fields = enabled;
        self
    }

    pub fn keep_matches(mut self, keep: bool) -> Self {
        self.config.keep_matches = keep;
        self
    }

    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.origin, RuleOrigin::Embedded);
        assert_eq!(config.max_user_agent_length, 2048);
        assert!(config.calculate_derived_fields);
        assert!(!config.keep_matches);
    }

    #[test]
    fn test_builder_chain() {
        let config = CustomConfigBuilder::new()
            .origin(RuleOrigin::LocalFile(PathBuf::from("rules")))
            .max_user_agent_length(64)
            .calculate_derived_fields(false)
            .keep_matches(true)
            .build();
        assert_eq!(config.origin, RuleOrigin::LocalFile(PathBuf::from("rules")));
        assert_eq!(config.max_user_agent_length, 64);
        assert!(!config.calculate_derived_fields);
        assert!(config.keep_matches);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_length_is_invalid() {
        let config = CustomConfigBuilder::new().max_user_agent_length(0).build();
        assert!(matches!(config.validate(), Err(RsyError::InvalidInput(_))));
    }
}
