//! rsyauaa-engine 内核错误定义
//! 只有规则加载/编译期的配置错误与内核不变量破坏会以错误形式出现，
//! 运行期的「不匹配」一律用 Option::None 表达，不走错误通道
use thiserror::Error;

/// 内核核心错误枚举
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================== 规则定义相关错误 =====================
    /// 规则文档解析失败（JSON 结构错误等）
    #[error("Rule parse failed: {0}")]
    RuleParseError(String),

    /// 路径表达式语法错误
    #[error("Invalid path expression `{expression}` at offset {position}: {message}")]
    PathSyntax {
        expression: String,
        position: usize,
        message: String,
    },

    /// 规则配置错误，带规则来源（文件#序号）
    #[error("Invalid rule {source_ref}: {message}")]
    InvalidRule { source_ref: String, message: String },

    /// 引用了未声明的查找表
    #[error("Unknown lookup table `{0}`")]
    UnknownLookup(String),

    /// 引用了未声明的集合（也没有同名查找表可以派生）
    #[error("Unknown lookup set `{0}`")]
    UnknownLookupSet(String),

    /// 查找表内重复的键
    #[error("Duplicate key `{key}` in lookup `{lookup}`")]
    DuplicateLookupKey { lookup: String, key: String },

    /// 重复声明的查找表/集合名称
    #[error("Duplicate definition of `{0}`")]
    DuplicateDefinition(String),

    // ===================== 内核基础错误 =====================
    /// 无效输入参数
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 内核逻辑不变量被破坏（规则集与引擎假设不一致，属于严重错误）
    #[error("Core invariant violation: {0}")]
    InvariantViolation(String),
}

impl CoreError {
    /// 把任意配置错误包装成带规则来源的 InvalidRule
    pub fn in_rule(self, source_ref: impl std::fmt::Display) -> Self {
        match self {
            CoreError::InvalidRule { .. } => self,
            other => CoreError::InvalidRule {
                source_ref: source_ref.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// 内核层全局Result类型别名
pub type CoreResult<T> = Result<T, CoreError>;
