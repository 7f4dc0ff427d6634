use crate::compiler::CompiledPath;
use crate::core::definition::RuleSource;

/// 动作在规则中的角色
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRole {
    /// is_null 为 true 时要求「一次都没有命中」
    Require { is_null: bool },
    Extract { field: String, confidence: i64 },
}

/// 编译后的单个动作（require 或 extract 的一条表达式）
#[derive(Debug, Clone)]
pub struct CompiledAction {
    /// 所属规则下标
    pub matcher: usize,
    pub role: ActionRole,
    pub path: CompiledPath,
}

impl CompiledAction {
    pub fn is_require(&self) -> bool {
        matches!(self.role, ActionRole::Require { .. })
    }
}

/// 固定值提取：不依赖任何输入，规则成立即写入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedExtract {
    pub field: String,
    pub confidence: i64,
    pub value: String,
}

/// 编译后的规则，动作以下标引用库中的动作表
#[derive(Debug, Clone, Default)]
pub struct CompiledMatcher {
    pub source: RuleSource,
    pub require: Vec<usize>,
    pub extract: Vec<usize>,
    pub fixed: Vec<FixedExtract>,
}

impl CompiledMatcher {
    /// 所有需要输入的动作都是 IsNull 时，即使什么都没被通知也要参与评估
    pub fn is_zero_input(&self, actions: &[CompiledAction]) -> bool {
        self.extract.is_empty()
            && self.require.iter().all(|&id| {
                matches!(actions[id].role, ActionRole::Require { is_null: true })
            })
    }
}
