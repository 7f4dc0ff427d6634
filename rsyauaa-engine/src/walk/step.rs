use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use crate::core::range::{NumberRange, WordRange};
use crate::lookup::{LookupSet, LookupTable};

/// 单个遍历/过滤/变换步骤
#[derive(Debug, Clone)]
pub enum StepKind {
    /// 只作标记，真正的语义在匹配器里（命中次数必须为 0）
    IsNull,
    Up,
    Next(u8),
    Prev(u8),
    Down { range: NumberRange, name: String },
    BackToFull,
    WordRange(WordRange),
    Equals(String),
    NotEquals(String),
    StartsWith(String),
    EndsWith(String),
    /// 原文 + 小写形式
    Contains { literal: String, lower: String },
    IsInSet(Arc<LookupSet>),
    IsInLookupPrefix(Arc<LookupTable>),
    Lookup {
        table: Arc<LookupTable>,
        default: Option<String>,
    },
    LookupPrefix {
        table: Arc<LookupTable>,
        default: Option<String>,
    },
    CleanVersion,
    NormalizeBrand,
    Concat { prefix: String, postfix: String },
    ConcatPrefix(String),
    ConcatPostfix(String),
}

impl StepKind {
    pub fn contains(literal: impl Into<String>) -> Self {
        let literal = literal.into();
        let lower = literal.to_lowercase();
        StepKind::Contains { literal, lower }
    }

    /// 该步骤是否可能让遍历失败
    /// 纯变换步骤，以及带默认值的查找，总会产出一个值
    pub fn can_fail(&self) -> bool {
        match self {
            StepKind::CleanVersion
            | StepKind::NormalizeBrand
            | StepKind::Concat { .. }
            | StepKind::ConcatPrefix(_)
            | StepKind::ConcatPostfix(_)
            | StepKind::BackToFull => false,
            StepKind::Lookup { table, default } | StepKind::LookupPrefix { table, default } => {
                default.is_none() && table.default_value().is_none()
            }
            _ => true,
        }
    }
}

fn write_default(f: &mut Formatter<'_>, default: &Option<String>) -> fmt::Result {
    match default {
        Some(value) => write!(f, " ; default={})", value),
        None => f.write_str(" ; default=null)"),
    }
}

impl Display for StepKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::IsNull => f.write_str("IsNull()"),
            StepKind::Up => f.write_str("Up()"),
            StepKind::Next(1) => f.write_str("Next()"),
            StepKind::Next(n) => write!(f, "Next({})", n),
            StepKind::Prev(1) => f.write_str("Prev()"),
            StepKind::Prev(n) => write!(f, "Prev({})", n),
            StepKind::Down { range, name } => write!(f, "Down({}{})", range, name),
            StepKind::BackToFull => f.write_str("BackToFull()"),
            StepKind::WordRange(range) => write!(f, "WordRange({})", range.step_form()),
            StepKind::Equals(v) => write!(f, "Equals({})", v),
            StepKind::NotEquals(v) => write!(f, "NotEquals({})", v),
            StepKind::StartsWith(v) => write!(f, "StartsWith({})", v),
            StepKind::EndsWith(v) => write!(f, "EndsWith({})", v),
            StepKind::Contains { literal, .. } => write!(f, "Contains({})", literal),
            StepKind::IsInSet(set) => write!(f, "IsInSet(@{})", set.name()),
            StepKind::IsInLookupPrefix(table) => write!(f, "IsInLookUpPrefix(@{})", table.name()),
            StepKind::Lookup { table, default } => {
                write!(f, "Lookup(@{}", table.name())?;
                write_default(f, default)
            }
            StepKind::LookupPrefix { table, default } => {
                write!(f, "LookupPrefix(@{}", table.name())?;
                write_default(f, default)
            }
            StepKind::CleanVersion => f.write_str("CleanVersion()"),
            StepKind::NormalizeBrand => f.write_str("NormalizeBrand()"),
            StepKind::Concat { prefix, postfix } => write!(f, "Concat({};{})", prefix, postfix),
            StepKind::ConcatPrefix(prefix) => write!(f, "ConcatPrefix({})", prefix),
            StepKind::ConcatPostfix(postfix) => write!(f, "ConcatPostfix({})", postfix),
        }
    }
}

/// 链中的一个节点：步骤本体 + 后继下标
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,
    pub next: Option<usize>,
}

/// 忽略 ASCII 大小写的前缀判断
#[inline]
pub(crate) fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[inline]
pub(crate) fn ends_with_ignore_case(value: &str, suffix: &str) -> bool {
    value.len() >= suffix.len()
        && value.as_bytes()[value.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}
