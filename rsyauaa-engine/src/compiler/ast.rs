//! 路径表达式的语法树（和类型），由 parser 产出、compile 消费
use crate::core::limits::max_range_for;
use crate::core::range::{NumberRange, WordRange};

/// 完整表达式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatcherExpr {
    /// `agent.(1)product...`
    Path { root: String, steps: Vec<PathStep> },
    /// 包装函数及其后缀步骤
    Wrapped {
        wrapper: Box<Wrapper>,
        steps: Vec<PathStep>,
    },
    /// 引号括起的固定值，只允许出现在 extract 中
    Fixed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wrapper {
    IsNull(MatcherExpr),
    CleanVersion(MatcherExpr),
    NormalizeBrand(MatcherExpr),
    Concat {
        prefix: Option<String>,
        inner: MatcherExpr,
        postfix: Option<String>,
    },
    LookUp {
        table: String,
        inner: MatcherExpr,
        default: Option<String>,
    },
    LookUpPrefix {
        table: String,
        inner: MatcherExpr,
        default: Option<String>,
    },
    IsInLookUpPrefix {
        table: String,
        inner: MatcherExpr,
    },
}

impl Wrapper {
    pub fn inner(&self) -> &MatcherExpr {
        match self {
            Wrapper::IsNull(inner)
            | Wrapper::CleanVersion(inner)
            | Wrapper::NormalizeBrand(inner)
            | Wrapper::Concat { inner, .. }
            | Wrapper::LookUp { inner, .. }
            | Wrapper::LookUpPrefix { inner, .. }
            | Wrapper::IsInLookUpPrefix { inner, .. } => inner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Down { range: RangeSpec, name: String },
    Up,
    Next(u8),
    Prev(u8),
    BackToFull,
    WordRange(WordRange),
    Equals(String),
    NotEquals(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    IsInSet(String),
    Lookup { table: String, default: Option<String> },
}

/// `(...)` 中写的子节点序号范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `(*)` 或省略
    All,
    /// `(n)`
    Exact(usize),
    /// `(n-m)`
    Between(usize, usize),
    /// `(n-)`
    From(usize),
    /// `(-m)`
    UpTo(usize),
}

impl RangeSpec {
    /// 开放端按名称的最大序号补齐
    pub fn resolve(self, name: &str) -> NumberRange {
        let max = max_range_for(name);
        match self {
            RangeSpec::All => NumberRange::new(1, max),
            RangeSpec::Exact(n) => NumberRange::new(n, n),
            RangeSpec::Between(start, end) => NumberRange::new(start, end),
            RangeSpec::From(start) => NumberRange::new(start, max),
            RangeSpec::UpTo(end) => NumberRange::new(1, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_resolution() {
        assert_eq!(RangeSpec::All.resolve("version"), NumberRange::new(1, 5));
        assert_eq!(RangeSpec::From(2).resolve("product"), NumberRange::new(2, 10));
        assert_eq!(RangeSpec::UpTo(3).resolve("entry"), NumberRange::new(1, 3));
        assert_eq!(RangeSpec::Exact(4).resolve("name"), NumberRange::new(4, 4));
    }
}
