use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// 词/版本分段区间，1 起始、闭区间
/// `last == -1` 表示一直到字符串末尾
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordRange {
    pub first: i32,
    pub last: i32,
}

impl WordRange {
    /// 「到末尾」标记
    pub const TO_END: i32 = -1;

    /// 构建并校验区间：first >= 1，且 last 为 -1 或 last >= first
    pub fn new(first: i32, last: i32) -> CoreResult<Self> {
        if first < 1 {
            return Err(CoreError::InvalidInput(format!(
                "word range must start at 1 or later, got [{}-{}]",
                first, last
            )));
        }
        if last != Self::TO_END && last < first {
            return Err(CoreError::InvalidInput(format!(
                "word range end precedes start: [{}-{}]",
                first, last
            )));
        }
        Ok(Self { first, last })
    }

    /// 单个分段 `[n]`
    pub fn single(n: i32) -> CoreResult<Self> {
        Self::new(n, n)
    }

    /// 步骤渲染用的形式 `[1:2]`，路径里用的是 `[1-2]`
    pub fn step_form(&self) -> String {
        format!("[{}:{}]", self.first, self.last)
    }
}

/// 路径形式：`[1-2]`，开放结尾为 `[2-]`
impl Display for WordRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.last == Self::TO_END {
            write!(f, "[{}-]", self.first)
        } else {
            write!(f, "[{}-{}]", self.first, self.last)
        }
    }
}

/// 子节点序号区间（Down 步骤使用），1 起始、闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumberRange {
    pub start: usize,
    pub end: usize,
}

impl NumberRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline(always)]
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.start..=self.end
    }

    /// 开放端补齐后起点超过上限时为空
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl Display for NumberRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_range_validation() {
        assert!(WordRange::new(0, 2).is_err());
        assert!(WordRange::new(3, 2).is_err());
        assert!(WordRange::new(2, WordRange::TO_END).is_ok());
        assert_eq!(WordRange::single(4).unwrap(), WordRange { first: 4, last: 4 });
    }

    #[test]
    fn test_word_range_renderings() {
        let range = WordRange::new(1, 2).unwrap();
        assert_eq!(range.to_string(), "[1-2]");
        assert_eq!(range.step_form(), "[1:2]");
        assert_eq!(WordRange::new(3, -1).unwrap().to_string(), "[3-]");
    }

    #[test]
    fn test_number_range() {
        let range = NumberRange::new(1, 3);
        assert!(range.contains(2));
        assert!(!range.contains(4));
        assert_eq!(range.to_string(), "[1:3]");
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
