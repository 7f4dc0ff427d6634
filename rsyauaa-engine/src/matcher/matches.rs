use crate::core::tree::NodeId;
use crate::error::{CoreError, CoreResult};

/// 一次命中记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub key: String,
    pub value: String,
    pub node: NodeId,
}

/// 单次解析的命中列表
/// 容量上限在规则库构建时确定（所有动作的索引键总数），超出说明规则库与引擎假设不一致；
/// 只有开启记录时才真正保存条目，计数始终进行
#[derive(Debug, Clone)]
pub struct MatchesList {
    capacity: usize,
    count: usize,
    keep_entries: bool,
    entries: Vec<MatchEntry>,
}

impl MatchesList {
    pub fn new(capacity: usize, keep_entries: bool) -> Self {
        Self {
            capacity,
            count: 0,
            keep_entries,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, key: &str, value: &str, node: NodeId) -> CoreResult<()> {
        if self.count >= self.capacity {
            return Err(CoreError::InvariantViolation(format!(
                "matches list overflow: capacity {} exceeded while adding `{}`",
                self.capacity, key
            )));
        }
        self.count += 1;
        if self.keep_entries {
            self.entries.push(MatchEntry {
                key: key.to_string(),
                value: value.to_string(),
                node,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> &[MatchEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.count = 0;
        self.entries.clear();
    }
}
