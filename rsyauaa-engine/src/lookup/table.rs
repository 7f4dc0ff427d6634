use rustc_hash::FxHashMap;

use crate::core::definition::LookupDefinition;
use crate::core::limits::PREFIX_HASH_LIMIT;
use crate::error::{CoreError, CoreResult};

/// 命名查找表：键区分大小写、保持声明顺序，可带默认值
/// 额外维护一份前缀索引用于最长前缀匹配
#[derive(Debug, Clone)]
pub struct LookupTable {
    name: String,
    entries: Vec<(String, String)>,
    index: FxHashMap<String, usize>,
    default: Option<String>,
    /// 键的前 min(3, 长度) 个字符 → 条目下标
    prefix_index: FxHashMap<String, Vec<usize>>,
}

impl LookupTable {
    pub fn new(
        name: impl Into<String>,
        entries: Vec<(String, String)>,
        default: Option<String>,
    ) -> CoreResult<Self> {
        let name = name.into();
        let mut index = FxHashMap::default();
        let mut prefix_index: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        index.reserve(entries.len());

        for (i, (key, _)) in entries.iter().enumerate() {
            if index.insert(key.clone(), i).is_some() {
                return Err(CoreError::DuplicateLookupKey {
                    lookup: name,
                    key: key.clone(),
                });
            }
            prefix_index
                .entry(leading_chars(key, PREFIX_HASH_LIMIT).to_string())
                .or_default()
                .push(i);
        }

        Ok(Self {
            name,
            entries,
            index,
            default,
            prefix_index,
        })
    }

    pub fn from_definition(definition: &LookupDefinition) -> CoreResult<Self> {
        Self::new(
            definition.name.clone(),
            definition.map.clone(),
            definition.default.clone(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// 声明顺序的键
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// 精确查找（区分大小写）
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&i| self.entries[i].1.as_str())
    }

    /// 精确查找，未命中时退回表默认值
    pub fn get_or_default(&self, key: &str) -> Option<&str> {
        self.get(key).or(self.default.as_deref())
    }

    /// 最长前缀匹配：返回作为 value 前缀的最长键及其值
    pub fn longest_prefix_match(&self, value: &str) -> Option<(&str, &str)> {
        let mut best: Option<usize> = None;
        let max_len = value.chars().count().min(PREFIX_HASH_LIMIT);
        for len in 0..=max_len {
            let Some(candidates) = self.prefix_index.get(leading_chars(value, len)) else {
                continue;
            };
            for &i in candidates {
                let key = &self.entries[i].0;
                if value.starts_with(key.as_str())
                    && best.map_or(true, |b| self.entries[b].0.len() < key.len())
                {
                    best = Some(i);
                }
            }
        }
        best.map(|i| (self.entries[i].0.as_str(), self.entries[i].1.as_str()))
    }

    pub fn has_prefix_key(&self, value: &str) -> bool {
        self.longest_prefix_match(value).is_some()
    }
}

/// 前 n 个字符组成的切片
fn leading_chars(value: &str, n: usize) -> &str {
    match value.char_indices().nth(n) {
        Some((offset, _)) => &value[..offset],
        None => value,
    }
}
