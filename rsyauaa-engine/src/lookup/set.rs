use rustc_hash::FxHashSet;

use super::table::LookupTable;

/// 命名字符串集合（区分大小写）
#[derive(Debug, Clone, Default)]
pub struct LookupSet {
    name: String,
    values: FxHashSet<String>,
}

impl LookupSet {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// 由查找表的键派生同名集合
    pub fn from_table_keys(table: &LookupTable) -> Self {
        Self::new(table.name(), table.keys())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_from_table() {
        let table = LookupTable::new(
            "Brands",
            vec![("Sony".into(), "Sony".into()), ("HTC".into(), "HTC".into())],
            None,
        )
        .unwrap();
        let set = LookupSet::from_table_keys(&table);
        assert_eq!(set.name(), "Brands");
        assert!(set.contains("HTC"));
        assert!(!set.contains("htc"));
        assert_eq!(set.len(), 2);
    }
}
