//! 查找表与集合
mod set;
mod table;

pub use set::LookupSet;
pub use table::LookupTable;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::definition::RuleLibrary;
use crate::error::{CoreError, CoreResult};

/// 编译期使用的查找表/集合注册中心
/// 构建完成后只读；没有同名显式集合的查找表会自动派生一个键集合
#[derive(Debug, Clone, Default)]
pub struct LookupRegistry {
    tables: FxHashMap<String, Arc<LookupTable>>,
    sets: FxHashMap<String, Arc<LookupSet>>,
}

impl LookupRegistry {
    pub fn from_library(library: &RuleLibrary) -> CoreResult<Self> {
        let mut registry = Self::default();

        for definition in &library.lookups {
            let table = LookupTable::from_definition(definition)?;
            if registry
                .tables
                .insert(definition.name.clone(), Arc::new(table))
                .is_some()
            {
                return Err(CoreError::DuplicateDefinition(format!(
                    "lookup {}",
                    definition.name
                )));
            }
        }
        for definition in &library.sets {
            let set = LookupSet::new(definition.name.clone(), definition.values.iter().cloned());
            if registry
                .sets
                .insert(definition.name.clone(), Arc::new(set))
                .is_some()
            {
                return Err(CoreError::DuplicateDefinition(format!(
                    "set {}",
                    definition.name
                )));
            }
        }

        let derived: Vec<(String, Arc<LookupSet>)> = registry
            .tables
            .iter()
            .filter(|(name, _)| !registry.sets.contains_key(*name))
            .map(|(name, table)| (name.clone(), Arc::new(LookupSet::from_table_keys(table))))
            .collect();
        registry.sets.extend(derived);

        log::debug!(
            "Lookup registry ready: {} tables, {} sets",
            registry.tables.len(),
            registry.sets.len()
        );
        Ok(registry)
    }

    pub fn table(&self, name: &str) -> CoreResult<Arc<LookupTable>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownLookup(name.to_string()))
    }

    pub fn set(&self, name: &str) -> CoreResult<Arc<LookupSet>> {
        self.sets
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownLookupSet(name.to_string()))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }
}
