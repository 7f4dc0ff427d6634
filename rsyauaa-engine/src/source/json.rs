//! JSON 规则文档解析
//!
//! ```json
//! {
//!   "lookups":  [ { "name": "OSNames", "map": { "Android": "Android" }, "default": "Unknown" } ],
//!   "sets":     [ { "name": "Robots", "values": [ "Googlebot" ] } ],
//!   "matchers": [ { "require": [ "..." ], "extract": [ "Field : 100 : expression" ] } ]
//! }
//! ```
use crate::core::definition::{RuleLibrary, RuleSource};
use crate::error::{CoreError, CoreResult};

/// JSON 规则解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRuleParser;

impl JsonRuleParser {
    /// 解析单个文档，规则来源标记为 `file#序号`
    /// 参数：
    /// - content: 文档内容
    /// - file: 文档名（仅用于报错定位）
    pub fn parse_to_rule_lib(&self, content: &str, file: &str) -> CoreResult<RuleLibrary> {
        let mut library: RuleLibrary = serde_json::from_str(content)
            .map_err(|e| CoreError::RuleParseError(format!("{}: {}", file, e)))?;
        Self::stamp_sources(&mut library, file);
        log::debug!(
            "Rule document parsed | File: {} | Lookups: {} | Sets: {} | Matchers: {}",
            file,
            library.lookups.len(),
            library.sets.len(),
            library.matchers.len()
        );
        Ok(library)
    }

    pub fn parse_bytes(&self, bytes: &[u8], file: &str) -> CoreResult<RuleLibrary> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| CoreError::RuleParseError(format!("{}: not UTF-8: {}", file, e)))?;
        self.parse_to_rule_lib(content, file)
    }

    /// 解析并合并多个文档，重名的查找表/集合报错
    pub fn parse_documents<'a, I>(&self, documents: I) -> CoreResult<RuleLibrary>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut merged = RuleLibrary::default();
        for (file, content) in documents {
            let library = self.parse_to_rule_lib(content, file)?;
            merged.merge(library)?;
        }
        Ok(merged)
    }

    fn stamp_sources(library: &mut RuleLibrary, file: &str) {
        for (index, matcher) in library.matchers.iter_mut().enumerate() {
            matcher.source = RuleSource::new(file, index);
        }
    }
}
