//! 规则定义（未编译形态）
//! 与文件格式解耦：JSON 解析器只负责把文档转换成这里的结构
use std::fmt::{self, Display, Formatter};

use rustc_hash::FxHashSet;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, CoreResult};

/// 规则来源：文件名 + 文件内序号，用于报错定位
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleSource {
    pub file: String,
    pub index: usize,
}

impl RuleSource {
    pub fn new(file: impl Into<String>, index: usize) -> Self {
        Self {
            file: file.into(),
            index,
        }
    }
}

impl Display for RuleSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "<inline>#{}", self.index)
        } else {
            write!(f, "{}#{}", self.file, self.index)
        }
    }
}

/// 查找表定义，保留声明顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupDefinition {
    pub name: String,
    #[serde(
        deserialize_with = "deserialize_ordered_pairs",
        serialize_with = "serialize_ordered_pairs"
    )]
    pub map: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// 集合定义
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetDefinition {
    pub name: String,
    pub values: Vec<String>,
}

/// 单条匹配规则：一组 require 与一组 extract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatcherDefinition {
    #[serde(default, skip_serializing)]
    pub source: RuleSource,
    #[serde(default)]
    pub require: Vec<String>,
    #[serde(default)]
    pub extract: Vec<String>,
}

/// 完整规则库（可由多份文档合并）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleLibrary {
    #[serde(default)]
    pub lookups: Vec<LookupDefinition>,
    #[serde(default)]
    pub sets: Vec<SetDefinition>,
    #[serde(default)]
    pub matchers: Vec<MatcherDefinition>,
}

impl RuleLibrary {
    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty() && self.sets.is_empty() && self.matchers.is_empty()
    }

    /// 合并另一份规则库，查找表/集合重名视为配置错误
    pub fn merge(&mut self, other: RuleLibrary) -> CoreResult<()> {
        let mut lookup_names: FxHashSet<String> =
            self.lookups.iter().map(|l| l.name.clone()).collect();
        for lookup in &other.lookups {
            if !lookup_names.insert(lookup.name.clone()) {
                return Err(CoreError::DuplicateDefinition(format!("lookup {}", lookup.name)));
            }
        }
        let mut set_names: FxHashSet<String> = self.sets.iter().map(|s| s.name.clone()).collect();
        for set in &other.sets {
            if !set_names.insert(set.name.clone()) {
                return Err(CoreError::DuplicateDefinition(format!("set {}", set.name)));
            }
        }

        self.lookups.extend(other.lookups);
        self.sets.extend(other.sets);
        self.matchers.extend(other.matchers);
        Ok(())
    }
}

/// 解析后的 extract 行：`字段 : 置信度 : 表达式`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractDefinition {
    pub field: String,
    pub confidence: i64,
    pub expression: String,
}

impl ExtractDefinition {
    pub fn parse(line: &str) -> CoreResult<Self> {
        let mut parts = line.splitn(3, ':');
        let (Some(field), Some(confidence), Some(expression)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(CoreError::RuleParseError(format!(
                "extract `{}` must look like `Field : confidence : expression`",
                line
            )));
        };

        let field = field.trim();
        if field.is_empty()
            || !field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(CoreError::RuleParseError(format!(
                "invalid field name `{}` in extract `{}`",
                field, line
            )));
        }
        let confidence = confidence.trim().parse::<i64>().map_err(|e| {
            CoreError::RuleParseError(format!(
                "invalid confidence in extract `{}`: {}",
                line, e
            ))
        })?;
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(CoreError::RuleParseError(format!(
                "empty expression in extract `{}`",
                line
            )));
        }

        Ok(Self {
            field: field.to_string(),
            confidence,
            expression: expression.to_string(),
        })
    }
}

// JSON 对象本身是无序且去重的，这里按出现顺序读出全部键值对，
// 重复键交给查找表构建阶段报错
fn deserialize_ordered_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
            f.write_str("a map of string keys to string values")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, String>()? {
                pairs.push((key, value));
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(PairsVisitor)
}

fn serialize_ordered_pairs<S>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (key, value) in pairs {
        map.serialize_entry(key, value)?;
    }
    map.end()
}
