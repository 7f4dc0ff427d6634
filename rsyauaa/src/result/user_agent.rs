//! 解析结果
use rsyauaa_engine::{ResultSink, SYNTAX_ERROR};
use rustc_hash::FxHashMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::RsyResult;

/// 未设置字段的读取值
pub const UNKNOWN_VALUE: &str = "Unknown";
/// 未设置字段的置信度
pub const UNSET_CONFIDENCE: i64 = -1;

/// 单个字段的值与置信度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentField {
    pub value: String,
    pub confidence: i64,
}

/// 一条命中记录（keep_matches 开启时保留）
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MatchedKey {
    pub key: String,
    pub value: String,
}

/// 一条 User-Agent 的解析结果
#[derive(Debug, Clone, Default)]
pub struct UserAgent {
    user_agent_string: String,
    fields: FxHashMap<String, AgentField>,
    matches: Vec<MatchedKey>,
}

impl UserAgent {
    pub fn new(user_agent_string: impl Into<String>) -> Self {
        Self {
            user_agent_string: user_agent_string.into(),
            ..Self::default()
        }
    }

    pub fn user_agent_string(&self) -> &str {
        &self.user_agent_string
    }

    /// 字段值，未设置时返回 "Unknown"
    pub fn get_value(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .map(|f| f.value.as_str())
            .unwrap_or(UNKNOWN_VALUE)
    }

    /// 字段置信度，未设置时返回 -1
    pub fn get_confidence(&self, field: &str) -> i64 {
        self.fields
            .get(field)
            .map(|f| f.confidence)
            .unwrap_or(UNSET_CONFIDENCE)
    }

    pub fn get(&self, field: &str) -> Option<&AgentField> {
        self.fields.get(field)
    }

    /// 字段已设置且值不是 Unknown
    pub fn has_known_value(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .is_some_and(|f| f.confidence >= 0 && f.value != UNKNOWN_VALUE)
    }

    pub fn has_syntax_error(&self) -> bool {
        self.get_value(SYNTAX_ERROR) == "true"
    }

    /// 已设置的字段名（排序后）
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn matches(&self) -> &[MatchedKey] {
        &self.matches
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self, pretty: bool) -> RsyResult<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub(crate) fn set_matches(&mut self, matches: Vec<MatchedKey>) {
        self.matches = matches;
    }

    /// 置信度严格更高时才覆盖已有值
    pub fn set_if_higher(&mut self, field: &str, value: &str, confidence: i64) -> bool {
        match self.fields.get_mut(field) {
            Some(current) if current.confidence >= confidence => false,
            Some(current) => {
                current.value.clear();
                current.value.push_str(value);
                current.confidence = confidence;
                true
            }
            None => {
                self.fields.insert(
                    field.to_string(),
                    AgentField {
                        value: value.to_string(),
                        confidence,
                    },
                );
                true
            }
        }
    }
}

impl ResultSink for UserAgent {
    fn set(&mut self, field: &str, value: &str, confidence: i64) {
        if !self.set_if_higher(field, value, confidence) {
            log::trace!(
                "Field kept | Field: {} | Rejected: {} | Confidence: {}",
                field,
                value,
                confidence
            );
        }
    }
}

/// JSON 输出：原始字符串 + 按字段名排序的值
impl Serialize for UserAgent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.field_names();
        let mut map = serializer.serialize_map(Some(names.len() + 1))?;
        map.serialize_entry("Useragent", &self.user_agent_string)?;
        for name in names {
            map.serialize_entry(name, self.get_value(name))?;
        }
        if !self.matches.is_empty() {
            map.serialize_entry("__Matches__", &self.matches)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_fields_read_as_unknown() {
        let ua = UserAgent::new("Foo");
        assert_eq!(ua.get_value("DeviceClass"), "Unknown");
        assert_eq!(ua.get_confidence("DeviceClass"), -1);
        assert!(!ua.has_known_value("DeviceClass"));
    }

    #[test]
    fn test_only_higher_confidence_overrides() {
        let mut ua = UserAgent::new("Foo");
        ua.set("AgentName", "Mozilla", 1);
        ua.set("AgentName", "Chrome", 200);
        ua.set("AgentName", "Safari", 200);
        ua.set("AgentName", "Opera", 100);
        assert_eq!(ua.get_value("AgentName"), "Chrome");
        assert_eq!(ua.get_confidence("AgentName"), 200);
    }

    #[test]
    fn test_serialize_sorted() {
        let mut ua = UserAgent::new("Foo/1");
        ua.set("B", "2", 1);
        ua.set("A", "1", 1);
        let json = serde_json::to_string(&ua).unwrap();
        assert_eq!(json, r#"{"Useragent":"Foo/1","A":"1","B":"2"}"#);
        assert_eq!(ua.to_json(false).unwrap(), json);
        assert!(ua.to_json(true).unwrap().contains("\n  \"A\": \"1\""));
    }
}
