//! 派生字段：在规则匹配完成后由已有字段计算
//! 派生值沿用来源字段的置信度，且不会覆盖规则给出的更高置信度值
use rsyauaa_engine::{Splitter, VersionSplitter};

use super::user_agent::UserAgent;

pub const AGENT_NAME: &str = "AgentName";
pub const AGENT_VERSION: &str = "AgentVersion";
pub const AGENT_VERSION_MAJOR: &str = "AgentVersionMajor";
pub const AGENT_NAME_VERSION: &str = "AgentNameVersion";
pub const AGENT_NAME_VERSION_MAJOR: &str = "AgentNameVersionMajor";
pub const OPERATING_SYSTEM_NAME: &str = "OperatingSystemName";
pub const OPERATING_SYSTEM_VERSION: &str = "OperatingSystemVersion";
pub const OPERATING_SYSTEM_VERSION_MAJOR: &str = "OperatingSystemVersionMajor";
pub const OPERATING_SYSTEM_NAME_VERSION: &str = "OperatingSystemNameVersion";
pub const LAYOUT_ENGINE_VERSION: &str = "LayoutEngineVersion";
pub const LAYOUT_ENGINE_VERSION_MAJOR: &str = "LayoutEngineVersionMajor";

/// 单个派生规则
#[derive(Debug, Clone, Copy)]
enum Derivation {
    /// 版本号的第一段
    Major { from: &'static str },
    /// 名称 + 空格 + 版本
    NameVersion {
        name: &'static str,
        version: &'static str,
    },
}

/// 计算顺序即依赖顺序：先主版本号，再组合字段
const DERIVED_FIELDS: &[(&str, Derivation)] = &[
    (AGENT_VERSION_MAJOR, Derivation::Major { from: AGENT_VERSION }),
    (
        OPERATING_SYSTEM_VERSION_MAJOR,
        Derivation::Major {
            from: OPERATING_SYSTEM_VERSION,
        },
    ),
    (
        LAYOUT_ENGINE_VERSION_MAJOR,
        Derivation::Major {
            from: LAYOUT_ENGINE_VERSION,
        },
    ),
    (
        AGENT_NAME_VERSION,
        Derivation::NameVersion {
            name: AGENT_NAME,
            version: AGENT_VERSION,
        },
    ),
    (
        AGENT_NAME_VERSION_MAJOR,
        Derivation::NameVersion {
            name: AGENT_NAME,
            version: AGENT_VERSION_MAJOR,
        },
    ),
    (
        OPERATING_SYSTEM_NAME_VERSION,
        Derivation::NameVersion {
            name: OPERATING_SYSTEM_NAME,
            version: OPERATING_SYSTEM_VERSION,
        },
    ),
];

/// 计算所有派生字段
pub fn calculate_derived_fields(user_agent: &mut UserAgent) {
    for &(target, derivation) in DERIVED_FIELDS {
        let Some((value, confidence)) = derive(user_agent, derivation) else {
            continue;
        };
        if user_agent.set_if_higher(target, &value, confidence) {
            log::trace!("Derived field | Field: {} | Value: {}", target, value);
        }
    }
}

fn derive(user_agent: &UserAgent, derivation: Derivation) -> Option<(String, i64)> {
    match derivation {
        Derivation::Major { from } => {
            if !user_agent.has_known_value(from) {
                return None;
            }
            let version = user_agent.get_value(from);
            let major = VersionSplitter.single_split(version, 1)?;
            Some((major.to_string(), user_agent.get_confidence(from)))
        }
        Derivation::NameVersion { name, version } => {
            if !user_agent.has_known_value(name) || !user_agent.has_known_value(version) {
                return None;
            }
            let confidence = user_agent
                .get_confidence(name)
                .max(user_agent.get_confidence(version));
            Some((
                format!(
                    "{} {}",
                    user_agent.get_value(name),
                    user_agent.get_value(version)
                ),
                confidence,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsyauaa_engine::ResultSink;

    #[test]
    fn test_major_and_combined_fields() {
        let mut ua = UserAgent::new("x");
        ua.set(AGENT_NAME, "Chrome", 200);
        ua.set(AGENT_VERSION, "53.0.2785.124", 200);
        ua.set(OPERATING_SYSTEM_NAME, "Android", 100);
        ua.set(OPERATING_SYSTEM_VERSION, "7.0", 100);
        calculate_derived_fields(&mut ua);

        assert_eq!(ua.get_value(AGENT_VERSION_MAJOR), "53");
        assert_eq!(ua.get_confidence(AGENT_VERSION_MAJOR), 200);
        assert_eq!(ua.get_value(AGENT_NAME_VERSION), "Chrome 53.0.2785.124");
        assert_eq!(ua.get_value(AGENT_NAME_VERSION_MAJOR), "Chrome 53");
        assert_eq!(ua.get_value(OPERATING_SYSTEM_VERSION_MAJOR), "7");
        assert_eq!(ua.get_value(OPERATING_SYSTEM_NAME_VERSION), "Android 7.0");
        // 来源字段缺失时不派生
        assert_eq!(ua.get_value(LAYOUT_ENGINE_VERSION_MAJOR), "Unknown");
    }

    #[test]
    fn test_rule_value_with_higher_confidence_wins() {
        let mut ua = UserAgent::new("x");
        ua.set(AGENT_VERSION, "10.1.2", 5);
        ua.set(AGENT_VERSION_MAJOR, "10.1", 500);
        calculate_derived_fields(&mut ua);
        assert_eq!(ua.get_value(AGENT_VERSION_MAJOR), "10.1");
    }

    #[test]
    fn test_unknown_version_is_skipped() {
        let mut ua = UserAgent::new("x");
        ua.set(AGENT_NAME, "Chrome", 200);
        ua.set(AGENT_VERSION, "Unknown", 200);
        calculate_derived_fields(&mut ua);
        assert_eq!(ua.get_confidence(AGENT_NAME_VERSION), -1);
    }
}
