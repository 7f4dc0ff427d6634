//! 规则加载：内置 / 本地文件 / 内存文档
use std::fs;
use std::path::{Path, PathBuf};

use rsyauaa_engine::{JsonRuleParser, RuleLibrary};

use crate::config::RuleOrigin;
use crate::error::{RsyError, RsyResult};

/// 内置规则文档（文件名, 内容）
#[cfg(feature = "embedded-rules")]
pub const EMBEDDED_RULES: &[(&str, &str)] = &[
    ("base.json", include_str!("../../data/rules/base.json")),
    ("agents.json", include_str!("../../data/rules/agents.json")),
    (
        "operating_systems.json",
        include_str!("../../data/rules/operating_systems.json"),
    ),
    ("devices.json", include_str!("../../data/rules/devices.json")),
    (
        "layout_engines.json",
        include_str!("../../data/rules/layout_engines.json"),
    ),
    ("robots.json", include_str!("../../data/rules/robots.json")),
];

#[derive(Debug, Default)]
pub struct RuleLoader {
    parser: JsonRuleParser,
}

impl RuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, origin: &RuleOrigin) -> RsyResult<RuleLibrary> {
        match origin {
            RuleOrigin::Embedded => self.load_embedded(),
            RuleOrigin::LocalFile(path) => self.load_local(path),
            RuleOrigin::Inline(document) => Ok(self.parser.parse_to_rule_lib(document, "<inline>")?),
        }
    }

    #[cfg(feature = "embedded-rules")]
    pub fn load_embedded(&self) -> RsyResult<RuleLibrary> {
        Ok(self.parser.parse_documents(EMBEDDED_RULES.iter().copied())?)
    }

    #[cfg(not(feature = "embedded-rules"))]
    pub fn load_embedded(&self) -> RsyResult<RuleLibrary> {
        Err(RsyError::FeatureDisabled(
            "embedded-rules feature is disabled, use a local or inline rule origin".to_string(),
        ))
    }

    /// 单个 .json 文件，或目录下所有 .json 文件（按文件名排序后合并）
    pub fn load_local(&self, path: &Path) -> RsyResult<RuleLibrary> {
        let files = if path.is_dir() {
            let mut files: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };
        if files.is_empty() {
            return Err(RsyError::RuleLoadError(format!(
                "本地路径[{}]下没有 .json 规则文件",
                path.display()
            )));
        }

        let mut documents = Vec::with_capacity(files.len());
        for file in &files {
            let content = fs::read_to_string(file).map_err(|e| {
                RsyError::RuleLoadError(format!("读取规则文件[{}]失败: {}", file.display(), e))
            })?;
            documents.push((file.display().to_string(), content));
        }
        log::debug!(
            "Local rule files read | Path: {} | Files: {}",
            path.display(),
            documents.len()
        );
        Ok(self
            .parser
            .parse_documents(documents.iter().map(|(f, c)| (f.as_str(), c.as_str())))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "embedded-rules")]
    #[test]
    fn test_embedded_rules_parse() {
        let library = RuleLoader::new().load(&RuleOrigin::Embedded).unwrap();
        assert!(!library.matchers.is_empty());
        assert!(library.lookups.iter().any(|l| l.name == "WindowsNTVersions"));
        assert!(library.sets.iter().any(|s| s.name == "Robots"));
    }

    #[test]
    fn test_local_directory() {
        let dir = std::env::temp_dir().join(format!("rsyauaa-rules-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("a.json"),
            r#"{ "matchers": [ { "extract": [ "A : 1 : \"x\"" ] } ] }"#,
        )
        .unwrap();
        fs::write(
            dir.join("b.json"),
            r#"{ "matchers": [ { "extract": [ "B : 1 : \"y\"" ] } ] }"#,
        )
        .unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let library = RuleLoader::new().load_local(&dir).unwrap();
        assert_eq!(library.matchers.len(), 2);
        assert!(library.matchers[1].source.to_string().ends_with("b.json#0"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = RuleLoader::new()
            .load_local(Path::new("/definitely/not/here.json"))
            .unwrap_err();
        assert!(matches!(err, RsyError::RuleLoadError(_)));
    }
}
