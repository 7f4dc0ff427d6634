use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::compiler::{CompiledPath, KeySelector, PathCompiler};
use crate::core::definition::{ExtractDefinition, MatcherDefinition, RuleLibrary};
use crate::core::range::WordRange;
use crate::error::{CoreError, CoreResult};
use crate::flattener::TreeFlattener;
use crate::indexer::library::CompiledRuleLibrary;
use crate::lookup::LookupRegistry;
use crate::matcher::{ActionRole, CompiledAction, CompiledMatcher, FixedExtract};
use crate::utils::compress_key_list;

/// 构建期的临时存储
#[derive(Default)]
struct LibraryBuilder {
    matchers: Vec<CompiledMatcher>,
    actions: Vec<CompiledAction>,
    inform_index: FxHashMap<String, Vec<usize>>,
    value_keyed_paths: FxHashSet<String>,
    prefix_keyed_paths: FxHashSet<String>,
    required_ranges: FxHashMap<String, Vec<WordRange>>,
    zero_input_matchers: Vec<usize>,
    max_matches: usize,
}

impl LibraryBuilder {
    /// 编译一条规则并登记它的全部动作
    fn add_matcher(
        &mut self,
        compiler: &PathCompiler<'_>,
        index: usize,
        definition: &MatcherDefinition,
    ) -> CoreResult<()> {
        let mut source = definition.source.clone();
        if source.file.is_empty() {
            source.index = index;
        }
        if definition.extract.is_empty() {
            return Err(CoreError::InvalidRule {
                source_ref: source.to_string(),
                message: "matcher has no extract".to_string(),
            });
        }

        let matcher_id = self.matchers.len();
        let mut matcher = CompiledMatcher {
            source: source.clone(),
            ..CompiledMatcher::default()
        };

        for expression in &definition.require {
            let path = compiler
                .compile_require(expression)
                .map_err(|e| e.in_rule(&source))?;
            let is_null = path.uses_is_null();
            let id = self.register(matcher_id, ActionRole::Require { is_null }, path);
            matcher.require.push(id);
        }

        for line in &definition.extract {
            let extract = ExtractDefinition::parse(line).map_err(|e| e.in_rule(&source))?;
            let path = compiler
                .compile_extract(&extract.expression)
                .map_err(|e| e.in_rule(&source))?;
            if let Some(value) = path.fixed_value() {
                matcher.fixed.push(FixedExtract {
                    field: extract.field,
                    confidence: extract.confidence,
                    value: value.to_string(),
                });
                continue;
            }
            let role = ActionRole::Extract {
                field: extract.field,
                confidence: extract.confidence,
            };
            let id = self.register(matcher_id, role, path);
            matcher.extract.push(id);
        }

        if matcher.is_zero_input(&self.actions) {
            self.zero_input_matchers.push(matcher_id);
        }
        self.matchers.push(matcher);
        Ok(())
    }

    /// 登记动作：索引键、附加键路径、词区间需求、命中上限
    fn register(&mut self, matcher: usize, role: ActionRole, path: CompiledPath) -> usize {
        let id = self.actions.len();
        let mut keys = FxHashSet::default();
        for entry in path.entries() {
            let key = entry.inform_key();
            if !keys.insert(key.clone()) {
                continue;
            }
            self.inform_index.entry(key).or_default().push(id);
            match entry.selector {
                KeySelector::Path => {}
                KeySelector::Value(_) => {
                    self.value_keyed_paths.insert(entry.path.to_lowercase());
                }
                KeySelector::Prefix(_) => {
                    self.prefix_keyed_paths.insert(entry.path.to_lowercase());
                }
            }
        }
        self.max_matches += keys.len();

        for (range_path, range) in path.ranges() {
            let ranges = self
                .required_ranges
                .entry(range_path.to_lowercase())
                .or_default();
            if !ranges.contains(range) {
                ranges.push(*range);
            }
        }

        self.actions.push(CompiledAction { matcher, role, path });
        id
    }

    fn finish(self, lookups: LookupRegistry, flattener: TreeFlattener) -> CompiledRuleLibrary {
        CompiledRuleLibrary {
            matchers: self.matchers,
            actions: self.actions,
            inform_index: self.inform_index,
            value_keyed_paths: self.value_keyed_paths,
            prefix_keyed_paths: self.prefix_keyed_paths,
            required_ranges: self.required_ranges,
            zero_input_matchers: self.zero_input_matchers,
            max_matches: self.max_matches,
            lookups,
            flattener,
        }
    }
}

/// 规则索引器
/// 核心职责：
/// 1. 解析查找表/集合，编译每条规则的 require/extract 表达式
/// 2. 把静态路径折叠成索引键，建立「键 → 动作」倒排索引
/// 3. 汇总扁平化需要额外通知的词区间
pub struct RuleIndexer;

impl RuleIndexer {
    /// 构建编译规则库
    /// 参数：library - 未编译的规则库
    /// 返回：编译后的规则库 | 第一个配置错误（带规则来源）
    pub fn build_compiled_library(library: &RuleLibrary) -> CoreResult<CompiledRuleLibrary> {
        Self::build_with_flattener(library, TreeFlattener::default())
    }

    /// 使用自定义扁平化参数构建
    pub fn build_with_flattener(
        library: &RuleLibrary,
        flattener: TreeFlattener,
    ) -> CoreResult<CompiledRuleLibrary> {
        let started = Instant::now();
        let lookups = LookupRegistry::from_library(library)?;

        let mut builder = LibraryBuilder::default();
        {
            let compiler = PathCompiler::new(&lookups);
            for (index, definition) in library.matchers.iter().enumerate() {
                builder.add_matcher(&compiler, index, definition)?;
            }
        }

        let compiled = builder.finish(lookups, flattener);
        log::info!(
            "Rule library compiled | Matchers: {} | Actions: {} | Keys: {} | Zero-input: {} | Elapsed: {:?}",
            compiled.matchers.len(),
            compiled.actions.len(),
            compiled.inform_index.len(),
            compiled.zero_input_matchers.len(),
            started.elapsed()
        );
        log::debug!("Inform keys: {}", compress_key_list(&compiled.inform_keys(), 8));
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::{NodeKind, SyntaxTree, TreeBuilder};
    use crate::matcher::AnalyzeOptions;
    use rustc_hash::FxHashMap;

    const UA: &str = "Mozilla/5.0 (Linux; Android 7.0) Chrome/53.0.2785.124 Mobile";

    fn ua_tree() -> SyntaxTree {
        let mut b = TreeBuilder::new(UA);
        let root = b.root();

        let mozilla = b.add_node(root, NodeKind::Product, 0..32).unwrap();
        let name = b.add_node(mozilla, NodeKind::ProductName, 0..7).unwrap();
        b.add_node(name, NodeKind::Name, 0..7).unwrap();
        b.add_node(mozilla, NodeKind::Separator, 7..8).unwrap();
        let version = b.add_node(mozilla, NodeKind::ProductVersion, 8..11).unwrap();
        b.add_node(version, NodeKind::Version, 8..11).unwrap();
        let comments = b.add_node(mozilla, NodeKind::Comments, 12..32).unwrap();
        b.add_node(comments, NodeKind::CommentEntry, 13..18).unwrap();
        b.add_node(comments, NodeKind::CommentEntry, 20..31).unwrap();

        let chrome = b.add_node(root, NodeKind::Product, 33..53).unwrap();
        let name = b.add_node(chrome, NodeKind::ProductName, 33..39).unwrap();
        b.add_node(name, NodeKind::Name, 33..39).unwrap();
        let version = b.add_node(chrome, NodeKind::ProductVersion, 40..53).unwrap();
        b.add_node(version, NodeKind::Version, 40..53).unwrap();

        b.add_node(root, NodeKind::Text, 54..60).unwrap();
        b.build()
    }

    fn library(json: &str) -> RuleLibrary {
        let _ = env_logger::builder().is_test(true).try_init();
        serde_json::from_str(json).unwrap()
    }

    const RULES: &str = r#"{
        "lookups": [ { "name": "OSNames", "map": { "Android": "Android", "Windows": "Windows NT" } } ],
        "matchers": [
            { "extract": [
                "AgentName : 5 : agent.(1)product.(1)name",
                "AgentVersion : 5 : agent.(1)product.(1)version"
            ] },
            { "extract": [
                "AgentName : 100 : \"Chrome\"",
                "AgentVersion : 100 : agent.(1-5)product.(1)name=\"Chrome\"^.(1)version",
                "AgentVersionMajor : 100 : agent.(1-5)product.(1)name=\"Chrome\"^.(1)version[1]"
            ] },
            { "require": [ "agent.(1)product.(1)comments.(1-5)entry^=\"Android\"" ],
              "extract": [
                "OperatingSystemName : 50 : LookUp[OSNames;agent.(1)product.(1)comments.(1-5)entry[1]]",
                "DeviceClass : 50 : \"Phone\""
            ] },
            { "require": [ "IsNull[agent.(1)product.(1)comments.(1-5)entry=\"Windows NT 10.0\"]" ],
              "extract": [ "OperatingSystemClass : 1 : \"NotWindows\"" ] },
            { "require": [
                "agent.(1)product.(1)comments.(1-5)entry=\"Linux\"",
                "IsNull[agent.(1-5)text=\"Mobile\"]"
              ],
              "extract": [ "DeviceClass : 60 : \"Desktop\"" ] }
        ]
    }"#;

    fn analyze(library: &CompiledRuleLibrary, tree: &SyntaxTree) -> FxHashMap<String, String> {
        let mut sink: Vec<(String, String, i64)> = Vec::new();
        library.analyze(tree, &mut sink).unwrap();
        sink.into_iter().map(|(f, v, _)| (f, v)).collect()
    }

    #[test]
    fn test_end_to_end_fields() {
        let compiled = RuleIndexer::build_compiled_library(&library(RULES)).unwrap();
        let fields = analyze(&compiled, &ua_tree());
        assert_eq!(fields["AgentName"], "Chrome");
        assert_eq!(fields["AgentVersion"], "53.0.2785.124");
        assert_eq!(fields["AgentVersionMajor"], "53");
        assert_eq!(fields["OperatingSystemName"], "Android");
        assert_eq!(fields["DeviceClass"], "Phone");
        assert_eq!(fields["OperatingSystemClass"], "NotWindows");
    }

    #[test]
    fn test_is_null_blocks_when_present() {
        let compiled = RuleIndexer::build_compiled_library(&library(RULES)).unwrap();
        let mut b = TreeBuilder::new("Foo (Linux)");
        let root = b.root();
        let product = b.add_node(root, NodeKind::Product, 0..11).unwrap();
        let name = b.add_node(product, NodeKind::ProductName, 0..3).unwrap();
        b.add_node(name, NodeKind::Name, 0..3).unwrap();
        let comments = b.add_node(product, NodeKind::Comments, 4..11).unwrap();
        b.add_node(comments, NodeKind::CommentEntry, 5..10).unwrap();
        let fields = analyze(&compiled, &b.build());
        // 没有 Mobile 文本，Desktop 规则成立
        assert_eq!(fields["DeviceClass"], "Desktop");
        // 缺少版本时整条规则不成立，名称也不会写出
        assert!(!fields.contains_key("AgentName"));
        assert!(!fields.contains_key("AgentVersion"));
    }

    #[test]
    fn test_repeated_analysis_is_identical() {
        let compiled = RuleIndexer::build_compiled_library(&library(RULES)).unwrap();
        let tree = ua_tree();
        let mut first: Vec<(String, String, i64)> = Vec::new();
        let mut second: Vec<(String, String, i64)> = Vec::new();
        compiled.analyze(&tree, &mut first).unwrap();
        compiled.analyze(&tree, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sink_receives_ascending_confidence() {
        let compiled = RuleIndexer::build_compiled_library(&library(RULES)).unwrap();
        let mut sink: Vec<(String, String, i64)> = Vec::new();
        compiled.analyze(&ua_tree(), &mut sink).unwrap();
        let confidences: Vec<i64> = sink.iter().map(|(_, _, c)| *c).collect();
        let mut sorted = confidences.clone();
        sorted.sort();
        assert_eq!(confidences, sorted);
    }

    #[test]
    fn test_matches_are_bounded_and_recorded() {
        let compiled = RuleIndexer::build_compiled_library(&library(RULES)).unwrap();
        let mut sink: Vec<(String, String, i64)> = Vec::new();
        let report = compiled
            .analyze_with(&ua_tree(), &mut sink, AnalyzeOptions { keep_matches: true })
            .unwrap();
        assert!(!report.matches.is_empty());
        assert!(report.matches.len() <= compiled.max_matches());
        assert_eq!(report.matches.entries().len(), report.matches.len());
        assert!(report.fired_matchers >= 4);
    }

    #[test]
    fn test_collisions_reported() {
        let json = r#"{ "matchers": [
            { "extract": [ "DeviceBrand : 10 : \"Acme\"" ] },
            { "extract": [ "DeviceBrand : 10 : \"Globex\"" ] }
        ] }"#;
        let compiled = RuleIndexer::build_compiled_library(&library(json)).unwrap();
        let mut sink: Vec<(String, String, i64)> = Vec::new();
        let report = compiled.analyze(&ua_tree(), &mut sink).unwrap();
        assert_eq!(sink, vec![("DeviceBrand".into(), "Acme".into(), 10)]);
        assert_eq!(report.collisions.len(), 1);
    }

    #[test]
    fn test_configuration_errors() {
        let no_extract = r#"{ "matchers": [ { "require": [ "agent" ] } ] }"#;
        let err = RuleIndexer::build_compiled_library(&library(no_extract)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRule { ref source_ref, .. } if source_ref == "<inline>#0"));

        let unknown = r#"{ "matchers": [ { "extract": [ "A : 1 : LookUp[Nope;agent]" ] } ] }"#;
        let err = RuleIndexer::build_compiled_library(&library(unknown)).unwrap_err();
        match err {
            CoreError::InvalidRule { message, .. } => assert!(message.contains("Nope")),
            other => panic!("unexpected error {:?}", other),
        }

        let bad_syntax = r#"{ "matchers": [ { "extract": [ "A : 1 : agent.(1)product.(" ] } ] }"#;
        assert!(RuleIndexer::build_compiled_library(&library(bad_syntax)).is_err());
    }

    #[test]
    fn test_required_ranges_registered() {
        let compiled = RuleIndexer::build_compiled_library(&library(RULES)).unwrap();
        assert_eq!(
            compiled.required_ranges("agent.(1)product.(1)comments.(2)entry"),
            &[WordRange::new(1, 1).unwrap()]
        );
        assert!(compiled.is_value_keyed("agent.(2)product.(1)name"));
        assert!(compiled.is_prefix_keyed("agent.(1)product.(1)comments.(1)entry"));
        assert!(compiled
            .inform_keys()
            .contains(&"agent.(1)product.(1)comments.(1)entry{\"and\""));
    }

    #[test]
    fn test_library_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledRuleLibrary>();
    }
}
