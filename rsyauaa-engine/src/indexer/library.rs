use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::range::WordRange;
use crate::core::sink::ResultSink;
use crate::core::tree::SyntaxTree;
use crate::error::CoreResult;
use crate::flattener::TreeFlattener;
use crate::lookup::LookupRegistry;
use crate::utils::preview_compact;
use crate::matcher::{
    AnalyzeOptions, AnalyzeReport, AnalyzeSession, CompiledAction, CompiledMatcher,
};

/// 编译后的规则库
/// 构建完成后不可变，可在线程间共享；每次解析的可变状态都在 AnalyzeSession 中
#[derive(Debug)]
pub struct CompiledRuleLibrary {
    pub(crate) matchers: Vec<CompiledMatcher>,
    pub(crate) actions: Vec<CompiledAction>,
    /// 小写索引键 → 动作下标
    pub(crate) inform_index: FxHashMap<String, Vec<usize>>,
    /// 需要额外生成 `path="value"` 键的路径
    pub(crate) value_keyed_paths: FxHashSet<String>,
    /// 需要额外生成 `path{"abc` 键的路径
    pub(crate) prefix_keyed_paths: FxHashSet<String>,
    pub(crate) required_ranges: FxHashMap<String, Vec<WordRange>>,
    pub(crate) zero_input_matchers: Vec<usize>,
    /// 单次解析命中数上限
    pub(crate) max_matches: usize,
    pub(crate) lookups: LookupRegistry,
    pub(crate) flattener: TreeFlattener,
}

impl CompiledRuleLibrary {
    /// 分析一棵语法树，结果写入 sink
    pub fn analyze(&self, tree: &SyntaxTree, sink: &mut dyn ResultSink) -> CoreResult<AnalyzeReport> {
        self.analyze_with(tree, sink, AnalyzeOptions::default())
    }

    pub fn analyze_with(
        &self,
        tree: &SyntaxTree,
        sink: &mut dyn ResultSink,
        options: AnalyzeOptions,
    ) -> CoreResult<AnalyzeReport> {
        let mut session = AnalyzeSession::new(self, tree, options);
        self.flattener.flatten(tree, &mut session)?;
        let report = session.finish(sink);
        log::trace!(
            "Tree analyzed | Input: {} | Touched: {} | Fired: {} | Matches: {}",
            preview_compact(tree.source(), 80),
            report.touched_matchers,
            report.fired_matchers,
            report.matches.len()
        );
        Ok(report)
    }

    pub fn matchers(&self) -> &[CompiledMatcher] {
        &self.matchers
    }

    pub fn actions(&self) -> &[CompiledAction] {
        &self.actions
    }

    pub fn lookups(&self) -> &LookupRegistry {
        &self.lookups
    }

    pub fn max_matches(&self) -> usize {
        self.max_matches
    }

    pub fn zero_input_matchers(&self) -> &[usize] {
        &self.zero_input_matchers
    }

    #[inline]
    pub fn actions_for_key(&self, key: &str) -> Option<&[usize]> {
        self.inform_index.get(key).map(Vec::as_slice)
    }

    /// 所有已注册的索引键（排序后，便于诊断输出）
    pub fn inform_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.inform_index.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    #[inline]
    pub fn is_value_keyed(&self, path: &str) -> bool {
        self.value_keyed_paths.contains(path)
    }

    #[inline]
    pub fn is_prefix_keyed(&self, path: &str) -> bool {
        self.prefix_keyed_paths.contains(path)
    }

    pub fn required_ranges(&self, path: &str) -> &[WordRange] {
        self.required_ranges
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
