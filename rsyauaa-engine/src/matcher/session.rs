//! 单次解析的可变状态
//! 规则库本身只读；命中计数、已提取值、触及的规则都放在这里，随解析结束丢弃
use super::action::ActionRole;
use super::matches::MatchesList;
use super::outcome::{AnalyzeOptions, AnalyzeReport, FieldCollector};
use crate::compiler::{prefix_key, value_key};
use crate::core::limits::PREFIX_HASH_LIMIT;
use crate::core::range::WordRange;
use crate::core::sink::ResultSink;
use crate::core::tree::{NodeId, SyntaxTree};
use crate::error::CoreResult;
use crate::flattener::Analyzer;
use crate::indexer::CompiledRuleLibrary;

pub(crate) struct AnalyzeSession<'a> {
    library: &'a CompiledRuleLibrary,
    tree: &'a SyntaxTree,
    /// 每个 require 动作的命中次数
    require_hits: Vec<u32>,
    /// 每个 extract 动作第一次得到的值
    extracted: Vec<Option<String>>,
    touched: Vec<bool>,
    touched_order: Vec<usize>,
    matches: MatchesList,
}

impl<'a> AnalyzeSession<'a> {
    pub fn new(
        library: &'a CompiledRuleLibrary,
        tree: &'a SyntaxTree,
        options: AnalyzeOptions,
    ) -> Self {
        let actions = library.actions().len();
        Self {
            library,
            tree,
            require_hits: vec![0; actions],
            extracted: vec![None; actions],
            touched: vec![false; library.matchers().len()],
            touched_order: Vec::new(),
            matches: MatchesList::new(library.max_matches(), options.keep_matches),
        }
    }

    /// 把一个索引键分发给注册在它上面的所有动作
    fn dispatch(&mut self, key: &str, value: &str, node: NodeId) -> CoreResult<()> {
        let library = self.library;
        let Some(action_ids) = library.actions_for_key(key) else {
            return Ok(());
        };

        for &id in action_ids {
            let action = &library.actions()[id];
            let Some(found) = action.path.chain().walk(self.tree, node, Some(value)) else {
                continue;
            };
            self.matches.add(key, &found.value, found.node)?;

            match &action.role {
                ActionRole::Require { .. } => self.require_hits[id] += 1,
                ActionRole::Extract { .. } => {
                    // 同一动作多次命中时保留第一次的值
                    if self.extracted[id].is_none() {
                        self.extracted[id] = Some(found.value.into_owned());
                    }
                }
            }
            if !self.touched[action.matcher] {
                self.touched[action.matcher] = true;
                self.touched_order.push(action.matcher);
            }
        }
        Ok(())
    }

    fn requirement_met(&self, id: usize) -> bool {
        match self.library.actions()[id].role {
            ActionRole::Require { is_null: true } => self.require_hits[id] == 0,
            ActionRole::Require { is_null: false } => self.require_hits[id] > 0,
            ActionRole::Extract { .. } => false,
        }
    }

    /// 评估所有触及的规则与零输入规则，并把结果写入接收方
    pub fn finish(self, sink: &mut dyn ResultSink) -> AnalyzeReport {
        let library = self.library;
        let mut candidates = self.touched_order.clone();
        candidates.extend_from_slice(library.zero_input_matchers());
        candidates.sort_unstable();
        candidates.dedup();

        let mut collector = FieldCollector::default();
        let mut fired = 0;
        for &matcher_id in &candidates {
            let matcher = &library.matchers()[matcher_id];
            if !matcher.require.iter().all(|&id| self.requirement_met(id)) {
                continue;
            }
            if !matcher.extract.iter().all(|&id| self.extracted[id].is_some()) {
                continue;
            }

            fired += 1;
            log::trace!("Matcher {} fired", matcher.source);
            for &id in &matcher.extract {
                if let (ActionRole::Extract { field, confidence }, Some(value)) =
                    (&library.actions()[id].role, &self.extracted[id])
                {
                    collector.offer(field, value, *confidence);
                }
            }
            for fixed in &matcher.fixed {
                collector.offer(&fixed.field, &fixed.value, fixed.confidence);
            }
        }

        let collisions = collector.flush(sink);
        AnalyzeReport {
            touched_matchers: self.touched_order.len(),
            fired_matchers: fired,
            collisions,
            matches: self.matches,
        }
    }
}

impl<'a> Analyzer for AnalyzeSession<'a> {
    fn inform(&mut self, path: &str, value: &str, node: NodeId) -> CoreResult<()> {
        let library = self.library;
        let path = path.to_lowercase();
        self.dispatch(&path, value, node)?;

        if library.is_value_keyed(&path) {
            self.dispatch(&value_key(&path, value), value, node)?;
        }
        if library.is_prefix_keyed(&path) {
            let mut prefix_end = value.char_indices().map(|(i, c)| i + c.len_utf8());
            for _ in 0..PREFIX_HASH_LIMIT {
                let Some(end) = prefix_end.next() else { break };
                self.dispatch(&prefix_key(&path, &value[..end]), value, node)?;
            }
        }
        Ok(())
    }

    fn required_inform_ranges(&self, path: &str) -> &[WordRange] {
        self.library.required_ranges(path)
    }
}
