use std::borrow::Cow;

use super::normalize::{clean_version, normalize_brand};
use super::step::{ends_with_ignore_case, starts_with_ignore_case, Step, StepKind};
use crate::core::tree::{NodeId, SyntaxTree};
use crate::splitter::{Splitter, WordSplitter};

/// 一次成功遍历的终点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkResult<'a> {
    pub node: NodeId,
    pub value: Cow<'a, str>,
}

/// 步骤链：步骤存放在 Vec 中，用下标串成单链
/// 编译完成后不可变，可在多个线程的多次解析之间共享
#[derive(Debug, Clone, Default)]
pub struct StepChain {
    steps: Vec<Step>,
    head: Option<usize>,
}

impl StepChain {
    pub fn from_kinds(kinds: Vec<StepKind>) -> Self {
        let len = kinds.len();
        let steps = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| Step {
                kind,
                next: (i + 1 < len).then_some(i + 1),
            })
            .collect();
        Self {
            steps,
            head: (len > 0).then_some(0),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// 按链接顺序遍历步骤
    pub fn iter(&self) -> impl Iterator<Item = &StepKind> + '_ {
        std::iter::successors(self.head, move |&i| self.steps[i].next)
            .map(move |i| &self.steps[i].kind)
    }

    /// 每个步骤的文本形式
    pub fn render(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }

    /// 裁掉结尾处所有不会失败的步骤；整条链都不会失败时变为空链
    /// 只用于 require：它只关心「能否走通」，不关心最终值
    pub fn prune_trailing_steps_that_cannot_fail(&mut self) {
        let order: Vec<usize> = std::iter::successors(self.head, |&i| self.steps[i].next).collect();
        match order.iter().rposition(|&i| self.steps[i].kind.can_fail()) {
            Some(keep) => self.steps[order[keep]].next = None,
            None => self.head = None,
        }
    }

    /// 从 node 出发执行整条链
    /// value 为 None 时当前值取节点原文
    pub fn walk<'a>(
        &'a self,
        tree: &'a SyntaxTree,
        node: NodeId,
        value: Option<&'a str>,
    ) -> Option<WalkResult<'a>> {
        self.walk_from(self.head, tree, node, value.map(Cow::Borrowed))
    }

    fn walk_from<'a>(
        &'a self,
        at: Option<usize>,
        tree: &'a SyntaxTree,
        node: NodeId,
        value: Option<Cow<'a, str>>,
    ) -> Option<WalkResult<'a>> {
        let Some(index) = at else {
            return Some(WalkResult {
                node,
                value: value.unwrap_or_else(|| Cow::Borrowed(tree.text(node))),
            });
        };
        let step = &self.steps[index];
        let next = step.next;
        let actual = || value.clone().unwrap_or_else(|| Cow::Borrowed(tree.text(node)));

        match &step.kind {
            StepKind::IsNull => self.walk_from(next, tree, node, value),

            // ---------- 树上移动：值重置为新节点原文 ----------
            StepKind::Up => {
                let parent = tree.semantic_parent(node)?;
                self.walk_from(next, tree, parent, None)
            }
            StepKind::Next(n) => {
                let target = tree.sibling(node, *n as isize)?;
                self.walk_from(next, tree, target, None)
            }
            StepKind::Prev(n) => {
                let target = tree.sibling(node, -(*n as isize))?;
                self.walk_from(next, tree, target, None)
            }
            StepKind::Down { range, name } => {
                for child in tree.path_children(node) {
                    if child.name != name.as_str() {
                        continue;
                    }
                    if child.index > range.end {
                        break;
                    }
                    if !range.contains(child.index) {
                        continue;
                    }
                    if let Some(found) = self.walk_from(next, tree, child.node, None) {
                        return Some(found);
                    }
                }
                None
            }
            StepKind::BackToFull => self.walk_from(next, tree, node, None),

            // ---------- 过滤 ----------
            StepKind::Equals(expected) => {
                let actual = actual();
                actual
                    .eq_ignore_ascii_case(expected)
                    .then_some(())
                    .and_then(|_| self.walk_from(next, tree, node, Some(actual)))
            }
            StepKind::NotEquals(expected) => {
                let actual = actual();
                (!actual.eq_ignore_ascii_case(expected))
                    .then_some(())
                    .and_then(|_| self.walk_from(next, tree, node, Some(actual)))
            }
            StepKind::StartsWith(prefix) => {
                let actual = actual();
                starts_with_ignore_case(&actual, prefix)
                    .then_some(())
                    .and_then(|_| self.walk_from(next, tree, node, Some(actual)))
            }
            StepKind::EndsWith(suffix) => {
                let actual = actual();
                ends_with_ignore_case(&actual, suffix)
                    .then_some(())
                    .and_then(|_| self.walk_from(next, tree, node, Some(actual)))
            }
            StepKind::Contains { lower, .. } => {
                let actual = actual();
                actual
                    .to_lowercase()
                    .contains(lower.as_str())
                    .then_some(())
                    .and_then(|_| self.walk_from(next, tree, node, Some(actual)))
            }
            StepKind::IsInSet(set) => {
                let actual = actual();
                set.contains(&actual)
                    .then_some(())
                    .and_then(|_| self.walk_from(next, tree, node, Some(actual)))
            }
            StepKind::IsInLookupPrefix(table) => {
                let actual = actual();
                table
                    .has_prefix_key(&actual)
                    .then_some(())
                    .and_then(|_| self.walk_from(next, tree, node, Some(actual)))
            }

            // ---------- 变换 ----------
            StepKind::WordRange(range) => {
                let sliced = slice_value(actual(), |v| WordSplitter.split(v, *range))?;
                self.walk_from(next, tree, node, Some(sliced))
            }
            StepKind::Lookup { table, default } => {
                let actual = actual();
                let found = table
                    .get(&actual)
                    .or(default.as_deref())
                    .or(table.default_value())?;
                self.walk_from(next, tree, node, Some(Cow::Borrowed(found)))
            }
            StepKind::LookupPrefix { table, default } => {
                let actual = actual();
                let found = table
                    .longest_prefix_match(&actual)
                    .map(|(_, v)| v)
                    .or(default.as_deref())
                    .or(table.default_value())?;
                self.walk_from(next, tree, node, Some(Cow::Borrowed(found)))
            }
            StepKind::CleanVersion => {
                let cleaned = clean_version(&actual());
                self.walk_from(next, tree, node, Some(Cow::Owned(cleaned)))
            }
            StepKind::NormalizeBrand => {
                let normalized = normalize_brand(&actual());
                self.walk_from(next, tree, node, Some(Cow::Owned(normalized)))
            }
            StepKind::Concat { prefix, postfix } => {
                let joined = format!("{}{}{}", prefix, actual(), postfix);
                self.walk_from(next, tree, node, Some(Cow::Owned(joined)))
            }
            StepKind::ConcatPrefix(prefix) => {
                let joined = format!("{}{}", prefix, actual());
                self.walk_from(next, tree, node, Some(Cow::Owned(joined)))
            }
            StepKind::ConcatPostfix(postfix) => {
                let joined = format!("{}{}", actual(), postfix);
                self.walk_from(next, tree, node, Some(Cow::Owned(joined)))
            }
        }
    }
}

/// 在保留借用的前提下对值取子串
fn slice_value<'a, F>(value: Cow<'a, str>, slice: F) -> Option<Cow<'a, str>>
where
    F: for<'x> Fn(&'x str) -> Option<&'x str>,
{
    match value {
        Cow::Borrowed(v) => slice(v).map(Cow::Borrowed),
        Cow::Owned(v) => slice(&v).map(|s| Cow::Owned(s.to_string())),
    }
}
