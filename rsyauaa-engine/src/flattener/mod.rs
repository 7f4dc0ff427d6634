//! 语法树扁平化
//! 深度优先遍历整棵树，把每个节点以 `父路径.(序号)名称` 的形式通知给分析器；
//! 分析器声明过需要的词区间会以 `路径[a-b]` 额外通知（同一节点、不占序号）
use crate::core::limits::{AGENT, SPLIT_LIST_THRESHOLD, SYNTAX_ERROR};
use crate::core::range::WordRange;
use crate::core::tree::{NodeId, PathCounters, SemanticChild, SyntaxTree};
use crate::error::CoreResult;
use crate::splitter::SplitterKind;

/// 扁平化结果的接收方
pub trait Analyzer {
    fn inform(&mut self, path: &str, value: &str, node: NodeId) -> CoreResult<()>;

    /// 该路径需要额外通知的词区间
    fn required_inform_ranges(&self, path: &str) -> &[WordRange];
}

/// 单次扁平化期间每个节点的状态（路径 + 子节点计数器）
#[derive(Debug, Default, Clone)]
struct NodeState {
    path: String,
    counters: PathCounters,
}

/// 按 NodeId 下标存放的节点状态表，只在一次 flatten 调用内存在
struct FlattenState {
    nodes: Vec<Option<NodeState>>,
}

impl FlattenState {
    fn new(size: usize) -> Self {
        Self {
            nodes: vec![None; size],
        }
    }

    fn enter_root(&mut self, root: NodeId) {
        self.nodes[root.index()] = Some(NodeState {
            path: AGENT.to_string(),
            counters: PathCounters::default(),
        });
    }

    /// 为子节点分配序号与路径
    fn enter_child(&mut self, parent: NodeId, child: &SemanticChild) -> String {
        let path = match self.nodes[parent.index()].as_mut() {
            Some(state) => {
                let index = state.counters.bump(child.counter);
                format!("{}.({}){}", state.path, index, child.name)
            }
            None => format!("{}.(1){}", AGENT, child.name),
        };
        self.nodes[child.node.index()] = Some(NodeState {
            path: path.clone(),
            counters: PathCounters::default(),
        });
        path
    }

    /// 子节点全部处理完后释放
    fn leave(&mut self, node: NodeId) {
        self.nodes[node.index()] = None;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TreeFlattener {
    split_list_threshold: usize,
}

impl Default for TreeFlattener {
    fn default() -> Self {
        Self {
            split_list_threshold: SPLIT_LIST_THRESHOLD,
        }
    }
}

impl TreeFlattener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_split_list_threshold(mut self, threshold: usize) -> Self {
        self.split_list_threshold = threshold;
        self
    }

    pub fn flatten<A>(&self, tree: &SyntaxTree, analyzer: &mut A) -> CoreResult<()>
    where
        A: Analyzer + ?Sized,
    {
        let root = tree.root();
        let flag = if tree.has_syntax_error() { "true" } else { "false" };
        analyzer.inform(SYNTAX_ERROR, flag, root)?;

        let mut state = FlattenState::new(tree.len());
        state.enter_root(root);
        analyzer.inform(AGENT, tree.text(root), root)?;
        self.visit(tree, root, &mut state, analyzer)
    }

    /// 先序遍历，用显式栈代替递归，树的深度不受调用栈限制
    fn visit<A>(
        &self,
        tree: &SyntaxTree,
        root: NodeId,
        state: &mut FlattenState,
        analyzer: &mut A,
    ) -> CoreResult<()>
    where
        A: Analyzer + ?Sized,
    {
        let mut stack = vec![(root, tree.semantic_children(root))];
        while let Some((parent, children)) = stack.last_mut() {
            let parent = *parent;
            let Some(child) = children.next() else {
                stack.pop();
                state.leave(parent);
                continue;
            };
            let path = state.enter_child(parent, &child);
            let text = tree.text(child.node);
            analyzer.inform(&path, text, child.node)?;
            if let Some(kind) = child.splitter {
                self.inform_ranges(&path, text, child.node, kind, analyzer)?;
            }
            stack.push((child.node, tree.semantic_children(child.node)));
        }
        Ok(())
    }

    fn inform_ranges<A>(
        &self,
        path: &str,
        text: &str,
        node: NodeId,
        kind: SplitterKind,
        analyzer: &mut A,
    ) -> CoreResult<()>
    where
        A: Analyzer + ?Sized,
    {
        let ranges = analyzer.required_inform_ranges(path);
        if ranges.is_empty() {
            return Ok(());
        }
        let ranges = ranges.to_vec();
        let splitter = kind.splitter();

        if ranges.len() > self.split_list_threshold {
            let list = splitter.create_split_list(text);
            for range in ranges {
                if let Some(value) =
                    splitter.split_range_with_list(text, &list, range.first, range.last)
                {
                    analyzer.inform(&format!("{}{}", path, range), value, node)?;
                }
            }
        } else {
            for range in ranges {
                if let Some(value) = splitter.split_range(text, range.first, range.last) {
                    analyzer.inform(&format!("{}{}", path, range), value, node)?;
                }
            }
        }
        Ok(())
    }
}
