//! User-Agent 语法树
//! 节点统一放在 arena（Vec）里，用 NodeId 互相引用；树在构建完成后只读，
//! 规则遍历（Up/Down/Next/Prev）与扁平化都基于这里提供的「语义视图」：
//! 包装节点（ProductName/ProductVersion）对路径透明，分隔符节点不参与编号
use std::ops::Range;

use crate::core::limits::AGENT;
use crate::error::{CoreError, CoreResult};
use crate::splitter::SplitterKind;

/// arena 中的节点编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 节点种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// 根节点，覆盖整个 User-Agent
    Agent,
    Product,
    /// 产品名的包装节点，内部是 Name
    ProductName,
    /// 产品版本的包装节点，内部是 Version/Url/Email/KeyValue...
    ProductVersion,
    Name,
    Comments,
    CommentEntry,
    Text,
    Version,
    KeyValue,
    Key,
    Url,
    Email,
    Uuid,
    Base64,
    /// 分隔符（`/`、`;` 等），保留在树中但不参与路径
    Separator,
}

/// 同一父节点下的独立编号计数器
/// version 与 comments 各自计数，其余语义子节点共用 child 计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Child,
    Version,
    Comment,
}

impl NodeKind {
    #[inline(always)]
    pub fn is_wrapper(self) -> bool {
        matches!(self, NodeKind::ProductName | NodeKind::ProductVersion)
    }

    /// 路径名与所属计数器；根、包装与分隔符没有路径名
    pub fn path_name(self) -> Option<(&'static str, CounterKind)> {
        let named = match self {
            NodeKind::Product => ("product", CounterKind::Child),
            NodeKind::Name => ("name", CounterKind::Child),
            NodeKind::Version => ("version", CounterKind::Version),
            NodeKind::Comments => ("comments", CounterKind::Comment),
            NodeKind::CommentEntry => ("entry", CounterKind::Child),
            NodeKind::Text => ("text", CounterKind::Child),
            NodeKind::KeyValue => ("keyvalue", CounterKind::Child),
            NodeKind::Key => ("key", CounterKind::Child),
            NodeKind::Url => ("url", CounterKind::Child),
            NodeKind::Email => ("email", CounterKind::Child),
            NodeKind::Uuid => ("uuid", CounterKind::Child),
            NodeKind::Base64 => ("base64", CounterKind::Child),
            NodeKind::Agent
            | NodeKind::ProductName
            | NodeKind::ProductVersion
            | NodeKind::Separator => return None,
        };
        Some(named)
    }

    /// 需要按词/版本分段通知子区间的节点种类
    pub fn splitter(self) -> Option<SplitterKind> {
        match self {
            NodeKind::Name | NodeKind::Text | NodeKind::CommentEntry | NodeKind::Key => {
                Some(SplitterKind::Word)
            }
            NodeKind::Version => Some(SplitterKind::Version),
            _ => None,
        }
    }
}

/// 每个父节点一份的编号状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCounters {
    child: usize,
    version: usize,
    comment: usize,
}

impl PathCounters {
    /// 计数器加一并返回新序号（1 起始）
    #[inline(always)]
    pub fn bump(&mut self, counter: CounterKind) -> usize {
        let slot = match counter {
            CounterKind::Child => &mut self.child,
            CounterKind::Version => &mut self.version,
            CounterKind::Comment => &mut self.comment,
        };
        *slot += 1;
        *slot
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub start: usize,
    pub end: usize,
}

/// 只读语法树
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<SyntaxNode>,
    syntax_error: bool,
}

impl SyntaxTree {
    #[inline(always)]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_syntax_error(&self) -> bool {
        self.syntax_error
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline(always)]
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    #[inline(always)]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// 节点覆盖的原文片段（区间在构建期已校验过边界）
    pub fn text(&self, id: NodeId) -> &str {
        let node = self.node(id);
        self.source.get(node.start..node.end).unwrap_or("")
    }

    /// 语义父节点：跳过包装节点
    pub fn semantic_parent(&self, id: NodeId) -> Option<NodeId> {
        let mut parent = self.node(id).parent?;
        while self.kind(parent).is_wrapper() {
            parent = self.node(parent).parent?;
        }
        Some(parent)
    }

    /// 语义子节点：包装展开、分隔符跳过，按文本顺序
    pub fn semantic_children(&self, id: NodeId) -> SemanticChildren<'_> {
        SemanticChildren {
            tree: self,
            outer: self.children(id),
            outer_pos: 0,
            inner: &[],
            inner_pos: 0,
        }
    }

    /// 带序号的语义子节点
    pub fn path_children(&self, id: NodeId) -> PathChildren<'_> {
        PathChildren {
            children: self.semantic_children(id),
            counters: PathCounters::default(),
        }
    }

    /// 语义兄弟节点，offset 为正向后、为负向前
    pub fn sibling(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.semantic_parent(id)?;
        let position = self.semantic_children(parent).position(|c| c.node == id)?;
        let target = position.checked_add_signed(offset)?;
        self.semantic_children(parent).nth(target).map(|c| c.node)
    }

    /// 节点的完整路径（调试与诊断用，匹配热路径不会调用）
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        if id == self.root() {
            return Some(AGENT.to_string());
        }
        let parent = self.semantic_parent(id)?;
        let prefix = self.path_of(parent)?;
        let child = self.path_children(parent).find(|c| c.node == id)?;
        Some(format!("{}.({}){}", prefix, child.index, child.name))
    }
}

/// 一个语义子节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticChild {
    pub node: NodeId,
    pub name: &'static str,
    pub counter: CounterKind,
    pub splitter: Option<SplitterKind>,
}

/// 语义子节点迭代器
pub struct SemanticChildren<'t> {
    tree: &'t SyntaxTree,
    outer: &'t [NodeId],
    outer_pos: usize,
    inner: &'t [NodeId],
    inner_pos: usize,
}

impl<'t> SemanticChildren<'t> {
    fn describe(&self, id: NodeId) -> Option<SemanticChild> {
        let kind = self.tree.kind(id);
        let (name, counter) = kind.path_name()?;
        Some(SemanticChild {
            node: id,
            name,
            counter,
            splitter: kind.splitter(),
        })
    }
}

impl<'t> Iterator for SemanticChildren<'t> {
    type Item = SemanticChild;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.inner_pos < self.inner.len() {
                let id = self.inner[self.inner_pos];
                self.inner_pos += 1;
                if let Some(child) = self.describe(id) {
                    return Some(child);
                }
                continue;
            }

            let id = *self.outer.get(self.outer_pos)?;
            self.outer_pos += 1;
            if self.tree.kind(id).is_wrapper() {
                self.inner = self.tree.children(id);
                self.inner_pos = 0;
                continue;
            }
            if let Some(child) = self.describe(id) {
                return Some(child);
            }
        }
    }
}

/// 带序号的语义子节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathChild {
    pub node: NodeId,
    pub name: &'static str,
    pub index: usize,
}

pub struct PathChildren<'t> {
    children: SemanticChildren<'t>,
    counters: PathCounters,
}

impl<'t> Iterator for PathChildren<'t> {
    type Item = PathChild;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.children.next()?;
        Some(PathChild {
            node: child.node,
            name: child.name,
            index: self.counters.bump(child.counter),
        })
    }
}

/// 语法树构建器
/// 由具体的 User-Agent 语法实现调用；所有区间在加入时校验，build 之后树不可变
#[derive(Debug)]
pub struct TreeBuilder {
    source: String,
    nodes: Vec<SyntaxNode>,
    syntax_error: bool,
}

impl TreeBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let root = SyntaxNode {
            kind: NodeKind::Agent,
            parent: None,
            children: Vec::new(),
            start: 0,
            end: source.len(),
        };
        Self {
            source,
            nodes: vec![root],
            syntax_error: false,
        }
    }

    #[inline(always)]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 追加子节点，区间必须落在字符边界上
    pub fn add_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        span: Range<usize>,
    ) -> CoreResult<NodeId> {
        if kind == NodeKind::Agent {
            return Err(CoreError::InvalidInput(
                "agent node can only be the root".to_string(),
            ));
        }
        if parent.index() >= self.nodes.len() {
            return Err(CoreError::InvalidInput(format!(
                "unknown parent node {}",
                parent.index()
            )));
        }
        self.check_span(&span)?;

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            start: span.start,
            end: span.end,
        });
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    /// 扩展节点的结束位置（产品节点随版本、注释的解析逐步变长）
    pub fn set_end(&mut self, id: NodeId, end: usize) -> CoreResult<()> {
        let start = self
            .nodes
            .get(id.index())
            .map(|n| n.start)
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown node {}", id.index())))?;
        self.check_span(&(start..end))?;
        self.nodes[id.index()].end = end;
        Ok(())
    }

    pub fn mark_syntax_error(&mut self) {
        self.syntax_error = true;
    }

    pub fn build(self) -> SyntaxTree {
        SyntaxTree {
            source: self.source,
            nodes: self.nodes,
            syntax_error: self.syntax_error,
        }
    }

    fn check_span(&self, span: &Range<usize>) -> CoreResult<()> {
        let valid = span.start <= span.end
            && span.end <= self.source.len()
            && self.source.is_char_boundary(span.start)
            && self.source.is_char_boundary(span.end);
        if valid {
            Ok(())
        } else {
            Err(CoreError::InvalidInput(format!(
                "span {}..{} is outside the source text",
                span.start, span.end
            )))
        }
    }
}
