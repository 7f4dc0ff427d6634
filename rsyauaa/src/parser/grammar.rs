//! User-Agent 语法：词法单元 → 语法树
//!
//! ```text
//! agent    := ( product | text | url | email | uuid | base64 | comments )*
//! product  := words ( '/' value )+ comments*  |  words comments+
//! comments := '(' entry ( (';' | ',') entry )* ')'
//! entry    := keyvalue | words version | agent-like content
//! ```
//! 括号不配对或嵌套过深时置语法错误标志，但仍尽量给出完整的树
use std::ops::Range;

use rsyauaa_engine::{NodeId, NodeKind, SyntaxTree, TreeBuilder};

use super::lexer::{tokenize, Token, TokenKind};
use crate::error::RsyResult;

/// 注释块最大嵌套层数，更深的部分整体作为文本
pub const MAX_COMMENT_DEPTH: usize = 64;

/// 解析一条 User-Agent，返回只读语法树
pub fn parse_user_agent(input: &str) -> RsyResult<SyntaxTree> {
    let mut parser = UaParser::new(input);
    let root = parser.builder.root();
    let end = parser.tokens.len();
    parser.parse_items(root, 0, end)?;
    if parser.syntax_error {
        parser.builder.mark_syntax_error();
        log::debug!("User-Agent has unbalanced parentheses");
    }
    Ok(parser.builder.build())
}

struct UaParser {
    tokens: Vec<Token>,
    builder: TreeBuilder,
    syntax_error: bool,
    depth: usize,
}

impl UaParser {
    fn new(input: &str) -> Self {
        Self {
            tokens: tokenize(input),
            builder: TreeBuilder::new(input),
            syntax_error: false,
            depth: 0,
        }
    }

    #[inline]
    fn kind(&self, i: usize, to: usize) -> Option<TokenKind> {
        (i < to).then(|| self.tokens[i].kind)
    }

    #[inline]
    fn span(&self, from: usize, to_inclusive: usize) -> Range<usize> {
        self.tokens[from].start..self.tokens[to_inclusive].end
    }

    fn text(&self, i: usize) -> &str {
        let t = &self.tokens[i];
        &self.builder.source()[t.start..t.end]
    }

    /// 解析 [from, to) 内的一串条目，挂到 parent 下
    fn parse_items(&mut self, parent: NodeId, from: usize, to: usize) -> RsyResult<()> {
        let mut i = from;
        while i < to {
            let token = self.tokens[i];
            i = match token.kind {
                TokenKind::Space | TokenKind::Semicolon | TokenKind::Comma | TokenKind::Slash => i + 1,
                TokenKind::Close => {
                    self.syntax_error = true;
                    i + 1
                }
                TokenKind::Open => self.parse_comments(parent, i, to)?.0,
                TokenKind::Word => self.parse_product_or_text(parent, i, to)?,
                kind => {
                    self.builder
                        .add_node(parent, special_kind(kind), token.start..token.end)?;
                    i + 1
                }
            };
        }
        Ok(())
    }

    /// 从 i 开始的连续单词，后接 `/` 或 `(` 时是产品，否则是文本
    fn parse_product_or_text(&mut self, parent: NodeId, from: usize, to: usize) -> RsyResult<usize> {
        let mut last_word = from;
        loop {
            match (self.kind(last_word + 1, to), self.kind(last_word + 2, to)) {
                (Some(TokenKind::Space), Some(TokenKind::Word)) => last_word += 2,
                _ => break,
            }
        }

        let after = last_word + 1;
        let opens_comments = match (self.kind(after, to), self.kind(after + 1, to)) {
            (Some(TokenKind::Open), _) => true,
            (Some(TokenKind::Space), Some(TokenKind::Open)) => true,
            _ => false,
        };
        if self.kind(after, to) != Some(TokenKind::Slash) && !opens_comments {
            self.builder
                .add_node(parent, NodeKind::Text, self.span(from, last_word))?;
            return Ok(after);
        }

        let name_span = self.span(from, last_word);
        let product = self.builder.add_node(parent, NodeKind::Product, name_span.clone())?;
        let wrapper = self
            .builder
            .add_node(product, NodeKind::ProductName, name_span.clone())?;
        self.builder.add_node(wrapper, NodeKind::Name, name_span.clone())?;
        let mut end = name_span.end;
        let mut i = after;

        // '/' 版本，可连续多个
        while self.kind(i, to) == Some(TokenKind::Slash) {
            let slash = self.tokens[i];
            self.builder
                .add_node(product, NodeKind::Separator, slash.start..slash.end)?;
            end = slash.end;
            i += 1;
            match self.kind(i, to) {
                Some(kind) if kind.is_value() => {
                    let value = self.tokens[i];
                    let wrapper = self.builder.add_node(
                        product,
                        NodeKind::ProductVersion,
                        value.start..value.end,
                    )?;
                    let inner = match kind {
                        TokenKind::Word => NodeKind::Version,
                        other => special_kind(other),
                    };
                    self.builder.add_node(wrapper, inner, value.start..value.end)?;
                    end = value.end;
                    i += 1;
                }
                _ => break,
            }
        }

        // 紧随其后的注释块属于该产品
        loop {
            let open = match (self.kind(i, to), self.kind(i + 1, to)) {
                (Some(TokenKind::Open), _) => i,
                (Some(TokenKind::Space), Some(TokenKind::Open)) => i + 1,
                _ => break,
            };
            let (next, comments_end) = self.parse_comments(product, open, to)?;
            end = comments_end;
            i = next;
        }

        self.builder.set_end(product, end)?;
        Ok(i)
    }

    /// 解析从 open 开始的注释块，返回 (下一个位置, 结束字节)
    /// 超过 MAX_COMMENT_DEPTH 时剩余部分挂成一个文本节点
    fn parse_comments(&mut self, parent: NodeId, open: usize, to: usize) -> RsyResult<(usize, usize)> {
        if self.depth >= MAX_COMMENT_DEPTH {
            self.syntax_error = true;
            let span = self.span(open, to - 1);
            let end = span.end;
            self.builder.add_node(parent, NodeKind::Text, span)?;
            log::debug!("Comment nesting too deep | Depth: {}", self.depth);
            return Ok((to, end));
        }
        self.depth += 1;
        let parsed = self.parse_comment_block(parent, open, to);
        self.depth -= 1;
        parsed
    }

    fn parse_comment_block(
        &mut self,
        parent: NodeId,
        open: usize,
        to: usize,
    ) -> RsyResult<(usize, usize)> {
        let start = self.tokens[open].start;
        let comments = self
            .builder
            .add_node(parent, NodeKind::Comments, start..self.tokens[open].end)?;
        let mut i = open + 1;
        loop {
            match self.kind(i, to) {
                None => {
                    // 缺少右括号：注释块延伸到可用范围末尾
                    self.syntax_error = true;
                    let end = if to > 0 { self.tokens[to - 1].end } else { start };
                    self.builder.set_end(comments, end.max(start + 1))?;
                    return Ok((i, end.max(start + 1)));
                }
                Some(TokenKind::Close) => {
                    let end = self.tokens[i].end;
                    self.builder.set_end(comments, end)?;
                    return Ok((i + 1, end));
                }
                Some(TokenKind::Space | TokenKind::Semicolon | TokenKind::Comma) => i += 1,
                Some(_) => i = self.parse_entry(comments, i, to)?,
            }
        }
    }

    /// 一个注释条目：到同层的 `;` `,` `)` 为止
    fn parse_entry(&mut self, comments: NodeId, from: usize, to: usize) -> RsyResult<usize> {
        let mut depth = 0usize;
        let mut stop = from;
        while stop < to {
            match self.tokens[stop].kind {
                TokenKind::Open => depth += 1,
                TokenKind::Close if depth > 0 => depth -= 1,
                TokenKind::Close | TokenKind::Semicolon | TokenKind::Comma if depth == 0 => break,
                _ => {}
            }
            stop += 1;
        }
        let mut last = stop - 1;
        while last > from && self.tokens[last].kind == TokenKind::Space {
            last -= 1;
        }

        let entry = self
            .builder
            .add_node(comments, NodeKind::CommentEntry, self.span(from, last))?;

        if from == last && self.tokens[from].kind == TokenKind::Word {
            if let Some(split) = key_value_split(self.text(from)) {
                self.add_key_value(entry, from, split)?;
                return Ok(stop);
            }
        }
        if let Some(version_at) = self.trailing_version(from, last) {
            self.add_name_version(entry, from, version_at)?;
            return Ok(stop);
        }
        self.parse_items(entry, from, last + 1)?;
        Ok(stop)
    }

    /// `Android 7.0`：至少两个单词、无其它结构、最后一个单词以数字开头
    fn trailing_version(&self, from: usize, last: usize) -> Option<usize> {
        if last < from + 2 {
            return None;
        }
        let plain = (from..=last).all(|i| {
            matches!(self.tokens[i].kind, TokenKind::Word | TokenKind::Space)
        });
        let starts_with_digit = self
            .text(last)
            .as_bytes()
            .first()
            .is_some_and(u8::is_ascii_digit);
        (plain && starts_with_digit && self.tokens[last].kind == TokenKind::Word).then_some(last)
    }

    fn add_name_version(&mut self, entry: NodeId, from: usize, version_at: usize) -> RsyResult<()> {
        let name_span = self.span(from, version_at - 2);
        let version_span = self.span(version_at, version_at);
        let product = self
            .builder
            .add_node(entry, NodeKind::Product, name_span.start..version_span.end)?;
        let wrapper = self
            .builder
            .add_node(product, NodeKind::ProductName, name_span.clone())?;
        self.builder.add_node(wrapper, NodeKind::Name, name_span)?;
        let wrapper = self
            .builder
            .add_node(product, NodeKind::ProductVersion, version_span.clone())?;
        self.builder.add_node(wrapper, NodeKind::Version, version_span)?;
        Ok(())
    }

    fn add_key_value(&mut self, entry: NodeId, at: usize, split: usize) -> RsyResult<()> {
        let token = self.tokens[at];
        let key_end = token.start + split;
        let value_start = key_end + 1;
        let pair = self
            .builder
            .add_node(entry, NodeKind::KeyValue, token.start..token.end)?;
        self.builder.add_node(pair, NodeKind::Key, token.start..key_end)?;

        let value = &self.builder.source()[value_start..token.end];
        let value_kind = if value.as_bytes().first().is_some_and(u8::is_ascii_digit) {
            NodeKind::Version
        } else {
            NodeKind::Text
        };
        self.builder.add_node(pair, value_kind, value_start..token.end)?;
        Ok(())
    }
}

/// `rv:109.0` / `lang=en`：键为字母数字，值非空
fn key_value_split(word: &str) -> Option<usize> {
    let split = word.find([':', '='])?;
    let key = &word[..split];
    let value = &word[split + 1..];
    let valid_key = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    (valid_key && !value.is_empty()).then_some(split)
}

fn special_kind(kind: TokenKind) -> NodeKind {
    match kind {
        TokenKind::Url => NodeKind::Url,
        TokenKind::Email => NodeKind::Email,
        TokenKind::Uuid => NodeKind::Uuid,
        TokenKind::Base64 => NodeKind::Base64,
        _ => NodeKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 所有可寻址节点的 (路径, 文本)
    fn paths(input: &str) -> Vec<(String, String)> {
        let tree = parse_user_agent(input).unwrap();
        let mut out = Vec::new();
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            if let Some(path) = tree.path_of(id) {
                out.push((path, tree.text(id).to_string()));
            }
            stack.extend(tree.children(id).iter().rev().copied());
        }
        out
    }

    fn has(paths: &[(String, String)], path: &str, text: &str) -> bool {
        paths.iter().any(|(p, t)| p == path && t == text)
    }

    const NEXUS: &str = "Mozilla/5.0 (Linux; Android 7.0; Nexus 6 Build/NBD90Z) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/53.0.2785.124 Mobile Safari/537.36";

    #[test]
    fn test_products_and_versions() {
        let p = paths(NEXUS);
        assert!(has(&p, "agent.(1)product.(1)name", "Mozilla"));
        assert!(has(&p, "agent.(1)product.(1)version", "5.0"));
        assert!(has(&p, "agent.(3)product.(1)name", "Chrome"));
        assert!(has(&p, "agent.(3)product.(1)version", "53.0.2785.124"));
        assert!(has(&p, "agent.(4)product.(1)name", "Mobile Safari"));
        assert!(has(&p, "agent.(2)product.(1)comments.(2)entry.(1)text", "like Gecko"));
    }

    #[test]
    fn test_comment_entries() {
        let p = paths(NEXUS);
        assert!(has(&p, "agent.(1)product.(1)comments.(1)entry", "Linux"));
        assert!(has(&p, "agent.(1)product.(1)comments.(1)entry.(1)text", "Linux"));
        assert!(has(
            &p,
            "agent.(1)product.(1)comments.(2)entry.(1)product.(1)name",
            "Android"
        ));
        assert!(has(
            &p,
            "agent.(1)product.(1)comments.(2)entry.(1)product.(1)version",
            "7.0"
        ));
        assert!(has(
            &p,
            "agent.(1)product.(1)comments.(3)entry.(1)product.(1)name",
            "Nexus 6 Build"
        ));
        assert!(has(
            &p,
            "agent.(1)product.(1)comments.(3)entry.(1)product.(1)version",
            "NBD90Z"
        ));
    }

    #[test]
    fn test_key_value_and_url() {
        let p = paths("Mozilla/5.0 (compatible; rv:109.0; +http://www.google.com/bot.html)");
        assert!(has(&p, "agent.(1)product.(1)comments.(2)entry.(1)keyvalue.(1)key", "rv"));
        assert!(has(
            &p,
            "agent.(1)product.(1)comments.(2)entry.(1)keyvalue.(1)version",
            "109.0"
        ));
        assert!(has(
            &p,
            "agent.(1)product.(1)comments.(3)entry.(1)url",
            "+http://www.google.com/bot.html"
        ));
    }

    #[test]
    fn test_trailing_text() {
        // 产品与文本共用同一个子节点计数
        let p = paths("Foo/1.0 Mobile");
        assert!(has(&p, "agent.(2)text", "Mobile"));
        let tree = parse_user_agent("Foo/1.0 Mobile").unwrap();
        assert!(!tree.has_syntax_error());
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let tree = parse_user_agent("Foo/1.0 (Linux; Android").unwrap();
        assert!(tree.has_syntax_error());
        let p = paths("Foo/1.0 (Linux; Android");
        assert!(has(&p, "agent.(1)product.(1)comments.(2)entry", "Android"));

        let stray = parse_user_agent("Foo/1.0 ) Bar/2").unwrap();
        assert!(stray.has_syntax_error());
    }

    #[test]
    fn test_nested_comments() {
        let p = paths("Foo/1 (Bar (Baz; Qux); Last)");
        assert!(has(&p, "agent.(1)product.(1)comments.(2)entry", "Last"));
        assert!(has(
            &p,
            "agent.(1)product.(1)comments.(1)entry.(1)product.(1)comments.(2)entry",
            "Qux"
        ));
    }

    #[test]
    fn test_deep_nesting_is_capped() {
        for input in ["(".repeat(2048), "a (".repeat(682)] {
            let tree = parse_user_agent(&input).unwrap();
            assert!(tree.has_syntax_error());
            let deepest = paths(&input)
                .iter()
                .map(|(p, _)| p.matches("comments").count())
                .max()
                .unwrap();
            assert_eq!(deepest, MAX_COMMENT_DEPTH);
        }
    }

    #[test]
    fn test_empty_input() {
        let tree = parse_user_agent("").unwrap();
        assert_eq!(tree.children(tree.root()).len(), 0);
        assert!(!tree.has_syntax_error());
    }
}
