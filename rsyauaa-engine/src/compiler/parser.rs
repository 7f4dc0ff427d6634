//! 路径表达式解析（手写递归下降）
//!
//! ```text
//! expr     := wrapper step* | "literal" | IDENT step*
//! wrapper  := NAME '[' args ']'
//! step     := '.' range? IDENT | '^' | '>'{1,3} | '<'{1,3} | '@' | '@{"set"}'
//!           | '[' words ']' | '=' STR | '!=' STR | '^=' STR | '$=' STR | '~=' STR
//!           | '{' STR (';' STR)? '}'
//! range    := '(' ( '*' | N | N '-' N | N '-' | '-' N ) ')'
//! ```
use super::ast::{MatcherExpr, PathStep, RangeSpec, Wrapper};
use crate::core::range::WordRange;
use crate::error::{CoreError, CoreResult};

const MAX_SIBLING_JUMP: u8 = 3;

/// 解析单个表达式，必须完整消费输入
pub fn parse_expression(expression: &str) -> CoreResult<MatcherExpr> {
    let mut parser = Parser::new(expression);
    let expr = parser.parse_expr()?;
    parser.skip_ws();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> CoreError {
        CoreError::PathSyntax {
            expression: self.src.to_string(),
            position: self.pos,
            message: message.into(),
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: u8) -> CoreResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`", c as char)))
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn parse_expr(&mut self) -> CoreResult<MatcherExpr> {
        self.skip_ws();
        if self.peek() == Some(b'"') {
            return Ok(MatcherExpr::Fixed(self.parse_string()?));
        }

        let ident = self.parse_ident()?;
        if self.peek() == Some(b'[') && is_wrapper_name(ident) {
            let wrapper = self.parse_wrapper(ident)?;
            let steps = self.parse_steps()?;
            return Ok(MatcherExpr::Wrapped {
                wrapper: Box::new(wrapper),
                steps,
            });
        }

        let steps = self.parse_steps()?;
        Ok(MatcherExpr::Path {
            root: ident.to_string(),
            steps,
        })
    }

    fn parse_ident(&mut self) -> CoreResult<&'a str> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn parse_number(&mut self) -> CoreResult<usize> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a number"));
        }
        self.src[start..self.pos]
            .parse::<usize>()
            .map_err(|e| self.error(format!("invalid number: {}", e)))
    }

    /// 双引号字符串，支持 `\"` 与 `\\`
    fn parse_string(&mut self) -> CoreResult<String> {
        self.expect(b'"')?;
        let mut out = String::new();
        let mut chunk_start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal")),
                Some(b'"') => {
                    out.push_str(&self.src[chunk_start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') if matches!(self.peek_at(1), Some(b'"' | b'\\')) => {
                    out.push_str(&self.src[chunk_start..self.pos]);
                    self.pos += 1;
                    chunk_start = self.pos;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// 查找表名：裸名称或带引号
    fn parse_table_name(&mut self) -> CoreResult<String> {
        if self.peek() == Some(b'"') {
            self.parse_string()
        } else {
            self.parse_ident().map(str::to_string)
        }
    }

    fn parse_steps(&mut self) -> CoreResult<Vec<PathStep>> {
        let mut steps = Vec::new();
        while let Some(c) = self.peek() {
            let step = match c {
                b']' | b';' | b' ' | b'\t' => break,
                b'.' => {
                    self.pos += 1;
                    let range = if self.peek() == Some(b'(') {
                        self.parse_range()?
                    } else {
                        RangeSpec::All
                    };
                    let name = self.parse_ident()?;
                    PathStep::Down {
                        range,
                        name: name.to_string(),
                    }
                }
                b'^' if self.peek_at(1) == Some(b'=') => {
                    self.pos += 2;
                    PathStep::StartsWith(self.parse_string()?)
                }
                b'^' => {
                    self.pos += 1;
                    PathStep::Up
                }
                b'>' => PathStep::Next(self.count_repeats(b'>')),
                b'<' => PathStep::Prev(self.count_repeats(b'<')),
                b'@' if self.peek_at(1) == Some(b'{') => {
                    self.pos += 2;
                    let name = self.parse_string()?;
                    self.expect(b'}')?;
                    PathStep::IsInSet(name)
                }
                b'@' => {
                    self.pos += 1;
                    PathStep::BackToFull
                }
                b'[' => PathStep::WordRange(self.parse_word_range()?),
                b'=' => {
                    self.pos += 1;
                    PathStep::Equals(self.parse_string()?)
                }
                b'!' | b'$' | b'~' => {
                    if self.peek_at(1) != Some(b'=') {
                        return Err(self.error("expected `=` after comparison operator"));
                    }
                    self.pos += 2;
                    let literal = self.parse_string()?;
                    match c {
                        b'!' => PathStep::NotEquals(literal),
                        b'$' => PathStep::EndsWith(literal),
                        _ => PathStep::Contains(literal),
                    }
                }
                b'{' => {
                    self.pos += 1;
                    let table = self.parse_string()?;
                    let default = if self.eat(b';') {
                        Some(self.parse_string()?)
                    } else {
                        None
                    };
                    self.expect(b'}')?;
                    PathStep::Lookup { table, default }
                }
                _ => return Err(self.error(format!("unexpected character `{}`", c as char))),
            };
            steps.push(step);
        }
        Ok(steps)
    }

    fn count_repeats(&mut self, c: u8) -> u8 {
        let mut n = 0;
        while n < MAX_SIBLING_JUMP && self.eat(c) {
            n += 1;
        }
        n
    }

    fn parse_range(&mut self) -> CoreResult<RangeSpec> {
        self.expect(b'(')?;
        let range = if self.eat(b'*') {
            RangeSpec::All
        } else if self.eat(b'-') {
            RangeSpec::UpTo(self.parse_number()?)
        } else {
            let start = self.parse_number()?;
            if self.eat(b'-') {
                if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    RangeSpec::Between(start, self.parse_number()?)
                } else {
                    RangeSpec::From(start)
                }
            } else {
                RangeSpec::Exact(start)
            }
        };
        self.expect(b')')?;

        let valid = match range {
            RangeSpec::All => true,
            RangeSpec::Exact(n) | RangeSpec::From(n) | RangeSpec::UpTo(n) => n >= 1,
            RangeSpec::Between(start, end) => start >= 1 && end >= start,
        };
        if !valid {
            return Err(self.error("child range must be 1-based and ascending"));
        }
        Ok(range)
    }

    fn parse_word_range(&mut self) -> CoreResult<WordRange> {
        self.expect(b'[')?;
        let (first, last) = if self.eat(b'-') {
            (1, self.parse_word_index()?)
        } else {
            let first = self.parse_word_index()?;
            if self.eat(b'-') {
                if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    (first, self.parse_word_index()?)
                } else {
                    (first, WordRange::TO_END)
                }
            } else {
                (first, first)
            }
        };
        self.expect(b']')?;
        WordRange::new(first, last).map_err(|e| self.error(e.to_string()))
    }

    /// 词区间下标，超出 i32 范围时报错而不是截断
    fn parse_word_index(&mut self) -> CoreResult<i32> {
        let n = self.parse_number()?;
        i32::try_from(n).map_err(|_| self.error(format!("word index {} is too large", n)))
    }

    fn parse_wrapper(&mut self, name: &str) -> CoreResult<Wrapper> {
        self.expect(b'[')?;
        self.skip_ws();
        let wrapper = match name {
            "IsNull" => Wrapper::IsNull(self.parse_expr()?),
            "CleanVersion" => Wrapper::CleanVersion(self.parse_expr()?),
            "NormalizeBrand" => Wrapper::NormalizeBrand(self.parse_expr()?),
            "Concat" => {
                if self.peek() == Some(b'"') {
                    let prefix = self.parse_string()?;
                    self.separator()?;
                    let inner = self.parse_expr()?;
                    self.skip_ws();
                    let postfix = if self.eat(b';') {
                        self.skip_ws();
                        Some(self.parse_string()?)
                    } else {
                        None
                    };
                    Wrapper::Concat {
                        prefix: Some(prefix),
                        inner,
                        postfix,
                    }
                } else {
                    let inner = self.parse_expr()?;
                    self.separator()?;
                    let postfix = self.parse_string()?;
                    Wrapper::Concat {
                        prefix: None,
                        inner,
                        postfix: Some(postfix),
                    }
                }
            }
            "LookUp" | "LookUpPrefix" => {
                let table = self.parse_table_name()?;
                self.separator()?;
                let inner = self.parse_expr()?;
                self.skip_ws();
                let default = if self.eat(b';') {
                    self.skip_ws();
                    Some(self.parse_string()?)
                } else {
                    None
                };
                if name == "LookUp" {
                    Wrapper::LookUp {
                        table,
                        inner,
                        default,
                    }
                } else {
                    Wrapper::LookUpPrefix {
                        table,
                        inner,
                        default,
                    }
                }
            }
            "IsInLookUpPrefix" => {
                let table = self.parse_table_name()?;
                self.separator()?;
                let inner = self.parse_expr()?;
                Wrapper::IsInLookUpPrefix { table, inner }
            }
            other => return Err(self.error(format!("unknown function `{}`", other))),
        };
        self.skip_ws();
        self.expect(b']')?;
        Ok(wrapper)
    }

    /// 参数分隔符 `;`（两侧允许空白）
    fn separator(&mut self) -> CoreResult<()> {
        self.skip_ws();
        self.expect(b';')?;
        self.skip_ws();
        Ok(())
    }
}

fn is_wrapper_name(name: &str) -> bool {
    matches!(
        name,
        "IsNull"
            | "CleanVersion"
            | "NormalizeBrand"
            | "Concat"
            | "LookUp"
            | "LookUpPrefix"
            | "IsInLookUpPrefix"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(expr: &str) -> Vec<PathStep> {
        match parse_expression(expr).unwrap() {
            MatcherExpr::Path { steps, .. } => steps,
            other => panic!("not a path: {:?}", other),
        }
    }

    #[test]
    fn test_down_ranges() {
        let steps = path("agent.(1)product.(2-3)version.(*)text.(4-)entry.(-2)url.name");
        assert_eq!(
            steps,
            vec![
                PathStep::Down {
                    range: RangeSpec::Exact(1),
                    name: "product".into()
                },
                PathStep::Down {
                    range: RangeSpec::Between(2, 3),
                    name: "version".into()
                },
                PathStep::Down {
                    range: RangeSpec::All,
                    name: "text".into()
                },
                PathStep::Down {
                    range: RangeSpec::From(4),
                    name: "entry".into()
                },
                PathStep::Down {
                    range: RangeSpec::UpTo(2),
                    name: "url".into()
                },
                PathStep::Down {
                    range: RangeSpec::All,
                    name: "name".into()
                },
            ]
        );
    }

    #[test]
    fn test_operators() {
        let steps = path(r#"agent.(1)product.(1)name="Foo"^>>@[2-]!="a"^="b"$="c"~="d"@{"S"}{"T";"x"}<"#);
        assert_eq!(
            &steps[2..],
            &[
                PathStep::Equals("Foo".into()),
                PathStep::Up,
                PathStep::Next(2),
                PathStep::BackToFull,
                PathStep::WordRange(WordRange::new(2, -1).unwrap()),
                PathStep::NotEquals("a".into()),
                PathStep::StartsWith("b".into()),
                PathStep::EndsWith("c".into()),
                PathStep::Contains("d".into()),
                PathStep::IsInSet("S".into()),
                PathStep::Lookup {
                    table: "T".into(),
                    default: Some("x".into())
                },
                PathStep::Prev(1),
            ]
        );
    }

    #[test]
    fn test_word_range_forms() {
        assert_eq!(
            path("agent[3]"),
            vec![PathStep::WordRange(WordRange::new(3, 3).unwrap())]
        );
        assert_eq!(
            path("agent[-2]"),
            vec![PathStep::WordRange(WordRange::new(1, 2).unwrap())]
        );
        assert!(parse_expression("agent[3-2]").is_err());
        assert!(parse_expression("agent[0]").is_err());
    }

    #[test]
    fn test_word_index_overflow_rejected() {
        // 2^32 + 1 截断成 i32 会变成 1
        for expression in ["agent[4294967297]", "agent[1-4294967297]", "agent[-4294967297]"] {
            assert!(matches!(
                parse_expression(expression),
                Err(CoreError::PathSyntax { .. })
            ));
        }
        assert!(parse_expression("agent[2147483647]").is_ok());
    }

    #[test]
    fn test_wrappers() {
        let expr = parse_expression(
            r#"LookUp[OSNames;CleanVersion[agent.(1)product.(1)version];"Unknown"]"#,
        )
        .unwrap();
        let MatcherExpr::Wrapped { wrapper, steps } = expr else {
            panic!("expected wrapper");
        };
        assert!(steps.is_empty());
        match *wrapper {
            Wrapper::LookUp {
                ref table,
                ref inner,
                ref default,
            } => {
                assert_eq!(table, "OSNames");
                assert_eq!(default.as_deref(), Some("Unknown"));
                assert!(matches!(inner, MatcherExpr::Wrapped { .. }));
            }
            ref other => panic!("unexpected wrapper {:?}", other),
        }

        let concat = parse_expression(r#"Concat[ "v" ; agent.(1)product.(1)version ]"#).unwrap();
        let MatcherExpr::Wrapped { wrapper, .. } = concat else {
            panic!("expected wrapper");
        };
        assert!(matches!(
            *wrapper,
            Wrapper::Concat { prefix: Some(_), postfix: None, .. }
        ));
    }

    #[test]
    fn test_fixed_value_with_escapes() {
        assert_eq!(
            parse_expression(r#""say \"hi\"""#).unwrap(),
            MatcherExpr::Fixed("say \"hi\"".into())
        );
    }

    #[test]
    fn test_syntax_errors_carry_position() {
        let err = parse_expression("agent.(1)product.(1)name=Foo").unwrap_err();
        match err {
            CoreError::PathSyntax { position, .. } => assert_eq!(position, 25),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(parse_expression("agent.(0)product").is_err());
        assert!(parse_expression("agent.(3-1)product").is_err());
        assert!(parse_expression("agent.(1)product junk").is_err());
        assert!(parse_expression("IsNull[agent").is_err());
        assert!(parse_expression("agent.(1)product.(1)name=\"open").is_err());
    }
}
