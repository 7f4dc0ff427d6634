//! 表达式编译：静态前缀折叠为索引键，其余部分编译为运行期步骤链
//!
//! 从根开始，只要遇到的都是 Down / 词区间，就把它们直接展开进路径字符串；
//! `="x"` 与短前缀 `^="x"` 会变成带值的索引键；
//! 之后的一切都进入步骤链（一旦进入动态部分就不会再回到静态部分）
use std::fmt::{self, Display, Formatter};

use super::ast::{MatcherExpr, PathStep, RangeSpec, Wrapper};
use super::parser::parse_expression;
use crate::core::limits::PREFIX_HASH_LIMIT;
use crate::core::range::{NumberRange, WordRange};
use crate::error::{CoreError, CoreResult};
use crate::lookup::LookupRegistry;
use crate::walk::{StepChain, StepKind};

/// 索引键在路径之外附带的选择条件
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySelector {
    Path,
    /// `path="value"`
    Value(String),
    /// `path{"abc`
    Prefix(String),
}

/// 一个索引键（保留书写时的大小写，注册时统一小写）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashEntry {
    pub path: String,
    pub selector: KeySelector,
}

impl HashEntry {
    pub fn inform_key(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl Display for HashEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.selector {
            KeySelector::Path => f.write_str(&self.path),
            KeySelector::Value(value) => write!(f, "{}=\"{}\"", self.path, value),
            KeySelector::Prefix(prefix) => write!(f, "{}{{\"{}\"", self.path, prefix),
        }
    }
}

/// 运行期「路径 + 值」的索引键，与 `KeySelector::Value` 的注册形式一致
#[inline]
pub fn value_key(path: &str, value: &str) -> String {
    format!("{}=\"{}\"", path, value).to_lowercase()
}

/// 运行期「路径 + 前缀」的索引键
#[inline]
pub fn prefix_key(path: &str, prefix: &str) -> String {
    format!("{}{{\"{}\"", path, prefix).to_lowercase()
}

/// 编译结果
#[derive(Debug, Clone)]
pub struct CompiledPath {
    expression: String,
    entries: Vec<HashEntry>,
    ranges: Vec<(String, WordRange)>,
    chain: StepChain,
    uses_is_null: bool,
    fixed_value: Option<String>,
}

impl CompiledPath {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn entries(&self) -> &[HashEntry] {
        &self.entries
    }

    /// 索引键的可读形式
    pub fn hash_entries(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    /// 需要扁平化额外通知的（路径，词区间）
    pub fn ranges(&self) -> &[(String, WordRange)] {
        &self.ranges
    }

    pub fn chain(&self) -> &StepChain {
        &self.chain
    }

    /// 步骤链的可读形式
    pub fn walk_list(&self) -> Vec<String> {
        self.chain.render()
    }

    pub fn uses_is_null(&self) -> bool {
        self.uses_is_null
    }

    pub fn fixed_value(&self) -> Option<&str> {
        self.fixed_value.as_deref()
    }
}

#[derive(Default)]
struct CompileState {
    paths: Vec<String>,
    selector: Option<KeySelector>,
    dynamic: bool,
    steps: Vec<StepKind>,
    ranges: Vec<(String, WordRange)>,
    uses_is_null: bool,
}

impl CompileState {
    fn push(&mut self, step: StepKind) {
        self.dynamic = true;
        self.steps.push(step);
    }
}

/// 表达式编译器，查找表/集合引用在编译期解析
pub struct PathCompiler<'r> {
    lookups: &'r LookupRegistry,
}

impl<'r> PathCompiler<'r> {
    pub fn new(lookups: &'r LookupRegistry) -> Self {
        Self { lookups }
    }

    /// require 表达式：只关心能否走通，尾部不会失败的步骤被裁掉
    pub fn compile_require(&self, expression: &str) -> CoreResult<CompiledPath> {
        let mut compiled = self.compile(expression)?;
        if compiled.fixed_value.is_some() {
            return Err(CoreError::InvalidInput(format!(
                "fixed value `{}` cannot be used as a requirement",
                expression
            )));
        }
        compiled.chain.prune_trailing_steps_that_cannot_fail();
        Ok(compiled)
    }

    /// extract 表达式：步骤链原样保留，最终值就是提取结果
    pub fn compile_extract(&self, expression: &str) -> CoreResult<CompiledPath> {
        let compiled = self.compile(expression)?;
        if compiled.uses_is_null {
            return Err(CoreError::InvalidInput(format!(
                "IsNull is only meaningful in a requirement: `{}`",
                expression
            )));
        }
        Ok(compiled)
    }

    fn compile(&self, expression: &str) -> CoreResult<CompiledPath> {
        let expr = parse_expression(expression)?;
        if let MatcherExpr::Fixed(value) = &expr {
            return Ok(CompiledPath {
                expression: expression.to_string(),
                entries: Vec::new(),
                ranges: Vec::new(),
                chain: StepChain::default(),
                uses_is_null: false,
                fixed_value: Some(value.clone()),
            });
        }

        let mut state = CompileState::default();
        self.visit_expr(&expr, &mut state, true)?;

        let selector = state.selector.unwrap_or(KeySelector::Path);
        let entries = state
            .paths
            .into_iter()
            .map(|path| HashEntry {
                path,
                selector: selector.clone(),
            })
            .collect();

        Ok(CompiledPath {
            expression: expression.to_string(),
            entries,
            ranges: state.ranges,
            chain: StepChain::from_kinds(state.steps),
            uses_is_null: state.uses_is_null,
            fixed_value: None,
        })
    }

    fn visit_expr(
        &self,
        expr: &MatcherExpr,
        state: &mut CompileState,
        outermost: bool,
    ) -> CoreResult<()> {
        match expr {
            MatcherExpr::Path { root, steps } => {
                state.paths = vec![root.clone()];
                for step in steps {
                    self.visit_step(step, state)?;
                }
            }
            MatcherExpr::Wrapped { wrapper, steps } => {
                self.visit_wrapper(wrapper, state, outermost)?;
                for step in steps {
                    self.visit_step(step, state)?;
                }
            }
            MatcherExpr::Fixed(value) => {
                return Err(CoreError::InvalidInput(format!(
                    "fixed value \"{}\" cannot be used inside a function",
                    value
                )));
            }
        }
        Ok(())
    }

    fn visit_wrapper(
        &self,
        wrapper: &Wrapper,
        state: &mut CompileState,
        outermost: bool,
    ) -> CoreResult<()> {
        if let Wrapper::IsNull(inner) = wrapper {
            if !outermost {
                return Err(CoreError::InvalidInput(
                    "IsNull must be the outermost function".to_string(),
                ));
            }
            // 标记步骤放在链首
            state.uses_is_null = true;
            state.steps.push(StepKind::IsNull);
            return self.visit_expr(inner, state, false);
        }

        self.visit_expr(wrapper.inner(), state, false)?;
        let step = self.wrapper_step(wrapper)?;
        state.push(step);
        Ok(())
    }

    fn wrapper_step(&self, wrapper: &Wrapper) -> CoreResult<StepKind> {
        let step = match wrapper {
            Wrapper::IsNull(_) => {
                return Err(CoreError::InvariantViolation(
                    "IsNull has no transform step".to_string(),
                ))
            }
            Wrapper::CleanVersion(_) => StepKind::CleanVersion,
            Wrapper::NormalizeBrand(_) => StepKind::NormalizeBrand,
            Wrapper::Concat {
                prefix, postfix, ..
            } => match (prefix, postfix) {
                (Some(prefix), Some(postfix)) => StepKind::Concat {
                    prefix: prefix.clone(),
                    postfix: postfix.clone(),
                },
                (Some(prefix), None) => StepKind::ConcatPrefix(prefix.clone()),
                (None, Some(postfix)) => StepKind::ConcatPostfix(postfix.clone()),
                (None, None) => {
                    return Err(CoreError::InvalidInput(
                        "Concat needs a prefix or a postfix".to_string(),
                    ))
                }
            },
            Wrapper::LookUp { table, default, .. } => StepKind::Lookup {
                table: self.lookups.table(table)?,
                default: default.clone(),
            },
            Wrapper::LookUpPrefix { table, default, .. } => StepKind::LookupPrefix {
                table: self.lookups.table(table)?,
                default: default.clone(),
            },
            Wrapper::IsInLookUpPrefix { table, .. } => {
                StepKind::IsInLookupPrefix(self.lookups.table(table)?)
            }
        };
        Ok(step)
    }

    fn visit_step(&self, step: &PathStep, state: &mut CompileState) -> CoreResult<()> {
        if state.dynamic {
            let kind = self.dynamic_step(step)?;
            state.push(kind);
            return Ok(());
        }

        match step {
            PathStep::Down { range, name } => {
                let range = resolve_range(*range, name)?;
                state.paths = state
                    .paths
                    .iter()
                    .flat_map(|path| range.iter().map(move |i| format!("{}.({}){}", path, i, name)))
                    .collect();
            }
            PathStep::WordRange(range) => {
                for path in state.paths.iter_mut() {
                    state.ranges.push((path.clone(), *range));
                    path.push_str(&range.to_string());
                }
            }
            PathStep::Equals(value) => {
                state.selector = Some(KeySelector::Value(value.clone()));
                state.dynamic = true;
            }
            PathStep::StartsWith(value) if value.is_empty() => {}
            PathStep::StartsWith(value) => {
                let head: String = value.chars().take(PREFIX_HASH_LIMIT).collect();
                state.selector = Some(KeySelector::Prefix(head));
                state.dynamic = true;
                // 超出前缀索引长度的部分仍需运行期校验
                if value.chars().count() > PREFIX_HASH_LIMIT {
                    state.steps.push(StepKind::StartsWith(value.clone()));
                }
            }
            other => {
                let kind = self.dynamic_step(other)?;
                state.push(kind);
            }
        }
        Ok(())
    }

    fn dynamic_step(&self, step: &PathStep) -> CoreResult<StepKind> {
        let kind = match step {
            PathStep::Down { range, name } => StepKind::Down {
                range: resolve_range(*range, name)?,
                name: name.clone(),
            },
            PathStep::Up => StepKind::Up,
            PathStep::Next(n) => StepKind::Next(*n),
            PathStep::Prev(n) => StepKind::Prev(*n),
            PathStep::BackToFull => StepKind::BackToFull,
            PathStep::WordRange(range) => StepKind::WordRange(*range),
            PathStep::Equals(v) => StepKind::Equals(v.clone()),
            PathStep::NotEquals(v) => StepKind::NotEquals(v.clone()),
            PathStep::StartsWith(v) => StepKind::StartsWith(v.clone()),
            PathStep::EndsWith(v) => StepKind::EndsWith(v.clone()),
            PathStep::Contains(v) => StepKind::contains(v.clone()),
            PathStep::IsInSet(name) => StepKind::IsInSet(self.lookups.set(name)?),
            PathStep::Lookup { table, default } => StepKind::Lookup {
                table: self.lookups.table(table)?,
                default: default.clone(),
            },
        };
        Ok(kind)
    }
}

/// 解析子节点序号范围，补齐后为空的范围永远无法命中，按配置错误处理
fn resolve_range(range: RangeSpec, name: &str) -> CoreResult<NumberRange> {
    let resolved = range.resolve(name);
    if resolved.is_empty() {
        return Err(CoreError::InvalidInput(format!(
            "child range {:?} of `{}` is empty (maximum index is {})",
            range, name, resolved.end
        )));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::definition::{LookupDefinition, RuleLibrary};

    fn registry() -> LookupRegistry {
        let library = RuleLibrary {
            lookups: vec![LookupDefinition {
                name: "OSNames".into(),
                map: vec![("Android".into(), "Android OS".into())],
                default: None,
            }],
            ..Default::default()
        };
        LookupRegistry::from_library(&library).unwrap()
    }

    #[test]
    fn test_plain_path_has_no_steps() {
        let lookups = registry();
        let compiled = PathCompiler::new(&lookups)
            .compile_extract("agent.(1)product.(1)name")
            .unwrap();
        assert_eq!(compiled.hash_entries(), vec!["agent.(1)product.(1)name"]);
        assert!(compiled.walk_list().is_empty());
    }

    #[test]
    fn test_equals_becomes_key_then_dynamic() {
        let lookups = registry();
        let compiled = PathCompiler::new(&lookups)
            .compile_extract(r#"agent.(1)product.(1)name="Foo"^.(1-3)version"#)
            .unwrap();
        assert_eq!(
            compiled.hash_entries(),
            vec![r#"agent.(1)product.(1)name="Foo""#]
        );
        assert_eq!(compiled.walk_list(), vec!["Up()", "Down([1:3]version)"]);
        assert_eq!(
            compiled.entries()[0].inform_key(),
            r#"agent.(1)product.(1)name="foo""#
        );
    }

    #[test]
    fn test_empty_open_ranges_rejected() {
        let lookups = registry();
        let compiler = PathCompiler::new(&lookups);
        for expression in [
            "agent.(12-)product",
            "agent.(1)product.(2-)name",
            "IsNull[agent.(12-)product]",
            r#"agent.(1)product.(1)name="Foo"^.(6-)version"#,
        ] {
            assert!(
                matches!(compiler.compile_require(expression), Err(CoreError::InvalidInput(_))),
                "{} should be rejected",
                expression
            );
        }
        assert!(compiler.compile_require("agent.(10-)product").is_ok());
    }

    #[test]
    fn test_static_ranges_expand() {
        let lookups = registry();
        let compiled = PathCompiler::new(&lookups)
            .compile_extract("agent.(1-2)product.(1)name")
            .unwrap();
        assert_eq!(
            compiled.hash_entries(),
            vec!["agent.(1)product.(1)name", "agent.(2)product.(1)name"]
        );
    }

    #[test]
    fn test_word_range_registered() {
        let lookups = registry();
        let compiled = PathCompiler::new(&lookups)
            .compile_extract("agent.(1)product.(1)name[2-]")
            .unwrap();
        assert_eq!(compiled.hash_entries(), vec!["agent.(1)product.(1)name[2-]"]);
        assert_eq!(
            compiled.ranges(),
            &[(
                "agent.(1)product.(1)name".to_string(),
                WordRange::new(2, -1).unwrap()
            )]
        );
    }

    #[test]
    fn test_prefix_keys() {
        let lookups = registry();
        let compiler = PathCompiler::new(&lookups);
        let short = compiler
            .compile_extract(r#"agent.(1)product.(1)name^="Mo""#)
            .unwrap();
        assert_eq!(short.hash_entries(), vec![r#"agent.(1)product.(1)name{"Mo""#]);
        assert!(short.walk_list().is_empty());

        let long = compiler
            .compile_extract(r#"agent.(1)product.(1)name^="Mozilla""#)
            .unwrap();
        assert_eq!(long.hash_entries(), vec![r#"agent.(1)product.(1)name{"Moz""#]);
        assert_eq!(long.walk_list(), vec!["StartsWith(Mozilla)"]);
    }

    #[test]
    fn test_is_null_first_and_require_pruning() {
        let lookups = registry();
        let compiler = PathCompiler::new(&lookups);
        let require = compiler
            .compile_require("IsNull[agent.(1)product.(1)comments.(1)entry^]")
            .unwrap();
        assert!(require.uses_is_null());
        assert_eq!(require.walk_list(), vec!["IsNull()", "Up()"]);

        let pruned = compiler
            .compile_require("CleanVersion[agent.(1)product.(1)version]")
            .unwrap();
        assert!(pruned.walk_list().is_empty());

        let kept = compiler
            .compile_extract("CleanVersion[agent.(1)product.(1)version]")
            .unwrap();
        assert_eq!(kept.walk_list(), vec!["CleanVersion()"]);

        assert!(compiler
            .compile_extract("IsNull[agent.(1)product]")
            .is_err());
        assert!(compiler
            .compile_require("CleanVersion[IsNull[agent.(1)product]]")
            .is_err());
    }

    #[test]
    fn test_lookups_resolved_at_compile_time() {
        let lookups = registry();
        let compiler = PathCompiler::new(&lookups);
        let compiled = compiler
            .compile_extract("LookUp[OSNames;agent.(1)product.(1)comments.(1)entry[1]]")
            .unwrap();
        assert_eq!(compiled.walk_list(), vec!["Lookup(@OSNames ; default=null)"]);
        assert!(matches!(
            compiler.compile_extract("LookUp[Missing;agent.(1)product]"),
            Err(CoreError::UnknownLookup(_))
        ));
        assert!(matches!(
            compiler.compile_extract(r#"agent.(1)product.(1)name@{"Nope"}"#),
            Err(CoreError::UnknownLookupSet(_))
        ));
    }

    #[test]
    fn test_fixed_values() {
        let lookups = registry();
        let compiler = PathCompiler::new(&lookups);
        let fixed = compiler.compile_extract(r#""Phone""#).unwrap();
        assert_eq!(fixed.fixed_value(), Some("Phone"));
        assert!(fixed.entries().is_empty());
        assert!(compiler.compile_require(r#""Phone""#).is_err());
    }

    #[test]
    fn test_runtime_keys_match_registered_keys() {
        let entry = HashEntry {
            path: "agent.(1)product.(1)name".into(),
            selector: KeySelector::Value("Chrome".into()),
        };
        assert_eq!(
            entry.inform_key(),
            value_key("agent.(1)product.(1)name", "chrome")
        );
        let prefix = HashEntry {
            path: "agent.(1)product.(1)name".into(),
            selector: KeySelector::Prefix("Moz".into()),
        };
        assert_eq!(
            prefix.inform_key(),
            prefix_key("agent.(1)product.(1)name", "MOZ")
        );
    }
}
