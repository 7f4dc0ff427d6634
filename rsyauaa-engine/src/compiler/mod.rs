//! 路径表达式：解析 → 语法树 → 索引键 + 步骤链
pub mod ast;
mod compile;
mod parser;

pub use compile::{prefix_key, value_key, CompiledPath, HashEntry, KeySelector, PathCompiler};
pub use parser::parse_expression;
