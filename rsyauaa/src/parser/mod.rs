//! 参考 User-Agent 语法：分词、建树、输入长度守卫
pub mod grammar;
pub mod input_guard;
pub mod lexer;

pub use grammar::parse_user_agent;
pub use input_guard::UaInputGuard;
