pub mod json;

pub use json::JsonRuleParser;
