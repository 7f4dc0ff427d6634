mod builder;
mod library;

pub use builder::RuleIndexer;
pub use library::CompiledRuleLibrary;
