pub mod analyzer;

pub use analyzer::{AnalyzerConfig, CustomConfigBuilder, RuleOrigin};
