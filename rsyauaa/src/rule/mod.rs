pub mod loader;

#[cfg(feature = "embedded-rules")]
pub use loader::EMBEDDED_RULES;
pub use loader::RuleLoader;
