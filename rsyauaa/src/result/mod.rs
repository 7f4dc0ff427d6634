pub mod derived;
pub mod user_agent;

pub use derived::calculate_derived_fields;
pub use user_agent::{AgentField, MatchedKey, UserAgent, UNKNOWN_VALUE, UNSET_CONFIDENCE};
