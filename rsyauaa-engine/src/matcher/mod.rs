//! 规则运行期：动作、命中记录、单次解析状态与字段合并
mod action;
mod matches;
mod outcome;
mod session;

pub use action::{ActionRole, CompiledAction, CompiledMatcher, FixedExtract};
pub use matches::{MatchEntry, MatchesList};
pub use outcome::{AnalyzeOptions, AnalyzeReport, ConfidenceCollision};
pub(crate) use session::AnalyzeSession;
