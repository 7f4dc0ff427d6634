//! 运行期步骤链：从被通知的节点出发做遍历、过滤与变换
mod chain;
pub mod normalize;
mod step;

pub use chain::{StepChain, WalkResult};
pub use normalize::{clean_version, normalize_brand};
pub use step::{Step, StepKind};
