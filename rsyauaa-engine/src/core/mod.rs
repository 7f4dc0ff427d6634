pub mod definition;
pub mod limits;
pub mod range;
pub mod sink;
pub mod tree;

pub use definition::{
    ExtractDefinition, LookupDefinition, MatcherDefinition, RuleLibrary, RuleSource,
    SetDefinition,
};
pub use limits::*;
pub use range::{NumberRange, WordRange};
pub use sink::ResultSink;
pub use tree::{
    CounterKind, NodeId, NodeKind, PathChild, PathChildren, PathCounters, SemanticChild,
    SemanticChildren, SyntaxNode, SyntaxTree, TreeBuilder,
};
