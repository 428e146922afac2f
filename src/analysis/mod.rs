//! Text analysis - cursor context detection and offset helpers

pub mod context;
pub mod text;

pub use context::{ContextAnalyzer, ExpressionScope, GrammarPosition, PositionKind};
pub use text::CharRange;
