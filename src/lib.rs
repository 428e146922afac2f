//! # promsense
//!
//! Context-aware completion and validation for PromQL query authoring.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                Grammar Model (shared, read-only)         │
//! │  (metrics, labels, operators, functions, templates)      │
//! └─────────────────────────────────────────────────────────┘
//!           │                                   │
//!           ▼ [analysis]                        ▼ [validation]
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │  Context Analyzer         │   │  Validator Pipeline       │
//! │  text + cursor → position │   │  query → findings         │
//! └───────────────────────────┘   └───────────────────────────┘
//!           │                                   │
//!           ▼ [completion]                      ▼ [diagnostics]
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │  Suggestion Dispatcher    │   │  Diagnostics Projector    │
//! │  + Template Matcher       │   │  findings → markers       │
//! └───────────────────────────┘   └───────────────────────────┘
//!                          │
//!                          ▼ [session / lsp]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Editor session: debounce, run action, history       │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod completion;
pub mod config;
pub mod diagnostics;
pub mod grammar;
pub mod lsp;
pub mod session;
pub mod validation;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::analysis::{
        CharRange, ContextAnalyzer, ExpressionScope, GrammarPosition, PositionKind,
    };
    pub use crate::completion::{
        CompletionEngine, CompletionProposal, InsertFormat, ProposalCategory, Suggester,
        TemplateMatcher,
    };
    pub use crate::diagnostics::{DiagnosticSink, DiagnosticsProjector, Marker, Severity};
    pub use crate::grammar::{GrammarModel, ParamKind, Template};
    pub use crate::session::{
        DebounceTimer, EditorSurface, InMemoryHistory, QueryExecutor, QueryHistory,
        QuerySession, RunError, SessionOptions,
    };
    pub use crate::validation::{RuleId, ValidationFinding, Validator};
}

pub use grammar::GrammarModel;
pub use validation::Validator;
