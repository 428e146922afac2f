//! Completion: position classification + proposal generation.
//!
//! [`CompletionEngine::complete`] is the single entry point hosts call on a
//! keystroke:
//!
//! 1. the [`TemplateMatcher`] checks whether the cursor sits on a
//!    placeholder of an inserted template;
//! 2. otherwise the [`ContextAnalyzer`] classifies the cursor and the
//!    [`Suggester`] dispatches to the generator for that position;
//! 3. proposals are filtered by the word being typed and capped.

pub mod generators;
pub mod placeholders;
pub mod proposal;

use std::sync::Arc;

use tracing::debug;

pub use generators::Suggester;
pub use placeholders::{PlaceholderMatch, TemplateMatcher};
pub use proposal::{CompletionProposal, InsertFormat, ProposalCategory};

use crate::analysis::text::{clamp_offset, is_ident_char, word_before};
use crate::analysis::{CharRange, ContextAnalyzer, GrammarPosition, PositionKind};
use crate::grammar::GrammarModel;

/// Default cap on the number of proposals returned.
pub const DEFAULT_MAX_PROPOSALS: usize = 200;

/// Classifies, dispatches, filters and caps.
#[derive(Debug, Clone)]
pub struct CompletionEngine {
    analyzer: ContextAnalyzer,
    suggester: Suggester,
    templates: TemplateMatcher,
    max_proposals: usize,
}

impl CompletionEngine {
    pub fn new(grammar: Arc<GrammarModel>) -> Self {
        Self {
            analyzer: ContextAnalyzer::new(grammar.clone()),
            suggester: Suggester::new(grammar.clone()),
            templates: TemplateMatcher::new(grammar),
            max_proposals: DEFAULT_MAX_PROPOSALS,
        }
    }

    pub fn with_max_proposals(mut self, max_proposals: usize) -> Self {
        debug_assert!(max_proposals > 0, "max_proposals must be positive");
        self.max_proposals = max_proposals;
        self
    }

    pub fn analyzer(&self) -> &ContextAnalyzer {
        &self.analyzer
    }

    pub fn suggester(&self) -> &Suggester {
        &self.suggester
    }

    pub fn templates(&self) -> &TemplateMatcher {
        &self.templates
    }

    /// Proposals for the cursor position in `text`. Never fails; an
    /// unrecognised position yields an empty list.
    pub fn complete(&self, text: &str, cursor: usize) -> Vec<CompletionProposal> {
        let cursor = clamp_offset(text, cursor);

        if let Some(mut proposals) = self.templates.complete(text, cursor) {
            proposals.truncate(self.max_proposals);
            return proposals;
        }

        let position = self.analyzer.classify(text, cursor);
        let (range, typed) = replace_range(&position, text, cursor);
        let mut proposals = self.suggester.suggest(&position, range);

        if !typed.is_empty() {
            let needle = typed.to_lowercase();
            proposals.retain(|p| p.label.to_lowercase().contains(&needle));
        }

        // `sum|` -> `sum by (...)`, not `sumby (...)`.
        if range.is_empty() && text[..cursor].ends_with(is_ident_char) {
            for proposal in &mut proposals {
                proposal.insert_text.insert(0, ' ');
            }
        }

        proposals.truncate(self.max_proposals);
        debug!(
            cursor,
            %position,
            typed,
            count = proposals.len(),
            "completed"
        );
        proposals
    }
}

/// The range a proposal replaces and the text used to filter proposals.
fn replace_range<'a>(
    position: &GrammarPosition,
    text: &'a str,
    cursor: usize,
) -> (CharRange, &'a str) {
    match position.kind() {
        PositionKind::GroupingLabel | PositionKind::Label | PositionKind::FunctionOrMetric => {
            word_before(text, cursor)
        }
        // Everything after `[` is replaced; durations are not filtered.
        PositionKind::TimeRange => {
            let start = text[..cursor].rfind('[').map(|i| i + 1).unwrap_or(cursor);
            (CharRange::new(start, cursor), "")
        }
        PositionKind::Comparator
        | PositionKind::GroupingAndBinary
        | PositionKind::GroupingOperator
        | PositionKind::BinaryOperator
        | PositionKind::Any => (CharRange::at(cursor), ""),
    }
}
