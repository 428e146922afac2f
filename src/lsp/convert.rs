//! Conversions between engine types and LSP types.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionTextEdit, Diagnostic, DiagnosticSeverity,
    Documentation, InsertTextFormat, MarkupContent, MarkupKind, NumberOrString, Position, Range,
    TextEdit,
};

use crate::analysis::text::{offset_to_position, position_to_offset};
use crate::analysis::CharRange;
use crate::completion::{CompletionProposal, InsertFormat, ProposalCategory};
use crate::diagnostics::{DiagnosticSink, Marker, Severity};

/// Byte offset of an LSP position.
pub fn offset_of(text: &str, position: Position) -> usize {
    position_to_offset(text, position.line, position.character)
}

pub fn position_of(text: &str, offset: usize) -> Position {
    let (line, character) = offset_to_position(text, offset);
    Position::new(line, character)
}

pub fn range_of(text: &str, range: CharRange) -> Range {
    Range::new(position_of(text, range.start), position_of(text, range.end))
}

/// A 1-based marker as a 0-based LSP diagnostic.
pub fn to_diagnostic(marker: Marker) -> Diagnostic {
    Diagnostic {
        range: Range::new(
            Position::new(
                marker.start_line.saturating_sub(1),
                marker.start_column.saturating_sub(1),
            ),
            Position::new(
                marker.end_line.saturating_sub(1),
                marker.end_column.saturating_sub(1),
            ),
        ),
        severity: Some(match marker.severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
        }),
        code: Some(NumberOrString::String(marker.code.to_string())),
        source: Some(marker.source),
        message: marker.message,
        ..Default::default()
    }
}

fn kind_of(category: ProposalCategory) -> CompletionItemKind {
    match category {
        ProposalCategory::Template => CompletionItemKind::SNIPPET,
        ProposalCategory::Aggregation | ProposalCategory::Function => CompletionItemKind::FUNCTION,
        ProposalCategory::Grouping | ProposalCategory::Modifier => CompletionItemKind::KEYWORD,
        ProposalCategory::BinaryOperator | ProposalCategory::Matcher => {
            CompletionItemKind::OPERATOR
        }
        ProposalCategory::Metric => CompletionItemKind::VARIABLE,
        ProposalCategory::Label => CompletionItemKind::FIELD,
        ProposalCategory::Duration | ProposalCategory::Value => CompletionItemKind::VALUE,
    }
}

/// Convert a proposal. `index` is its position in the ranked list; the
/// sort text preserves that order in the client.
pub fn to_completion_item(text: &str, index: usize, proposal: CompletionProposal) -> CompletionItem {
    let insert_text_format = match proposal.insert_format {
        InsertFormat::Plain => InsertTextFormat::PLAIN_TEXT,
        InsertFormat::Snippet => InsertTextFormat::SNIPPET,
    };

    CompletionItem {
        kind: Some(kind_of(proposal.category)),
        detail: proposal.detail,
        documentation: proposal.documentation.map(|value| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            })
        }),
        sort_text: Some(format!("{}{:05}", proposal.category.sort_rank(), index)),
        filter_text: Some(proposal.label.clone()),
        insert_text_format: Some(insert_text_format),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: range_of(text, proposal.range),
            new_text: proposal.insert_text,
        })),
        label: proposal.label,
        ..Default::default()
    }
}

/// Collects projected markers as LSP diagnostics.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for CollectingSink {
    fn set_diagnostics(&mut self, markers: Vec<Marker>) {
        self.diagnostics = markers.into_iter().map(to_diagnostic).collect();
    }

    fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }
}
