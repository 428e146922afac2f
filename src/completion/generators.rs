//! Per-position proposal generators.
//!
//! One generator per [`PositionKind`]. Each generator reads only the grammar
//! and the position's refinement payload and returns proposals that are
//! valid at that position.

use std::sync::Arc;

use tracing::debug;

use super::proposal::{rank, CompletionProposal, ProposalCategory};
use crate::analysis::{CharRange, ExpressionScope, GrammarPosition, PositionKind};
use crate::grammar::{FunctionKind, GrammarModel};

type Generator = fn(&GrammarModel, &GrammarPosition, CharRange) -> Vec<CompletionProposal>;

/// Exhaustive: adding a position kind fails to compile until it has a generator.
fn generator_for(kind: PositionKind) -> Generator {
    match kind {
        PositionKind::GroupingLabel => grouping_labels,
        PositionKind::TimeRange => time_ranges,
        PositionKind::Comparator => comparators,
        PositionKind::Label => labels,
        PositionKind::GroupingAndBinary => grouping_and_binary,
        PositionKind::GroupingOperator => grouping_operators,
        PositionKind::BinaryOperator => binary_operators,
        PositionKind::FunctionOrMetric => functions_and_metrics,
        PositionKind::Any => nothing,
    }
}

/// Maps a grammar position to ranked completion proposals.
#[derive(Debug, Clone)]
pub struct Suggester {
    grammar: Arc<GrammarModel>,
}

impl Suggester {
    pub fn new(grammar: Arc<GrammarModel>) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &Arc<GrammarModel> {
        &self.grammar
    }

    /// Proposals for `position`, each replacing `range`.
    ///
    /// Deterministic: equal inputs give equal, identically ordered output.
    pub fn suggest(&self, position: &GrammarPosition, range: CharRange) -> Vec<CompletionProposal> {
        let generate = generator_for(position.kind());
        let mut proposals = generate(&self.grammar, position, range);
        rank(&mut proposals);
        debug!(%position, count = proposals.len(), "generated proposals");
        proposals
    }
}

fn grouping_labels(
    grammar: &GrammarModel,
    _position: &GrammarPosition,
    range: CharRange,
) -> Vec<CompletionProposal> {
    label_proposals(grammar.all_labels(), range)
}

fn time_ranges(
    grammar: &GrammarModel,
    _position: &GrammarPosition,
    range: CharRange,
) -> Vec<CompletionProposal> {
    duration_proposals(grammar, range)
}

fn comparators(
    grammar: &GrammarModel,
    _position: &GrammarPosition,
    range: CharRange,
) -> Vec<CompletionProposal> {
    grammar
        .operators()
        .label_matchers
        .iter()
        .map(|op| {
            CompletionProposal::plain(op.token, ProposalCategory::Matcher, range)
                .with_detail("label matcher")
                .with_documentation(op.description)
        })
        .collect()
}

fn labels(
    grammar: &GrammarModel,
    position: &GrammarPosition,
    range: CharRange,
) -> Vec<CompletionProposal> {
    let constrained = match position {
        GrammarPosition::Label {
            metric: Some(metric),
        } => grammar.labels_for(metric),
        _ => None,
    };

    match constrained {
        Some(labels) => label_proposals(labels.iter().map(String::as_str), range),
        None => label_proposals(grammar.all_labels(), range),
    }
}

fn grouping_and_binary(
    grammar: &GrammarModel,
    position: &GrammarPosition,
    range: CharRange,
) -> Vec<CompletionProposal> {
    let mut proposals = grouping_operators(grammar, position, range);
    proposals.extend(binary_operator_proposals(grammar, range));
    proposals
}

fn grouping_operators(
    grammar: &GrammarModel,
    _position: &GrammarPosition,
    range: CharRange,
) -> Vec<CompletionProposal> {
    grammar
        .operators()
        .grouping
        .iter()
        .map(|op| {
            CompletionProposal::plain(op.token, ProposalCategory::Grouping, range)
                .with_snippet(format!("{} (${{1:label}})", op.token))
                .with_detail("grouping")
                .with_documentation(op.description)
        })
        .collect()
}

fn binary_operators(
    grammar: &GrammarModel,
    _position: &GrammarPosition,
    range: CharRange,
) -> Vec<CompletionProposal> {
    let mut proposals = binary_operator_proposals(grammar, range);
    proposals.extend(grammar.operators().modifiers.iter().map(|op| {
        CompletionProposal::plain(op.token, ProposalCategory::Modifier, range)
            .with_detail("modifier")
            .with_documentation(op.description)
    }));
    proposals
}

fn functions_and_metrics(
    grammar: &GrammarModel,
    position: &GrammarPosition,
    range: CharRange,
) -> Vec<CompletionProposal> {
    let mut proposals = Vec::new();

    // Templates are whole queries; they only make sense at the top level.
    if matches!(
        position,
        GrammarPosition::FunctionOrMetric {
            scope: ExpressionScope::Start
        }
    ) {
        proposals.extend(grammar.templates().map(|template| {
            CompletionProposal::plain(template.name, ProposalCategory::Template, range)
                .with_snippet(template.snippet())
                .with_detail(template.description)
                .with_documentation(format!("```promql\n{}\n```", template.render_defaults()))
        }));
    }

    proposals.extend(grammar.operators().aggregation.iter().map(|op| {
        CompletionProposal::plain(op.token, ProposalCategory::Aggregation, range)
            .with_snippet(format!("{}(${{1:expr}})", op.token))
            .with_detail("aggregation")
            .with_documentation(op.description)
    }));

    proposals.extend(grammar.functions().iter().map(|f| {
        let detail = match f.kind {
            FunctionKind::RangeVector => "range-vector function",
            FunctionKind::Utility => "function",
        };
        CompletionProposal::plain(f.name, ProposalCategory::Function, range)
            .with_snippet(f.snippet)
            .with_detail(detail)
            .with_documentation(f.description)
    }));

    proposals.extend(metric_proposals(grammar.metrics(), range));
    proposals
}

fn nothing(
    _grammar: &GrammarModel,
    _position: &GrammarPosition,
    _range: CharRange,
) -> Vec<CompletionProposal> {
    Vec::new()
}

fn binary_operator_proposals(grammar: &GrammarModel, range: CharRange) -> Vec<CompletionProposal> {
    grammar
        .operators()
        .binary
        .iter()
        .map(|op| {
            let detail = if op.category.vector_only() {
                format!("{} operator (vectors only)", op.category.as_str())
            } else {
                format!("{} operator", op.category.as_str())
            };
            CompletionProposal::plain(op.token, ProposalCategory::BinaryOperator, range)
                .with_detail(detail)
                .with_documentation(op.description)
        })
        .collect()
}

pub(crate) fn label_proposals<'a>(
    labels: impl IntoIterator<Item = &'a str>,
    range: CharRange,
) -> Vec<CompletionProposal> {
    labels
        .into_iter()
        .map(|label| {
            CompletionProposal::plain(label, ProposalCategory::Label, range).with_detail("label")
        })
        .collect()
}

pub(crate) fn metric_proposals<'a>(
    metrics: impl IntoIterator<Item = &'a str>,
    range: CharRange,
) -> Vec<CompletionProposal> {
    metrics
        .into_iter()
        .map(|metric| {
            CompletionProposal::plain(metric, ProposalCategory::Metric, range).with_detail("metric")
        })
        .collect()
}

pub(crate) fn duration_proposals(grammar: &GrammarModel, range: CharRange) -> Vec<CompletionProposal> {
    grammar
        .range_presets()
        .iter()
        .map(|preset| {
            let proposal = CompletionProposal::plain(*preset, ProposalCategory::Duration, range);
            match describe_duration(grammar, preset) {
                Some(description) => proposal.with_detail(description),
                None => proposal,
            }
        })
        .collect()
}

/// `"5m"` -> `"5 minutes"`, `"1h"` -> `"1 hour"`.
pub(crate) fn describe_duration(grammar: &GrammarModel, literal: &str) -> Option<String> {
    let split = literal.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = literal.split_at(split);
    if amount.is_empty() {
        return None;
    }
    let description = grammar.unit_description(unit)?;
    if amount == "1" {
        let singular = description.strip_suffix('s').unwrap_or(description);
        Some(format!("1 {}", singular))
    } else {
        Some(format!("{} {}", amount, description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggester() -> Suggester {
        Suggester::new(Arc::new(GrammarModel::builtin()))
    }

    fn labels_of(proposals: &[CompletionProposal]) -> Vec<&str> {
        proposals.iter().map(|p| p.label.as_str()).collect()
    }

    #[test]
    fn test_every_kind_has_a_generator() {
        let grammar = GrammarModel::builtin();
        for kind in PositionKind::ALL {
            // Must not panic for any kind.
            let _ = generator_for(kind)(&grammar, &GrammarPosition::Any, CharRange::at(0));
        }
    }

    #[test]
    fn test_any_is_empty() {
        assert!(suggester()
            .suggest(&GrammarPosition::Any, CharRange::at(0))
            .is_empty());
    }

    #[test]
    fn test_describe_duration() {
        let grammar = GrammarModel::builtin();
        assert_eq!(describe_duration(&grammar, "5m").as_deref(), Some("5 minutes"));
        assert_eq!(describe_duration(&grammar, "1h").as_deref(), Some("1 hour"));
        assert_eq!(describe_duration(&grammar, "7d").as_deref(), Some("7 days"));
        assert_eq!(describe_duration(&grammar, "5x"), None);
        assert_eq!(describe_duration(&grammar, "m"), None);
    }

    #[test]
    fn test_templates_only_at_start() {
        let start = suggester().suggest(
            &GrammarPosition::FunctionOrMetric {
                scope: ExpressionScope::Start,
            },
            CharRange::at(0),
        );
        let nested = suggester().suggest(
            &GrammarPosition::FunctionOrMetric {
                scope: ExpressionScope::Nested,
            },
            CharRange::at(0),
        );

        assert_eq!(start[0].category, ProposalCategory::Template);
        assert!(nested
            .iter()
            .all(|p| p.category != ProposalCategory::Template));
        assert_eq!(
            start.len() - nested.len(),
            GrammarModel::builtin().templates().count()
        );
    }

    #[test]
    fn test_constrained_label_position() {
        let proposals = suggester().suggest(
            &GrammarPosition::Label {
                metric: Some("up".to_string()),
            },
            CharRange::at(3),
        );
        assert_eq!(labels_of(&proposals), vec!["instance", "job"]);
    }

    #[test]
    fn test_binary_position_has_no_grouping() {
        let proposals = suggester().suggest(&GrammarPosition::BinaryOperator, CharRange::at(0));
        assert!(proposals
            .iter()
            .all(|p| p.category == ProposalCategory::BinaryOperator
                || p.category == ProposalCategory::Modifier));
        assert_eq!(proposals[0].label, "+");
    }

    #[test]
    fn test_grouping_and_binary_order() {
        let proposals =
            suggester().suggest(&GrammarPosition::GroupingAndBinary, CharRange::at(0));
        assert_eq!(&labels_of(&proposals)[..3], &["by", "without", "+"]);
        assert_eq!(proposals[0].insert_text, "by (${1:label})");
    }
}
