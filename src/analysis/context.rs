//! Grammar-position classification from text.
//!
//! Looks only at the text before the cursor and decides what kind of token
//! the user is about to type. Mid-edit text is usually invalid, so this is
//! a fixed-priority cascade of textual checks rather than a parse: the
//! first check that matches wins.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::text::{clamp_offset, word_start};
use crate::grammar::GrammarModel;

/// Whether an expression starts the query or sits inside a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpressionScope {
    Start,
    Nested,
}

/// What kind of token is expected at the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GrammarPosition {
    /// Inside `by(` / `without(`.
    GroupingLabel { clause: String },
    /// Inside `[` with no `]` yet.
    TimeRange,
    /// After a complete label name inside `{`, expecting `=`, `!=`, ...
    Comparator { label: String },
    /// Inside `{`, expecting a label name.
    Label { metric: Option<String> },
    /// After `sum(...)`: grouping clause or binary operator.
    GroupingAndBinary,
    /// Right after an aggregation keyword.
    GroupingOperator { aggregation: String },
    /// After a complete vector expression.
    BinaryOperator,
    FunctionOrMetric { scope: ExpressionScope },
    /// Nothing specific.
    Any,
}

/// Fieldless discriminant of [`GrammarPosition`], used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionKind {
    GroupingLabel,
    TimeRange,
    Comparator,
    Label,
    GroupingAndBinary,
    GroupingOperator,
    BinaryOperator,
    FunctionOrMetric,
    Any,
}

impl PositionKind {
    pub const ALL: [PositionKind; 9] = [
        PositionKind::GroupingLabel,
        PositionKind::TimeRange,
        PositionKind::Comparator,
        PositionKind::Label,
        PositionKind::GroupingAndBinary,
        PositionKind::GroupingOperator,
        PositionKind::BinaryOperator,
        PositionKind::FunctionOrMetric,
        PositionKind::Any,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PositionKind::GroupingLabel => "grouping-label",
            PositionKind::TimeRange => "time-range",
            PositionKind::Comparator => "comparator",
            PositionKind::Label => "label",
            PositionKind::GroupingAndBinary => "grouping-and-binary",
            PositionKind::GroupingOperator => "grouping-operator",
            PositionKind::BinaryOperator => "binary-operator",
            PositionKind::FunctionOrMetric => "function-or-metric",
            PositionKind::Any => "any",
        }
    }
}

impl GrammarPosition {
    pub fn kind(&self) -> PositionKind {
        match self {
            GrammarPosition::GroupingLabel { .. } => PositionKind::GroupingLabel,
            GrammarPosition::TimeRange => PositionKind::TimeRange,
            GrammarPosition::Comparator { .. } => PositionKind::Comparator,
            GrammarPosition::Label { .. } => PositionKind::Label,
            GrammarPosition::GroupingAndBinary => PositionKind::GroupingAndBinary,
            GrammarPosition::GroupingOperator { .. } => PositionKind::GroupingOperator,
            GrammarPosition::BinaryOperator => PositionKind::BinaryOperator,
            GrammarPosition::FunctionOrMetric { .. } => PositionKind::FunctionOrMetric,
            GrammarPosition::Any => PositionKind::Any,
        }
    }

    /// The refining context tag, if this position carries one.
    pub fn refinement(&self) -> Option<&str> {
        match self {
            GrammarPosition::GroupingLabel { clause } => Some(clause),
            GrammarPosition::Comparator { label } => Some(label),
            GrammarPosition::Label { metric } => metric.as_deref(),
            GrammarPosition::GroupingOperator { aggregation } => Some(aggregation),
            _ => None,
        }
    }
}

impl fmt::Display for GrammarPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.refinement() {
            Some(tag) => write!(f, "{}({})", self.kind().as_str(), tag),
            None => f.write_str(self.kind().as_str()),
        }
    }
}

static GROUPING_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(by|without)\s*\(").expect("valid grouping regex"));

static COMPLETE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s+$").expect("valid label regex")
});

/// Classifies the text before a cursor into a [`GrammarPosition`].
#[derive(Debug, Clone)]
pub struct ContextAnalyzer {
    grammar: Arc<GrammarModel>,
    /// `sum(...)` with a closed, non-nested group at the end of the text.
    closed_aggregation: Regex,
    /// An aggregation keyword at the end of the text.
    trailing_aggregation: Regex,
}

impl ContextAnalyzer {
    pub fn new(grammar: Arc<GrammarModel>) -> Self {
        let names = grammar
            .aggregation_names()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");

        let closed_aggregation = Regex::new(&format!(r"\b(?:{})\s*\([^()]*\)\s*$", names))
            .expect("aggregation names are escaped");
        let trailing_aggregation = Regex::new(&format!(r"\b({})\s*$", names))
            .expect("aggregation names are escaped");

        Self {
            grammar,
            closed_aggregation,
            trailing_aggregation,
        }
    }

    pub fn grammar(&self) -> &Arc<GrammarModel> {
        &self.grammar
    }

    /// Classify the position at `cursor` in `text`.
    ///
    /// Total: any cursor is accepted (it is clamped into the text) and the
    /// fallback is [`GrammarPosition::Any`].
    pub fn classify(&self, text: &str, cursor: usize) -> GrammarPosition {
        let cursor = clamp_offset(text, cursor);
        let position = self.classify_before(&text[..cursor]);
        debug!(cursor, %position, "classified cursor position");
        position
    }

    fn classify_before(&self, before: &str) -> GrammarPosition {
        if let Some(clause) = open_grouping_clause(before) {
            return GrammarPosition::GroupingLabel {
                clause: clause.to_string(),
            };
        }

        if open_bracket(before, '[', ']').is_some() {
            return GrammarPosition::TimeRange;
        }

        if let Some(brace) = open_bracket(before, '{', '}') {
            return self.classify_label_block(before, &before[brace + 1..]);
        }

        if self.closed_aggregation.is_match(before) {
            return GrammarPosition::GroupingAndBinary;
        }

        if let Some(caps) = self.trailing_aggregation.captures(before) {
            return GrammarPosition::GroupingOperator {
                aggregation: caps[1].to_string(),
            };
        }

        let trimmed = before.trim_end();
        if trimmed.ends_with('}') || trimmed.ends_with(')') {
            return GrammarPosition::BinaryOperator;
        }

        if let Some(scope) = expression_scope(before) {
            return GrammarPosition::FunctionOrMetric { scope };
        }

        GrammarPosition::Any
    }

    fn classify_label_block(&self, before: &str, block: &str) -> GrammarPosition {
        let entry = block.rsplit(',').next().unwrap_or(block);
        if let Some(caps) = COMPLETE_LABEL.captures(entry) {
            return GrammarPosition::Comparator {
                label: caps[1].to_string(),
            };
        }

        // First metric in grammar order that appears anywhere before the
        // cursor, not necessarily the one that owns this block.
        let metric = self
            .grammar
            .metrics()
            .find(|metric| before.contains(metric))
            .map(str::to_string);

        GrammarPosition::Label { metric }
    }
}

/// The `by`/`without` clause whose parenthesis is still open, if any.
fn open_grouping_clause(before: &str) -> Option<&str> {
    let caps = GROUPING_CLAUSE.captures_iter(before).last()?;
    let clause = caps.get(1)?.as_str();
    let rest = &before[caps.get(0)?.end()..];

    let mut depth = 1usize;
    for c in rest.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    Some(clause)
}

/// Offset of the last `open` with no `close` after it.
fn open_bracket(before: &str, open: char, close: char) -> Option<usize> {
    let idx = before.rfind(open)?;
    if before[idx..].contains(close) {
        None
    } else {
        Some(idx)
    }
}

fn paren_depth(text: &str) -> isize {
    text.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

/// Whether an expression can start here, and in which scope.
fn expression_scope(before: &str) -> Option<ExpressionScope> {
    if before.trim().is_empty() {
        return Some(ExpressionScope::Start);
    }

    let scope = if paren_depth(before) > 0 {
        ExpressionScope::Nested
    } else {
        ExpressionScope::Start
    };

    let last = before.chars().next_back()?;
    if last == '(' || last == ',' || last.is_whitespace() {
        return Some(scope);
    }

    let start = word_start(before, before.len());
    let word = &before[start..];
    let alphabetic = !word.is_empty() && word.chars().all(|c| c == '_' || c.is_ascii_alphabetic());

    alphabetic.then_some(scope)
}
