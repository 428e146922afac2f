//! Whole-query validation.
//!
//! A [`Validator`] runs an ordered list of independent [`Rule`]s over the
//! query. Each failing rule contributes exactly one [`ValidationFinding`];
//! findings are neither merged nor deduplicated, so overlapping spans from
//! different rules are expected.

pub mod rules;
mod scan;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::analysis::text::clamp_offset;
use crate::grammar::GrammarModel;

/// Identifies a validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    EmptyQuery,
    BalancedBrackets,
    MetricPresence,
    TimeRange,
    LabelMatchers,
    BinaryExpression,
    RateUsage,
    AggregationExpression,
    StringLiterals,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::EmptyQuery => "empty-query",
            RuleId::BalancedBrackets => "balanced-brackets",
            RuleId::MetricPresence => "metric-presence",
            RuleId::TimeRange => "time-range",
            RuleId::LabelMatchers => "label-matchers",
            RuleId::BinaryExpression => "binary-expression",
            RuleId::RateUsage => "rate-usage",
            RuleId::AggregationExpression => "aggregation-expression",
            RuleId::StringLiterals => "string-literals",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Valid,
    /// The defect spans `[position, end)`.
    Invalid { position: usize, end: usize },
}

impl RuleOutcome {
    /// An invalid span of `len` bytes starting at `position`.
    pub fn at(position: usize, len: usize) -> Self {
        RuleOutcome::Invalid {
            position,
            end: position + len,
        }
    }
}

/// A single validation rule.
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: RuleId,
    pub message: &'static str,
    /// When present and false for a query, the rule is skipped entirely.
    pub include: Option<fn(&str) -> bool>,
    pub check: fn(&GrammarModel, &str) -> RuleOutcome,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("message", &self.message)
            .field("gated", &self.include.is_some())
            .finish()
    }
}

/// A defect in the query with its byte span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFinding {
    pub rule: RuleId,
    pub message: String,
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}: {} [{}]", self.start, self.end, self.message, self.rule)
    }
}

/// Runs the rule pipeline.
#[derive(Debug, Clone)]
pub struct Validator {
    grammar: Arc<GrammarModel>,
    rules: Vec<Rule>,
}

impl Validator {
    /// A validator with the builtin rule set.
    pub fn new(grammar: Arc<GrammarModel>) -> Self {
        Self::with_rules(grammar, rules::builtin())
    }

    pub fn with_rules(grammar: Arc<GrammarModel>, rules: Vec<Rule>) -> Self {
        Self { grammar, rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Validate `query`, collecting every failing rule.
    ///
    /// An empty query short-circuits with a single finding.
    pub fn validate(&self, query: &str) -> Vec<ValidationFinding> {
        let mut findings = Vec::new();

        for rule in &self.rules {
            if let Some(include) = rule.include {
                if !include(query) {
                    continue;
                }
            }

            let RuleOutcome::Invalid { position, end } = (rule.check)(&self.grammar, query) else {
                continue;
            };

            let start = clamp_offset(query, position);
            let end = clamp_offset(query, end).max(start);
            findings.push(ValidationFinding {
                rule: rule.id,
                message: rule.message.to_string(),
                start,
                end,
            });

            if rule.id == RuleId::EmptyQuery {
                break;
            }
        }

        debug!(
            len = query.len(),
            findings = findings.len(),
            "validated query"
        );
        findings
    }
}
