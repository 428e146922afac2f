//! Completion proposal types.

use serde::Serialize;

use crate::analysis::CharRange;
use crate::grammar::template::parse_skeleton;
use crate::grammar::Segment;

/// Where a proposal comes from. Drives ranking and editor icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalCategory {
    Template,
    Aggregation,
    Grouping,
    BinaryOperator,
    Matcher,
    Modifier,
    Function,
    Metric,
    Label,
    Duration,
    Value,
}

impl ProposalCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalCategory::Template => "template",
            ProposalCategory::Aggregation => "aggregation",
            ProposalCategory::Grouping => "grouping",
            ProposalCategory::BinaryOperator => "binary-operator",
            ProposalCategory::Matcher => "matcher",
            ProposalCategory::Modifier => "modifier",
            ProposalCategory::Function => "function",
            ProposalCategory::Metric => "metric",
            ProposalCategory::Label => "label",
            ProposalCategory::Duration => "duration",
            ProposalCategory::Value => "value",
        }
    }

    /// Templates always rank before primitive vocabulary.
    pub fn sort_rank(self) -> u8 {
        match self {
            ProposalCategory::Template => 0,
            _ => 1,
        }
    }
}

/// How `insert_text` should be interpreted by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertFormat {
    Plain,
    /// Snippet syntax with `${n:default}` tab stops.
    Snippet,
}

/// One candidate insertion offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionProposal {
    pub label: String,
    pub category: ProposalCategory,
    pub insert_text: String,
    pub insert_format: InsertFormat,
    /// Range of the current text this proposal replaces.
    pub range: CharRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl CompletionProposal {
    /// A proposal that inserts its own label.
    pub fn plain(label: impl Into<String>, category: ProposalCategory, range: CharRange) -> Self {
        let label = label.into();
        debug_assert!(!label.is_empty(), "proposal label must not be empty");
        Self {
            insert_text: label.clone(),
            label,
            category,
            insert_format: InsertFormat::Plain,
            range,
            detail: None,
            documentation: None,
        }
    }

    /// Replace the inserted text with a snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let snippet = snippet.into();
        debug_assert!(!snippet.is_empty(), "snippet must not be empty");
        self.insert_text = snippet;
        self.insert_format = InsertFormat::Snippet;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    /// The inserted text with snippet tab stops replaced by their defaults,
    /// for editors without snippet support.
    pub fn plain_text(&self) -> String {
        match self.insert_format {
            InsertFormat::Plain => self.insert_text.clone(),
            InsertFormat::Snippet => expand_snippet(&self.insert_text),
        }
    }
}

fn expand_snippet(snippet: &str) -> String {
    let mut out = String::with_capacity(snippet.len());
    for segment in parse_skeleton(snippet) {
        match segment {
            Segment::Literal(text) => out.push_str(&unescape_snippet(text)),
            Segment::Placeholder { name, .. } => out.push_str(&unescape_snippet(name)),
        }
    }
    out
}

fn unescape_snippet(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match (c, chars.clone().next()) {
            ('\\', Some(next @ ('$' | '}' | '\\'))) => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Stable sort putting templates first, keeping generator order otherwise.
pub fn rank(proposals: &mut [CompletionProposal]) {
    proposals.sort_by_key(|p| p.category.sort_rank());
}
