//! Template expansion matching.
//!
//! Once a template has been inserted, its placeholders still hold the
//! defaults. When the cursor sits on one of them, the generic position-based
//! list is replaced by values suited to that placeholder: durations for a
//! range, the template's metric family for a metric, and so on.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use super::generators::{duration_proposals, label_proposals, metric_proposals};
use super::proposal::{CompletionProposal, ProposalCategory};
use crate::analysis::text::line_bounds;
use crate::analysis::CharRange;
use crate::grammar::{GrammarModel, ParamKind, Segment, Template, TemplateParam};

/// What a placeholder value can contain once filled in.
const CAPTURE: &str = r#"[^\s(){}\[\],"]*"#;

const QUANTILES: &[&str] = &["0.5", "0.9", "0.95", "0.99"];
const COUNTS: &[&str] = &["3", "5", "10", "20"];

/// A placeholder of a recognised template instance under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderMatch {
    pub template: &'static Template,
    pub param: &'static TemplateParam,
    /// Span of the placeholder's current value in the full text.
    pub range: CharRange,
}

#[derive(Debug, Clone)]
struct CompiledTemplate {
    template: &'static Template,
    pattern: Regex,
}

/// Recognises filled-in template instances on the cursor's line.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    grammar: Arc<GrammarModel>,
    compiled: Vec<CompiledTemplate>,
}

impl TemplateMatcher {
    pub fn new(grammar: Arc<GrammarModel>) -> Self {
        let compiled = grammar
            .templates()
            .filter_map(|template| match compile(template) {
                Ok(pattern) => Some(CompiledTemplate { template, pattern }),
                Err(e) => {
                    warn!(template = template.name, error = %e, "template skeleton does not compile");
                    None
                }
            })
            .collect();

        Self { grammar, compiled }
    }

    /// The placeholder the cursor touches, if the cursor's line contains a
    /// recognised template instance.
    pub fn find(&self, text: &str, cursor: usize) -> Option<PlaceholderMatch> {
        let line = line_bounds(text, cursor);
        let line_text = line.slice(text);

        for compiled in &self.compiled {
            for caps in compiled.pattern.captures_iter(line_text) {
                for param in compiled.template.parameters {
                    let Some(value) = caps.name(param.name) else {
                        continue;
                    };
                    let range =
                        CharRange::new(line.start + value.start(), line.start + value.end());
                    if range.touches(cursor) {
                        let found = PlaceholderMatch {
                            template: compiled.template,
                            param,
                            range,
                        };
                        debug!(
                            template = found.template.name,
                            param = found.param.name,
                            "cursor on template placeholder"
                        );
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// Proposals for a placeholder, keyed by `(template, parameter)` first
    /// and by the parameter kind otherwise. May be empty.
    pub fn proposals(&self, found: &PlaceholderMatch) -> Vec<CompletionProposal> {
        let grammar = &*self.grammar;
        let range = found.range;

        let mut proposals = match (found.template.name, found.param.name) {
            ("latency_quantile", "metric") => {
                metric_proposals(grammar.metrics().filter(|m| m.ends_with("_bucket")), range)
            }
            ("latency_quantile", "quantile") => value_proposals(QUANTILES, range),
            ("cpu_usage", "metric") => {
                metric_proposals(grammar.metrics().filter(|m| m.contains("cpu")), range)
            }
            ("memory_usage", _) => {
                metric_proposals(grammar.metrics().filter(|m| m.contains("memory")), range)
            }
            _ => match found.param.kind {
                ParamKind::Range => duration_proposals(grammar, range),
                ParamKind::Metric => metric_family(grammar, found.param.default, range),
                ParamKind::LabelName => template_labels(grammar, found.template, range),
                ParamKind::Number => value_proposals(COUNTS, range),
                ParamKind::LabelValue => Vec::new(),
            },
        };

        let detail = format!("{}.{}", found.template.name, found.param.name);
        for proposal in &mut proposals {
            proposal.documentation = Some(format!(
                "{} for `{}`",
                found.param.kind.as_str(),
                detail
            ));
        }
        proposals
    }

    /// Placeholder proposals at the cursor, or `None` to fall back to
    /// ordinary dispatch.
    pub fn complete(&self, text: &str, cursor: usize) -> Option<Vec<CompletionProposal>> {
        let found = self.find(text, cursor)?;
        let proposals = self.proposals(&found);
        (!proposals.is_empty()).then_some(proposals)
    }
}

/// Build the regex for one template: literals escaped with flexible
/// whitespace, placeholders as named captures.
fn compile(template: &Template) -> Result<Regex, regex::Error> {
    let mut pattern = String::new();
    for segment in template.segments() {
        match segment {
            Segment::Literal(text) => {
                let mut in_space = false;
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !in_space {
                            pattern.push_str(r"\s*");
                        }
                        in_space = true;
                    } else {
                        in_space = false;
                        let mut buf = [0u8; 4];
                        pattern.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                    }
                }
            }
            Segment::Placeholder { name, .. } => {
                pattern.push_str(&format!("(?P<{}>{})", name, CAPTURE));
            }
        }
    }
    Regex::new(&pattern)
}

/// Metrics sharing the first `_` segment of `default`, else every metric.
fn metric_family(grammar: &GrammarModel, default: &str, range: CharRange) -> Vec<CompletionProposal> {
    let family = default.split('_').next().unwrap_or_default();
    let prefix = format!("{}_", family);
    let members: Vec<&str> = grammar
        .metrics()
        .filter(|m| !family.is_empty() && m.starts_with(&prefix))
        .collect();

    if members.is_empty() {
        metric_proposals(grammar.metrics(), range)
    } else {
        metric_proposals(members, range)
    }
}

/// Labels of the template's default metric, else every label.
fn template_labels(grammar: &GrammarModel, template: &Template, range: CharRange) -> Vec<CompletionProposal> {
    let labels = template
        .parameters
        .iter()
        .find(|p| p.kind == ParamKind::Metric)
        .and_then(|metric| grammar.labels_for(metric.default));

    match labels {
        Some(labels) => label_proposals(labels.iter().map(String::as_str), range),
        None => label_proposals(grammar.all_labels(), range),
    }
}

fn value_proposals(values: &[&str], range: CharRange) -> Vec<CompletionProposal> {
    values
        .iter()
        .map(|v| CompletionProposal::plain(*v, ProposalCategory::Value, range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> TemplateMatcher {
        TemplateMatcher::new(Arc::new(GrammarModel::builtin()))
    }

    #[test]
    fn test_every_builtin_template_compiles() {
        let grammar = GrammarModel::builtin();
        assert_eq!(matcher().compiled.len(), grammar.templates().count());
    }

    #[test]
    fn test_defaults_match_their_own_template() {
        let matcher = matcher();
        for compiled in &matcher.compiled {
            let rendered = compiled.template.render_defaults();
            assert!(
                compiled.pattern.is_match(&rendered),
                "{} does not match {}",
                compiled.template.name,
                rendered
            );
        }
    }

    #[test]
    fn test_find_range_placeholder() {
        let text = "sum(rate(http_requests_total{job=\"api\"}[5m])) by (instance)";
        let cursor = text.find("5m").unwrap() + 1;
        let found = matcher().find(text, cursor).unwrap();
        assert_eq!(found.template.name, "request_rate");
        assert_eq!(found.param.name, "range");
        assert_eq!(found.range.slice(text), "5m");
    }

    #[test]
    fn test_whitespace_is_flexible() {
        let text = "sum(rate(http_requests_total{job=\"api\"}[5m]))by(instance)";
        let cursor = text.find("instance").unwrap();
        let found = matcher().find(text, cursor).unwrap();
        assert_eq!(found.param.name, "group");
    }

    #[test]
    fn test_quantile_values() {
        let text = "histogram_quantile(0.95, sum(rate(http_request_duration_seconds_bucket[5m])) by (le))";
        let cursor = text.find("0.95").unwrap() + 4;
        let proposals = matcher().complete(text, cursor).unwrap();
        let labels: Vec<_> = proposals.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["0.5", "0.9", "0.95", "0.99"]);
        assert_eq!(proposals[0].range.slice(text), "0.95");
    }

    #[test]
    fn test_label_value_falls_through() {
        let text = "up{job=\"api\"} == 0";
        let cursor = text.find("api").unwrap() + 1;
        let matcher = matcher();
        assert!(matcher.find(text, cursor).is_some());
        assert!(matcher.complete(text, cursor).is_none());
    }

    #[test]
    fn test_no_template_on_plain_query() {
        assert!(matcher().find("rate(up[5m])", 9).is_none());
    }
}
