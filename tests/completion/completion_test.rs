use std::sync::Arc;

use promsense::analysis::{CharRange, ContextAnalyzer, PositionKind};
use promsense::completion::{CompletionEngine, CompletionProposal, ProposalCategory, Suggester};
use promsense::GrammarModel;

fn grammar() -> Arc<GrammarModel> {
    Arc::new(GrammarModel::builtin())
}

fn engine() -> CompletionEngine {
    CompletionEngine::new(grammar())
}

fn labels(proposals: &[CompletionProposal]) -> Vec<&str> {
    proposals.iter().map(|p| p.label.as_str()).collect()
}

fn complete_end(text: &str) -> Vec<CompletionProposal> {
    engine().complete(text, text.len())
}

#[test]
fn test_labels_constrained_to_metric() {
    let proposals = complete_end("http_requests_total{");
    assert_eq!(
        labels(&proposals),
        vec!["code", "handler", "instance", "job", "method", "status"]
    );
    assert!(proposals
        .iter()
        .all(|p| p.category == ProposalCategory::Label && p.range == CharRange::at(20)));
}

#[test]
fn test_partial_label_is_replaced() {
    let text = "node_cpu_seconds_total{mo";
    let proposals = complete_end(text);
    assert_eq!(labels(&proposals), vec!["mode"]);
    assert_eq!(proposals[0].range.slice(text), "mo");
}

#[test]
fn test_comparators_after_label_name() {
    let proposals = complete_end("http_requests_total{method ");
    assert_eq!(labels(&proposals), vec!["=", "!=", "=~", "!~"]);
    assert!(proposals
        .iter()
        .all(|p| p.category == ProposalCategory::Matcher));
}

#[test]
fn test_templates_lead_at_query_start() {
    let grammar = grammar();
    let template_count = grammar.templates().count();
    let proposals = CompletionEngine::new(grammar).complete("", 0);

    assert!(proposals[..template_count]
        .iter()
        .all(|p| p.category == ProposalCategory::Template));
    assert_eq!(proposals[0].label, "request_rate");
    assert_eq!(proposals[template_count].label, "sum");
    assert!(proposals[template_count..]
        .iter()
        .all(|p| p.category != ProposalCategory::Template));
}

#[test]
fn test_no_templates_inside_call() {
    let proposals = complete_end("rate(");
    assert!(!proposals.is_empty());
    assert!(proposals
        .iter()
        .all(|p| p.category != ProposalCategory::Template));
    assert_eq!(proposals[0].label, "sum");
    assert!(labels(&proposals).contains(&"http_requests_total"));
}

#[test]
fn test_template_snippet_expands_to_defaults() {
    let grammar = grammar();
    let proposals = CompletionEngine::new(grammar.clone()).complete("", 0);
    for template in grammar.templates() {
        let proposal = proposals
            .iter()
            .find(|p| p.label == template.name)
            .unwrap();
        assert_eq!(proposal.plain_text(), template.render_defaults());
    }
}

#[test]
fn test_binary_operators_after_selector() {
    let proposals = complete_end("up{job=\"node\"} ");
    let names = labels(&proposals);
    assert_eq!(names[0], "+");
    assert!(names.contains(&"unless"));
    assert!(names.contains(&"group_left"));
    let first_modifier = proposals
        .iter()
        .position(|p| p.category == ProposalCategory::Modifier)
        .unwrap();
    assert!(proposals[..first_modifier]
        .iter()
        .all(|p| p.category == ProposalCategory::BinaryOperator));
}

#[test]
fn test_grouping_then_binary_after_closed_aggregation() {
    let proposals = complete_end("sum(http_requests_total) ");
    assert_eq!(&labels(&proposals)[..3], &["by", "without", "+"]);
    assert_eq!(proposals[0].insert_text, "by (${1:label})");
}

#[test]
fn test_durations_carry_descriptions() {
    let proposals = complete_end("rate(http_requests_total[");
    let five = proposals.iter().find(|p| p.label == "5m").unwrap();
    assert_eq!(five.detail.as_deref(), Some("5 minutes"));
    let hour = proposals.iter().find(|p| p.label == "1h").unwrap();
    assert_eq!(hour.detail.as_deref(), Some("1 hour"));
}

#[test]
fn test_no_proposals_for_any() {
    assert!(complete_end("up == 1").is_empty());
}

#[test]
fn test_completion_ranges_fit_every_offset() {
    let engine = engine();
    let queries = [
        "sum(rate(http_requests_total{method=\"GET\"}[1m])) by (job)",
        "up{job=\"café\"} == 0",
        "histogram_quantile(0.95, sum(rate(http_request_duration_seconds_bucket[5m])) by (le))",
    ];
    for query in queries {
        for offset in 0..=query.len() {
            for proposal in engine.complete(query, offset) {
                assert!(
                    proposal.range.fits(query),
                    "{:?} at {} gave {:?}",
                    query,
                    offset,
                    proposal.range
                );
            }
        }
    }
}

#[test]
fn test_suggest_is_deterministic() {
    let grammar = grammar();
    let analyzer = ContextAnalyzer::new(grammar.clone());
    let suggester = Suggester::new(grammar);
    for text in ["", "sum by(", "rate(up[", "up{", "sum ", "up "] {
        let position = analyzer.classify(text, text.len());
        let range = CharRange::at(text.len());
        assert_eq!(
            suggester.suggest(&position, range),
            suggester.suggest(&position, range)
        );
    }
}

#[test]
fn test_every_position_kind_dispatches() {
    let grammar = grammar();
    let analyzer = ContextAnalyzer::new(grammar.clone());
    let suggester = Suggester::new(grammar);
    let samples = [
        ("sum by(", PositionKind::GroupingLabel, true),
        ("rate(up[", PositionKind::TimeRange, true),
        ("up{job ", PositionKind::Comparator, true),
        ("up{", PositionKind::Label, true),
        ("sum(up) ", PositionKind::GroupingAndBinary, true),
        ("sum ", PositionKind::GroupingOperator, true),
        ("rate(up[5m]) ", PositionKind::BinaryOperator, true),
        ("", PositionKind::FunctionOrMetric, true),
        ("up == 1", PositionKind::Any, false),
    ];
    for (text, kind, has_proposals) in samples {
        let position = analyzer.classify(text, text.len());
        assert_eq!(position.kind(), kind, "{:?}", text);
        let proposals = suggester.suggest(&position, CharRange::at(text.len()));
        assert_eq!(!proposals.is_empty(), has_proposals, "{:?}", text);
    }
}
