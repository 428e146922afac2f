use std::sync::Arc;

use promsense::completion::{CompletionEngine, CompletionProposal, ProposalCategory, TemplateMatcher};
use promsense::GrammarModel;

fn matcher() -> TemplateMatcher {
    TemplateMatcher::new(Arc::new(GrammarModel::builtin()))
}

fn rendered(name: &str) -> String {
    GrammarModel::builtin()
        .template(name)
        .unwrap()
        .render_defaults()
}

fn labels(proposals: &[CompletionProposal]) -> Vec<&str> {
    proposals.iter().map(|p| p.label.as_str()).collect()
}

/// Cursor one byte into the first occurrence of `needle`.
fn cursor_in(text: &str, needle: &str) -> usize {
    text.find(needle).unwrap() + 1
}

#[test]
fn test_latency_quantile_values() {
    let text = rendered("latency_quantile");
    let proposals = matcher().complete(&text, cursor_in(&text, "0.95")).unwrap();

    assert_eq!(labels(&proposals), vec!["0.5", "0.9", "0.95", "0.99"]);
    assert!(proposals
        .iter()
        .all(|p| p.category == ProposalCategory::Value));
    assert_eq!(proposals[0].range.slice(&text), "0.95");
    assert_eq!(
        proposals[0].documentation.as_deref(),
        Some("number for `latency_quantile.quantile`")
    );
}

#[test]
fn test_latency_metric_offers_histograms_only() {
    let text = rendered("latency_quantile");
    let proposals = matcher()
        .complete(&text, cursor_in(&text, "http_request_duration"))
        .unwrap();
    assert_eq!(
        labels(&proposals),
        vec!["http_request_duration_seconds_bucket"]
    );
}

#[test]
fn test_cpu_usage_metric_and_group() {
    let text = rendered("cpu_usage");

    let metrics = matcher()
        .complete(&text, cursor_in(&text, "node_cpu"))
        .unwrap();
    assert_eq!(
        labels(&metrics),
        vec![
            "node_cpu_seconds_total",
            "process_cpu_seconds_total",
            "container_cpu_usage_seconds_total"
        ]
    );

    let groups = matcher()
        .complete(&text, cursor_in(&text, "instance"))
        .unwrap();
    assert_eq!(labels(&groups), vec!["cpu", "instance", "job", "mode"]);
    assert_eq!(groups[0].range.slice(&text), "instance");
}

#[test]
fn test_memory_usage_either_operand() {
    let text = rendered("memory_usage");
    let proposals = matcher()
        .complete(&text, cursor_in(&text, "node_memory_MemTotal"))
        .unwrap();
    assert_eq!(
        labels(&proposals),
        vec![
            "node_memory_MemAvailable_bytes",
            "node_memory_MemTotal_bytes",
            "process_resident_memory_bytes",
            "container_memory_usage_bytes"
        ]
    );
    assert_eq!(proposals[0].range.slice(&text), "node_memory_MemTotal_bytes");
}

#[test]
fn test_top_k_count_and_metric_family() {
    let text = rendered("top_k");

    let counts = matcher().complete(&text, "topk(".len()).unwrap();
    assert_eq!(labels(&counts), vec!["3", "5", "10", "20"]);

    let metrics = matcher()
        .complete(&text, cursor_in(&text, "http_requests"))
        .unwrap();
    assert_eq!(
        labels(&metrics),
        vec![
            "http_requests_total",
            "http_request_duration_seconds_bucket",
            "http_request_duration_seconds_sum",
            "http_request_duration_seconds_count"
        ]
    );
}

#[test]
fn test_edited_range_still_matches() {
    let text = "sum(rate(http_requests_total{job=\"api\"}[1h])) by (instance)";
    let cursor = text.find("1h]").unwrap() + 2;
    let proposals = matcher().complete(text, cursor).unwrap();
    assert!(proposals
        .iter()
        .all(|p| p.category == ProposalCategory::Duration));
    assert_eq!(proposals[0].range.slice(text), "1h");
}

#[test]
fn test_flexible_whitespace() {
    let text = "histogram_quantile(0.99,sum(rate(http_request_duration_seconds_bucket[5m]))by(le))";
    let found = matcher().find(text, cursor_in(text, "0.99")).unwrap();
    assert_eq!(found.template.name, "latency_quantile");
    assert_eq!(found.param.name, "quantile");
}

#[test]
fn test_match_on_later_line() {
    let text = "up\nhistogram_quantile(0.9, sum(rate(http_request_duration_seconds_bucket[5m])) by (le))";
    let cursor = cursor_in(text, "0.9");
    let found = matcher().find(text, cursor).unwrap();
    assert_eq!(found.range.slice(text), "0.9");
    assert_eq!(found.range.start, text.find("0.9").unwrap());
}

#[test]
fn test_cursor_off_placeholder() {
    let text = rendered("latency_quantile");
    assert!(matcher().find(&text, 3).is_none());
}

#[test]
fn test_label_value_falls_through_to_dispatch() {
    let text = rendered("target_down");
    let cursor = cursor_in(&text, "api");

    let found = matcher().find(&text, cursor).unwrap();
    assert_eq!(found.param.name, "job");
    assert!(matcher().complete(&text, cursor).is_none());

    // The engine classifies the label block instead.
    let proposals = CompletionEngine::new(Arc::new(GrammarModel::builtin())).complete(&text, cursor);
    assert!(proposals
        .iter()
        .all(|p| p.category == ProposalCategory::Label));
}

#[test]
fn test_plain_query_has_no_placeholder() {
    let text = "rate(http_requests_total[5m])";
    assert!(matcher().find(text, text.len()).is_none());
}
