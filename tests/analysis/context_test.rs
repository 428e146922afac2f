use std::sync::Arc;

use promsense::analysis::{ContextAnalyzer, ExpressionScope, GrammarPosition, PositionKind};
use promsense::GrammarModel;

const QUERIES: &[&str] = &[
    "",
    "   ",
    "up",
    "sum by(",
    "sum(rate(http_requests_total{method=\"GET\"}[1m]))",
    "histogram_quantile(0.95, sum(rate(http_request_duration_seconds_bucket[5m])) by (le))",
    "100 - (avg by (instance) (rate(node_cpu_seconds_total{mode=\"idle\"}[5m])) * 100)",
    "up{job=\"café\"} == 0",
    "rate(x[30m:1m]) and on(job) up",
    "topk(5, \n  sum without (pod) (container_memory_usage_bytes))",
    "}{)(][",
    "label_replace(up, \"dst\", \"$1\", \"src\", \"(.*)\")",
];

fn analyzer() -> ContextAnalyzer {
    ContextAnalyzer::new(Arc::new(GrammarModel::builtin()))
}

fn classify_end(text: &str) -> GrammarPosition {
    analyzer().classify(text, text.len())
}

#[test]
fn test_classify_is_total_over_every_offset() {
    let analyzer = analyzer();
    for query in QUERIES {
        for offset in 0..=query.len() + 2 {
            let position = analyzer.classify(query, offset);
            assert!(PositionKind::ALL.contains(&position.kind()));
        }
    }
}

#[test]
fn test_classify_ignores_text_after_cursor() {
    let analyzer = analyzer();
    for query in QUERIES {
        for (offset, _) in query.char_indices() {
            assert_eq!(
                analyzer.classify(query, offset),
                analyzer.classify(&query[..offset], offset),
                "query {:?} at {}",
                query,
                offset
            );
        }
    }
}

#[test]
fn test_open_grouping_clause_wins_over_open_range() {
    assert_eq!(
        classify_end("sum by(rate(x["),
        GrammarPosition::GroupingLabel {
            clause: "by".to_string()
        }
    );
}

#[test]
fn test_open_range_wins_over_open_label_block() {
    assert_eq!(
        classify_end("rate(http_requests_total{job=\"api\"}["),
        GrammarPosition::TimeRange
    );
}

#[test]
fn test_label_refinement_uses_first_known_metric_in_text() {
    // The block belongs to node_cpu_seconds_total, but the first metric in
    // grammar order that appears anywhere before the cursor wins.
    assert_eq!(
        classify_end("rate(http_requests_total[5m]) / node_cpu_seconds_total{"),
        GrammarPosition::Label {
            metric: Some("http_requests_total".to_string())
        }
    );
}

#[test]
fn test_nested_scope_inside_open_call() {
    assert_eq!(
        classify_end("sum("),
        GrammarPosition::FunctionOrMetric {
            scope: ExpressionScope::Nested
        }
    );
    assert_eq!(
        classify_end("up and "),
        GrammarPosition::FunctionOrMetric {
            scope: ExpressionScope::Start
        }
    );
}

#[test]
fn test_position_display() {
    assert_eq!(GrammarPosition::TimeRange.to_string(), "time-range");
    assert_eq!(
        GrammarPosition::GroupingOperator {
            aggregation: "avg".to_string()
        }
        .to_string(),
        "grouping-operator(avg)"
    );
    assert_eq!(
        GrammarPosition::Label { metric: None }.to_string(),
        "label"
    );
}

#[test]
fn test_position_serializes_with_kind_tag() {
    let json = serde_json::to_value(GrammarPosition::Label {
        metric: Some("up".to_string()),
    })
    .unwrap();
    assert_eq!(json, serde_json::json!({"kind": "label", "metric": "up"}));

    let json = serde_json::to_value(GrammarPosition::FunctionOrMetric {
        scope: ExpressionScope::Start,
    })
    .unwrap();
    assert_eq!(
        json,
        serde_json::json!({"kind": "function-or-metric", "scope": "start"})
    );

    let json = serde_json::to_value(GrammarPosition::TimeRange).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "time-range"}));
}
