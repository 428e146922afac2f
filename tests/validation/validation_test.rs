use std::sync::Arc;

use insta::assert_snapshot;
use promsense::validation::{Rule, RuleId, RuleOutcome, ValidationFinding, Validator};
use promsense::GrammarModel;

fn validator() -> Validator {
    Validator::new(Arc::new(GrammarModel::builtin()))
}

fn rules_of(findings: &[ValidationFinding]) -> Vec<RuleId> {
    findings.iter().map(|f| f.rule).collect()
}

fn spans(findings: &[ValidationFinding]) -> Vec<(RuleId, usize, usize)> {
    findings.iter().map(|f| (f.rule, f.start, f.end)).collect()
}

#[test]
fn test_valid_queries() {
    let validator = validator();
    for query in [
        "up",
        "up == 0",
        "rate(up[30m:])",
        "rate(up[1h:5m])",
        "sum by (job) (up)",
        "sum(up) by (group)",
        "count_values(\"version\", up)",
        "up{job=~\"api|web\", instance!=\"a,b\"}",
        "rate(http_requests_total[5m]) * 100",
        "label_replace(up, \"dst\", \"$1\", \"src\", \"(.*)\")",
        "up * -1",
        "-up",
        "sum(-rate(up[5m]))",
        "up > -1",
    ] {
        assert_eq!(validator.validate(query), vec![], "{:?}", query);
    }
}

#[test]
fn test_empty_query_short_circuits() {
    let findings = validator().validate("   ");
    assert_eq!(spans(&findings), vec![(RuleId::EmptyQuery, 0, 3)]);
    assert_eq!(findings[0].message, "Query is empty");
}

#[test]
fn test_unknown_metric_only() {
    assert_eq!(
        spans(&validator().validate("foo")),
        vec![(RuleId::MetricPresence, 0, 3)]
    );
}

#[test]
fn test_invalid_duration() {
    assert_eq!(
        spans(&validator().validate("rate(up[5x])")),
        vec![(RuleId::TimeRange, 7, 11)]
    );
}

#[test]
fn test_label_matcher_without_operator() {
    assert_eq!(
        spans(&validator().validate("up{job}")),
        vec![(RuleId::LabelMatchers, 3, 7)]
    );
}

#[test]
fn test_label_matcher_points_at_bad_entry() {
    let query = "up{job=\"a\", instance}";
    let findings = validator().validate(query);
    assert_eq!(rules_of(&findings), vec![RuleId::LabelMatchers]);
    assert_eq!(&query[findings[0].start..findings[0].end], "instance}");
}

#[test]
fn test_label_replace_exempts_label_blocks() {
    let validator = validator();
    let exempt = validator.validate("label_replace(up{job}, \"a\", \"$1\", \"b\", \"(.*)\")");
    assert!(!rules_of(&exempt).contains(&RuleId::LabelMatchers));
    assert_eq!(rules_of(&validator.validate("up{job}")), vec![RuleId::LabelMatchers]);
}

#[test]
fn test_doubled_matcher_operator() {
    let findings = validator().validate("up{job==\"x\"}");
    assert_eq!(rules_of(&findings), vec![RuleId::LabelMatchers]);
}

#[test]
fn test_dangling_binary_operator() {
    assert_eq!(
        spans(&validator().validate("up +")),
        vec![(RuleId::BinaryExpression, 3, 4)]
    );
}

#[test]
fn test_negation_without_operand() {
    assert_eq!(
        spans(&validator().validate("up * -")),
        vec![(RuleId::BinaryExpression, 3, 4)]
    );
}

#[test]
fn test_rate_over_scalar_is_not_flagged() {
    assert!(!rules_of(&validator().validate("rate(5)")).contains(&RuleId::RateUsage));
}

#[test]
fn test_aggregation_without_body() {
    assert_eq!(
        spans(&validator().validate("up + sum()")),
        vec![(RuleId::AggregationExpression, 5, 8)]
    );
    assert_eq!(
        spans(&validator().validate("up + sum by (job)")),
        vec![(RuleId::AggregationExpression, 5, 8)]
    );
}

#[test]
fn test_unterminated_double_quote() {
    let findings = validator().validate("up{job=\"x");
    assert!(spans(&findings).contains(&(RuleId::StringLiterals, 7, 8)));
}

#[test]
fn test_findings_follow_rule_order() {
    let findings = validator().validate("sum up +");
    let rendered = findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    assert_snapshot!(rendered, @r"
    7..8: Binary operator is missing an operand [binary-expression]
    0..3: Aggregation must be followed by a parenthesised expression [aggregation-expression]
    ");
}

#[test]
fn test_finding_serializes_with_rule_id() {
    let findings = validator().validate("rate(http_requests_total)");
    let json = serde_json::to_value(&findings[0]).unwrap();
    assert_eq!(json["rule"], "rate-usage");
    assert_eq!(json["start"], 0);
    assert_eq!(json["end"], 25);
}

fn never_up(_grammar: &GrammarModel, query: &str) -> RuleOutcome {
    match query.find("up") {
        Some(at) => RuleOutcome::at(at, 2),
        None => RuleOutcome::Valid,
    }
}

fn mentions_up(query: &str) -> bool {
    query.contains("up")
}

#[test]
fn test_custom_rule_set() {
    let validator = Validator::with_rules(
        Arc::new(GrammarModel::builtin()),
        vec![Rule {
            id: RuleId::MetricPresence,
            message: "no up",
            include: Some(mentions_up),
            check: never_up,
        }],
    );
    assert_eq!(validator.rules().len(), 1);
    assert_eq!(validator.validate("rate(x[5m])"), vec![]);

    let findings = validator.validate("sum(up)");
    assert_eq!(spans(&findings), vec![(RuleId::MetricPresence, 4, 6)]);
    assert_eq!(findings[0].message, "no up");
}

#[test]
fn test_out_of_range_rule_spans_are_clamped() {
    fn overshoot(_grammar: &GrammarModel, _query: &str) -> RuleOutcome {
        RuleOutcome::Invalid {
            position: 2,
            end: 999,
        }
    }
    let validator = Validator::with_rules(
        Arc::new(GrammarModel::builtin()),
        vec![Rule {
            id: RuleId::BinaryExpression,
            message: "overshoot",
            include: None,
            check: overshoot,
        }],
    );
    assert_eq!(
        spans(&validator.validate("up")),
        vec![(RuleId::BinaryExpression, 2, 2)]
    );
}
