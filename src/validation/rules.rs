//! The builtin rule set.
//!
//! Every check is a plain function over the grammar and the query text.
//! Checks never panic; a check that cannot make sense of its input reports
//! [`RuleOutcome::Valid`] and leaves the defect to another rule.

use once_cell::sync::Lazy;
use regex::Regex;

use super::scan::{
    brace_blocks, mask_strings, matching_close, skip_whitespace, split_commas, words,
};
use super::{Rule, RuleId, RuleOutcome};
use crate::grammar::{GrammarModel, TimeUnit};

/// The builtin rules, in evaluation order.
pub fn builtin() -> Vec<Rule> {
    vec![
        Rule {
            id: RuleId::EmptyQuery,
            message: "Query is empty",
            include: None,
            check: empty_query,
        },
        Rule {
            id: RuleId::BalancedBrackets,
            message: "Unbalanced brackets",
            include: None,
            check: balanced_brackets,
        },
        Rule {
            id: RuleId::MetricPresence,
            message: "Query does not reference a known metric",
            include: None,
            check: metric_presence,
        },
        Rule {
            id: RuleId::TimeRange,
            message: "Invalid time range, expected a duration such as [5m] or [1h:1m]",
            include: Some(has_range),
            check: time_ranges,
        },
        Rule {
            id: RuleId::LabelMatchers,
            message: "Invalid label matcher, expected name=\"value\"",
            include: Some(has_label_block),
            check: label_matchers,
        },
        Rule {
            id: RuleId::BinaryExpression,
            message: "Binary operator is missing an operand",
            include: Some(has_arithmetic),
            check: binary_expression,
        },
        Rule {
            id: RuleId::RateUsage,
            message: "rate() needs a range vector, e.g. rate(metric[5m])",
            include: Some(has_rate),
            check: rate_usage,
        },
        Rule {
            id: RuleId::AggregationExpression,
            message: "Aggregation must be followed by a parenthesised expression",
            include: None,
            check: aggregation_expression,
        },
        Rule {
            id: RuleId::StringLiterals,
            message: "Strings must be double-quoted and terminated",
            include: None,
            check: string_literals,
        },
    ]
}

const ARITHMETIC: &[char] = &['+', '-', '*', '/', '%', '^'];

/// Longest first, so `=~` wins over `=`.
const MATCHER_TOKENS: &[&str] = &["=~", "!~", "!=", ">=", "<=", "=", ">", "<"];

static BINARY_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_:.]+|[)\]}])\s*[-+*/%^]\s*[-+]?\s*([A-Za-z0-9_:.]+|[({])")
        .expect("valid binary operand regex")
});

static RATE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(i?rate)\(").expect("valid rate regex"));

fn has_range(query: &str) -> bool {
    query.contains('[')
}

/// `label_replace(...)` takes its own regex argument; its blocks are exempt.
fn has_label_block(query: &str) -> bool {
    query.contains('{') && !query.contains("label_replace(")
}

fn has_arithmetic(query: &str) -> bool {
    mask_strings(query).contains(ARITHMETIC)
}

fn has_rate(query: &str) -> bool {
    query.contains("rate(")
}

fn empty_query(_grammar: &GrammarModel, query: &str) -> RuleOutcome {
    if query.trim().is_empty() {
        RuleOutcome::Invalid {
            position: 0,
            end: query.len(),
        }
    } else {
        RuleOutcome::Valid
    }
}

fn balanced_brackets(_grammar: &GrammarModel, query: &str) -> RuleOutcome {
    let masked = mask_strings(query);
    let mut stack: Vec<(char, usize)> = Vec::new();

    for (i, c) in masked.char_indices() {
        let expected = match c {
            '(' | '[' | '{' => {
                stack.push((c, i));
                continue;
            }
            ')' => '(',
            ']' => '[',
            '}' => '{',
            _ => continue,
        };
        match stack.pop() {
            Some((open, _)) if open == expected => {}
            _ => return RuleOutcome::at(i, 1),
        }
    }

    match stack.first() {
        Some((_, i)) => RuleOutcome::at(*i, 1),
        None => RuleOutcome::Valid,
    }
}

/// Substring match anywhere, strings included.
fn metric_presence(grammar: &GrammarModel, query: &str) -> RuleOutcome {
    if grammar.metrics().any(|metric| query.contains(metric)) {
        RuleOutcome::Valid
    } else {
        RuleOutcome::Invalid {
            position: 0,
            end: query.len(),
        }
    }
}

fn time_ranges(grammar: &GrammarModel, query: &str) -> RuleOutcome {
    let masked = mask_strings(query);
    let mut cursor = 0;

    while let Some(found) = masked[cursor..].find('[') {
        let open = cursor + found;
        let Some(close) = matching_close(&masked, open) else {
            break;
        };
        if !is_range_selector(masked[open + 1..close].trim(), grammar.time_units()) {
            return RuleOutcome::Invalid {
                position: open,
                end: close + 1,
            };
        }
        cursor = close + 1;
    }
    RuleOutcome::Valid
}

/// `5m`, `1h30m`, `1h:5m` or `1h:`.
fn is_range_selector(text: &str, units: &[TimeUnit]) -> bool {
    match text.split_once(':') {
        Some((range, resolution)) => {
            is_duration(range, units) && (resolution.is_empty() || is_duration(resolution, units))
        }
        None => is_duration(text, units),
    }
}

/// One or more `<digits><unit>` pairs.
pub(crate) fn is_duration(text: &str, units: &[TimeUnit]) -> bool {
    let mut rest = text;
    if rest.is_empty() {
        return false;
    }

    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];

        let unit = units
            .iter()
            .filter(|u| rest.starts_with(u.symbol))
            .max_by_key(|u| u.symbol.len());
        match unit {
            Some(unit) => rest = &rest[unit.symbol.len()..],
            None => return false,
        }
    }
    true
}

fn label_matchers(_grammar: &GrammarModel, query: &str) -> RuleOutcome {
    let masked = mask_strings(query);
    let Some(open) = masked.find('{') else {
        return RuleOutcome::Valid;
    };
    let Some(close) = masked[open..].find('}').map(|i| open + i) else {
        return RuleOutcome::Valid;
    };

    let block = &query[open + 1..close];
    let masked_block = &masked[open + 1..close];

    for (offset, entry) in split_commas(block, masked_block) {
        if entry.trim().is_empty() {
            continue;
        }
        let masked_entry = &masked_block[offset..offset + entry.len()];
        if !is_matcher(entry, masked_entry) {
            let start = open + 1 + offset + (entry.len() - entry.trim_start().len());
            return RuleOutcome::Invalid {
                position: start,
                end: close + 1,
            };
        }
    }
    RuleOutcome::Valid
}

/// `name <op> value` with exactly one operator and both sides non-empty.
fn is_matcher(entry: &str, masked: &str) -> bool {
    let Some(at) = masked.find(['=', '!', '~', '<', '>']) else {
        return false;
    };
    let Some(op) = MATCHER_TOKENS.iter().find(|op| masked[at..].starts_with(**op)) else {
        return false;
    };

    let name = entry[..at].trim();
    let value_start = at + op.len();
    let value = entry[value_start..].trim();
    let masked_value = &masked[value_start..];

    !name.is_empty()
        && !value.is_empty()
        && !masked_value.contains(['=', '!', '~', '<', '>'])
}

fn binary_expression(_grammar: &GrammarModel, query: &str) -> RuleOutcome {
    let masked = mask_strings(query);
    let first_binary = masked
        .char_indices()
        .find(|&(i, c)| ARITHMETIC.contains(&c) && !is_unary_sign(&masked, i, c))
        .map(|(i, _)| i);

    let Some(at) = first_binary else {
        return RuleOutcome::Valid;
    };
    if BINARY_SHAPE.is_match(&masked) {
        RuleOutcome::Valid
    } else {
        RuleOutcome::at(at, 1)
    }
}

/// A `+`/`-` with no left operand: at the start, after an opening bracket,
/// a comma, or another operator.
fn is_unary_sign(masked: &str, at: usize, c: char) -> bool {
    if c != '-' && c != '+' {
        return false;
    }
    match masked[..at].trim_end().chars().next_back() {
        None => true,
        Some(prev) => matches!(prev, '(' | '[' | '{' | ',' | '=' | '<' | '>' | '!')
            || ARITHMETIC.contains(&prev),
    }
}

fn rate_usage(_grammar: &GrammarModel, query: &str) -> RuleOutcome {
    let masked = mask_strings(query);

    for call in RATE_CALL.find_iter(&masked) {
        let open = call.end() - 1;
        let close = matching_close(&masked, open);
        let body_end = close.unwrap_or(masked.len());
        let body = &masked[open + 1..body_end];

        let starts_with_identifier = body
            .trim_start()
            .starts_with(|c: char| c == '_' || c == ':' || c.is_ascii_alphabetic());

        if starts_with_identifier && !body.contains('[') {
            return RuleOutcome::Invalid {
                position: call.start(),
                end: close.map(|c| c + 1).unwrap_or(masked.len()),
            };
        }
    }
    RuleOutcome::Valid
}

fn aggregation_expression(grammar: &GrammarModel, query: &str) -> RuleOutcome {
    let masked = mask_strings(query);
    let blocks = brace_blocks(&masked);

    for (start, word) in words(&masked) {
        if !grammar.is_aggregation(word) {
            continue;
        }
        if blocks.iter().any(|(open, end)| *open < start && start < *end) {
            continue;
        }

        let end = start + word.len();
        let next = skip_whitespace(&masked, end);
        // A label called `group` or `quantile` inside `by (...)`.
        if masked[next..].starts_with([',', ')', '=', '!', '~']) {
            continue;
        }

        if !has_call_body(&masked, next) {
            return RuleOutcome::Invalid {
                position: start,
                end,
            };
        }
    }
    RuleOutcome::Valid
}

/// Whether `(non-blank)` follows at `from`, allowing a grouping clause first.
fn has_call_body(masked: &str, from: usize) -> bool {
    let mut at = from;
    let rest = &masked[at..];
    for clause in ["by", "without"] {
        let after = at + clause.len();
        let is_clause = rest.starts_with(clause)
            && !masked[after..].starts_with(|c: char| c == '_' || c.is_ascii_alphanumeric());
        if is_clause {
            let open = skip_whitespace(masked, after);
            if !masked[open..].starts_with('(') {
                return false;
            }
            let Some(close) = matching_close(masked, open) else {
                return false;
            };
            at = skip_whitespace(masked, close + 1);
            break;
        }
    }

    if !masked[at..].starts_with('(') {
        return false;
    }
    match matching_close(masked, at) {
        Some(close) => !masked[at + 1..close].trim().is_empty(),
        // Unclosed: the bracket rule reports it; only require some body.
        None => !masked[at + 1..].trim().is_empty(),
    }
}

fn string_literals(_grammar: &GrammarModel, query: &str) -> RuleOutcome {
    let mut open_double: Option<usize> = None;
    let mut escaped = false;

    for (i, c) in query.char_indices() {
        if open_double.is_some() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                open_double = None;
            }
            continue;
        }
        match c {
            '"' => open_double = Some(i),
            '\'' | '`' => return RuleOutcome::at(i, 1),
            _ => {}
        }
    }

    match open_double {
        Some(i) => RuleOutcome::at(i, 1),
        None => RuleOutcome::Valid,
    }
}
