//! Builtin PromQL vocabulary.
//!
//! Static tables that seed [`GrammarModel::builtin`](super::GrammarModel::builtin).
//! Metric and label tables describe the exporters the console ships
//! dashboards for; deployments add their own through configuration.

use super::template::{ParamKind, Template, TemplateParam};

/// An operator token with its documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDef {
    pub token: &'static str,
    pub description: &'static str,
}

/// Category of a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryCategory {
    Arithmetic,
    Comparison,
    Set,
}

impl BinaryCategory {
    /// Set operators only make sense between two instant vectors.
    pub fn vector_only(self) -> bool {
        matches!(self, BinaryCategory::Set)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryCategory::Arithmetic => "arithmetic",
            BinaryCategory::Comparison => "comparison",
            BinaryCategory::Set => "set",
        }
    }
}

/// A binary operator and the category it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOperatorDef {
    pub token: &'static str,
    pub description: &'static str,
    pub category: BinaryCategory,
}

/// Subclass of a PromQL function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Takes a range vector (`rate`, `increase`, `*_over_time`, ...).
    RangeVector,
    /// Generic aggregate or utility function over instant vectors/scalars.
    Utility,
}

/// A PromQL function definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: &'static str,
    pub description: &'static str,
    /// Snippet inserted on completion.
    pub snippet: &'static str,
    pub kind: FunctionKind,
}

/// A duration unit accepted inside `[...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnit {
    pub symbol: &'static str,
    pub description: &'static str,
}

pub static AGGREGATION_OPERATORS: &[OperatorDef] = &[
    OperatorDef {
        token: "sum",
        description: "Sum over dimensions.\n\nsum(rate(http_requests_total[5m])) by (job)",
    },
    OperatorDef {
        token: "min",
        description: "Minimum over dimensions.",
    },
    OperatorDef {
        token: "max",
        description: "Maximum over dimensions.",
    },
    OperatorDef {
        token: "avg",
        description: "Average over dimensions.",
    },
    OperatorDef {
        token: "group",
        description: "All values in the resulting vector are 1.",
    },
    OperatorDef {
        token: "stddev",
        description: "Population standard deviation over dimensions.",
    },
    OperatorDef {
        token: "stdvar",
        description: "Population standard variance over dimensions.",
    },
    OperatorDef {
        token: "count",
        description: "Count number of elements in the vector.",
    },
    OperatorDef {
        token: "count_values",
        description: "Count number of elements with the same value.\n\ncount_values(\"version\", build_version)",
    },
    OperatorDef {
        token: "bottomk",
        description: "Smallest k elements by sample value.\n\nbottomk(3, up)",
    },
    OperatorDef {
        token: "topk",
        description: "Largest k elements by sample value.\n\ntopk(5, rate(http_requests_total[5m]))",
    },
    OperatorDef {
        token: "quantile",
        description: "Calculate φ-quantile (0 ≤ φ ≤ 1) over dimensions.\n\nquantile(0.9, rate(http_requests_total[5m]))",
    },
];

pub static GROUPING_OPERATORS: &[OperatorDef] = &[
    OperatorDef {
        token: "by",
        description: "Keep only the listed labels when aggregating.",
    },
    OperatorDef {
        token: "without",
        description: "Drop the listed labels when aggregating.",
    },
];

pub static BINARY_OPERATORS: &[BinaryOperatorDef] = &[
    BinaryOperatorDef {
        token: "+",
        description: "Addition",
        category: BinaryCategory::Arithmetic,
    },
    BinaryOperatorDef {
        token: "-",
        description: "Subtraction",
        category: BinaryCategory::Arithmetic,
    },
    BinaryOperatorDef {
        token: "*",
        description: "Multiplication",
        category: BinaryCategory::Arithmetic,
    },
    BinaryOperatorDef {
        token: "/",
        description: "Division",
        category: BinaryCategory::Arithmetic,
    },
    BinaryOperatorDef {
        token: "%",
        description: "Modulo",
        category: BinaryCategory::Arithmetic,
    },
    BinaryOperatorDef {
        token: "^",
        description: "Power",
        category: BinaryCategory::Arithmetic,
    },
    BinaryOperatorDef {
        token: "==",
        description: "Equal",
        category: BinaryCategory::Comparison,
    },
    BinaryOperatorDef {
        token: "!=",
        description: "Not equal",
        category: BinaryCategory::Comparison,
    },
    BinaryOperatorDef {
        token: ">",
        description: "Greater than",
        category: BinaryCategory::Comparison,
    },
    BinaryOperatorDef {
        token: "<",
        description: "Less than",
        category: BinaryCategory::Comparison,
    },
    BinaryOperatorDef {
        token: ">=",
        description: "Greater than or equal",
        category: BinaryCategory::Comparison,
    },
    BinaryOperatorDef {
        token: "<=",
        description: "Less than or equal",
        category: BinaryCategory::Comparison,
    },
    BinaryOperatorDef {
        token: "and",
        description: "Intersection of two vectors",
        category: BinaryCategory::Set,
    },
    BinaryOperatorDef {
        token: "or",
        description: "Union of two vectors",
        category: BinaryCategory::Set,
    },
    BinaryOperatorDef {
        token: "unless",
        description: "Complement of two vectors",
        category: BinaryCategory::Set,
    },
];

pub static LABEL_MATCHERS: &[OperatorDef] = &[
    OperatorDef {
        token: "=",
        description: "Label equals the string",
    },
    OperatorDef {
        token: "!=",
        description: "Label differs from the string",
    },
    OperatorDef {
        token: "=~",
        description: "Label matches the regex",
    },
    OperatorDef {
        token: "!~",
        description: "Label does not match the regex",
    },
];

pub static MODIFIERS: &[OperatorDef] = &[
    OperatorDef {
        token: "bool",
        description: "Return 0/1 instead of filtering on comparison",
    },
    OperatorDef {
        token: "offset",
        description: "Shift the evaluation time back by a duration",
    },
    OperatorDef {
        token: "on",
        description: "Match vectors only on the listed labels",
    },
    OperatorDef {
        token: "ignoring",
        description: "Ignore the listed labels when matching vectors",
    },
    OperatorDef {
        token: "group_left",
        description: "Many-to-one matching, left side has higher cardinality",
    },
    OperatorDef {
        token: "group_right",
        description: "One-to-many matching, right side has higher cardinality",
    },
];

pub static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "rate",
        description: "Per-second average rate of increase of a counter over the range.",
        snippet: "rate(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "irate",
        description: "Per-second instant rate based on the last two samples in the range.",
        snippet: "irate(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "increase",
        description: "Increase of a counter over the range.",
        snippet: "increase(${1:metric}[${2:1h}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "delta",
        description: "Difference between first and last value of a gauge over the range.",
        snippet: "delta(${1:metric}[${2:1h}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "idelta",
        description: "Difference between the last two samples of a gauge.",
        snippet: "idelta(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "deriv",
        description: "Per-second derivative of a gauge using simple linear regression.",
        snippet: "deriv(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "predict_linear",
        description: "Predict the value of a gauge t seconds from now.",
        snippet: "predict_linear(${1:metric}[${2:1h}], ${3:3600})",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "resets",
        description: "Number of counter resets within the range.",
        snippet: "resets(${1:metric}[${2:1h}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "changes",
        description: "Number of times the value changed within the range.",
        snippet: "changes(${1:metric}[${2:1h}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "avg_over_time",
        description: "Average value of all points in the range.",
        snippet: "avg_over_time(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "min_over_time",
        description: "Minimum value of all points in the range.",
        snippet: "min_over_time(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "max_over_time",
        description: "Maximum value of all points in the range.",
        snippet: "max_over_time(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "sum_over_time",
        description: "Sum of all values in the range.",
        snippet: "sum_over_time(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "count_over_time",
        description: "Count of all values in the range.",
        snippet: "count_over_time(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "quantile_over_time",
        description: "φ-quantile of the values in the range.",
        snippet: "quantile_over_time(${1:0.95}, ${2:metric}[${3:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "last_over_time",
        description: "Most recent point value in the range.",
        snippet: "last_over_time(${1:metric}[${2:5m}])",
        kind: FunctionKind::RangeVector,
    },
    FunctionDef {
        name: "histogram_quantile",
        description: "φ-quantile from the buckets of a histogram.\n\nhistogram_quantile(0.95, sum(rate(x_bucket[5m])) by (le))",
        snippet: "histogram_quantile(${1:0.95}, ${2:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "abs",
        description: "Absolute value of all sample values.",
        snippet: "abs(${1:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "absent",
        description: "1-element vector if the input vector has no elements.",
        snippet: "absent(${1:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "ceil",
        description: "Round sample values up to the nearest integer.",
        snippet: "ceil(${1:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "floor",
        description: "Round sample values down to the nearest integer.",
        snippet: "floor(${1:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "round",
        description: "Round sample values to the nearest multiple of to_nearest.",
        snippet: "round(${1:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "clamp_max",
        description: "Clamp sample values to an upper limit.",
        snippet: "clamp_max(${1:expr}, ${2:max})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "clamp_min",
        description: "Clamp sample values to a lower limit.",
        snippet: "clamp_min(${1:expr}, ${2:min})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "label_replace",
        description: "Write a regex-derived value into a destination label.\n\nlabel_replace(up, \"host\", \"$1\", \"instance\", \"(.*):.*\")",
        snippet: "label_replace(${1:expr}, \"${2:dst}\", \"${3:replacement}\", \"${4:src}\", \"${5:regex}\")",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "label_join",
        description: "Join the values of source labels into a destination label.",
        snippet: "label_join(${1:expr}, \"${2:dst}\", \"${3:,}\", \"${4:src}\")",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "sort",
        description: "Sort elements by sample value, ascending.",
        snippet: "sort(${1:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "sort_desc",
        description: "Sort elements by sample value, descending.",
        snippet: "sort_desc(${1:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "scalar",
        description: "Convert a single-element vector to a scalar.",
        snippet: "scalar(${1:expr})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "vector",
        description: "Convert a scalar to a vector with no labels.",
        snippet: "vector(${1:0})",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "time",
        description: "Seconds since the epoch at evaluation time.",
        snippet: "time()",
        kind: FunctionKind::Utility,
    },
    FunctionDef {
        name: "timestamp",
        description: "Timestamp of each sample.",
        snippet: "timestamp(${1:expr})",
        kind: FunctionKind::Utility,
    },
];

/// Known metrics and their labels. `None` leaves labels unconstrained.
///
/// `up` comes last: label-block refinement picks the first metric that
/// occurs anywhere in the text, and `up` is a substring of many words.
pub static METRICS: &[(&str, Option<&[&str]>)] = &[
    (
        "http_requests_total",
        Some(&["code", "handler", "instance", "job", "method", "status"]),
    ),
    (
        "http_request_duration_seconds_bucket",
        Some(&["handler", "instance", "job", "le", "method"]),
    ),
    (
        "http_request_duration_seconds_sum",
        Some(&["handler", "instance", "job", "method"]),
    ),
    (
        "http_request_duration_seconds_count",
        Some(&["handler", "instance", "job", "method"]),
    ),
    (
        "node_cpu_seconds_total",
        Some(&["cpu", "instance", "job", "mode"]),
    ),
    (
        "node_memory_MemAvailable_bytes",
        Some(&["instance", "job"]),
    ),
    ("node_memory_MemTotal_bytes", Some(&["instance", "job"])),
    (
        "node_filesystem_avail_bytes",
        Some(&["device", "fstype", "instance", "job", "mountpoint"]),
    ),
    (
        "node_network_receive_bytes_total",
        Some(&["device", "instance", "job"]),
    ),
    ("process_cpu_seconds_total", Some(&["instance", "job"])),
    (
        "process_resident_memory_bytes",
        Some(&["instance", "job"]),
    ),
    (
        "container_cpu_usage_seconds_total",
        Some(&["container", "namespace", "node", "pod"]),
    ),
    (
        "container_memory_usage_bytes",
        Some(&["container", "namespace", "node", "pod"]),
    ),
    (
        "kube_pod_status_phase",
        Some(&["namespace", "phase", "pod"]),
    ),
    ("up", Some(&["instance", "job"])),
];

pub static TIME_UNITS: &[TimeUnit] = &[
    TimeUnit {
        symbol: "ms",
        description: "milliseconds",
    },
    TimeUnit {
        symbol: "s",
        description: "seconds",
    },
    TimeUnit {
        symbol: "m",
        description: "minutes",
    },
    TimeUnit {
        symbol: "h",
        description: "hours",
    },
    TimeUnit {
        symbol: "d",
        description: "days",
    },
    TimeUnit {
        symbol: "w",
        description: "weeks",
    },
    TimeUnit {
        symbol: "y",
        description: "years",
    },
];

/// Durations offered inside `[...]`.
pub static RANGE_PRESETS: &[&str] = &[
    "1m", "5m", "10m", "15m", "30m", "1h", "3h", "6h", "12h", "1d", "7d",
];

pub static TEMPLATES: &[Template] = &[
    Template {
        name: "request_rate",
        description: "Per-second request rate, summed per instance",
        skeleton: "sum(rate(${1:metric}{job=\"${2:job}\"}[${3:range}])) by (${4:group})",
        parameters: &[
            TemplateParam {
                name: "metric",
                kind: ParamKind::Metric,
                default: "http_requests_total",
                optional: false,
            },
            TemplateParam {
                name: "job",
                kind: ParamKind::LabelValue,
                default: "api",
                optional: false,
            },
            TemplateParam {
                name: "range",
                kind: ParamKind::Range,
                default: "5m",
                optional: false,
            },
            TemplateParam {
                name: "group",
                kind: ParamKind::LabelName,
                default: "instance",
                optional: true,
            },
        ],
    },
    Template {
        name: "error_ratio",
        description: "Share of requests answered with a matching status",
        skeleton: "sum(rate(${1:metric}{status=~\"${2:status}\"}[${3:range}])) / sum(rate(${4:total}[${5:total_range}]))",
        parameters: &[
            TemplateParam {
                name: "metric",
                kind: ParamKind::Metric,
                default: "http_requests_total",
                optional: false,
            },
            TemplateParam {
                name: "status",
                kind: ParamKind::LabelValue,
                default: "5..",
                optional: false,
            },
            TemplateParam {
                name: "range",
                kind: ParamKind::Range,
                default: "5m",
                optional: false,
            },
            TemplateParam {
                name: "total",
                kind: ParamKind::Metric,
                default: "http_requests_total",
                optional: false,
            },
            TemplateParam {
                name: "total_range",
                kind: ParamKind::Range,
                default: "5m",
                optional: false,
            },
        ],
    },
    Template {
        name: "latency_quantile",
        description: "Latency quantile from a histogram",
        skeleton: "histogram_quantile(${1:quantile}, sum(rate(${2:metric}[${3:range}])) by (le))",
        parameters: &[
            TemplateParam {
                name: "quantile",
                kind: ParamKind::Number,
                default: "0.95",
                optional: false,
            },
            TemplateParam {
                name: "metric",
                kind: ParamKind::Metric,
                default: "http_request_duration_seconds_bucket",
                optional: false,
            },
            TemplateParam {
                name: "range",
                kind: ParamKind::Range,
                default: "5m",
                optional: false,
            },
        ],
    },
    Template {
        name: "cpu_usage",
        description: "CPU busy percentage per instance",
        skeleton: "100 - (avg by (${1:group}) (rate(${2:metric}{mode=\"idle\"}[${3:range}])) * 100)",
        parameters: &[
            TemplateParam {
                name: "group",
                kind: ParamKind::LabelName,
                default: "instance",
                optional: true,
            },
            TemplateParam {
                name: "metric",
                kind: ParamKind::Metric,
                default: "node_cpu_seconds_total",
                optional: false,
            },
            TemplateParam {
                name: "range",
                kind: ParamKind::Range,
                default: "5m",
                optional: false,
            },
        ],
    },
    Template {
        name: "memory_usage",
        description: "Memory used as a percentage of total",
        skeleton: "(1 - ${1:available} / ${2:total}) * 100",
        parameters: &[
            TemplateParam {
                name: "available",
                kind: ParamKind::Metric,
                default: "node_memory_MemAvailable_bytes",
                optional: false,
            },
            TemplateParam {
                name: "total",
                kind: ParamKind::Metric,
                default: "node_memory_MemTotal_bytes",
                optional: false,
            },
        ],
    },
    Template {
        name: "top_k",
        description: "Top k series by request rate",
        skeleton: "topk(${1:k}, sum(rate(${2:metric}[${3:range}])) by (${4:group}))",
        parameters: &[
            TemplateParam {
                name: "k",
                kind: ParamKind::Number,
                default: "5",
                optional: false,
            },
            TemplateParam {
                name: "metric",
                kind: ParamKind::Metric,
                default: "http_requests_total",
                optional: false,
            },
            TemplateParam {
                name: "range",
                kind: ParamKind::Range,
                default: "5m",
                optional: false,
            },
            TemplateParam {
                name: "group",
                kind: ParamKind::LabelName,
                default: "instance",
                optional: true,
            },
        ],
    },
    Template {
        name: "target_down",
        description: "Scrape targets that are down",
        skeleton: "up{job=\"${1:job}\"} == 0",
        parameters: &[TemplateParam {
            name: "job",
            kind: ParamKind::LabelValue,
            default: "api",
            optional: false,
        }],
    },
];
