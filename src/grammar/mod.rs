//! Grammar model for the query language.
//!
//! The [`GrammarModel`] is the static vocabulary every other component
//! reads: operators, functions, known metrics and their labels, templates
//! and duration units. It is built once at startup and shared through an
//! `Arc`; nothing mutates it after [`GrammarBuilder::build`].
//!
//! # Example
//!
//! ```
//! use promsense::grammar::GrammarModel;
//!
//! let grammar = GrammarModel::builder()
//!     .metric("checkout_orders_total", ["region", "status"])
//!     .build();
//!
//! assert!(grammar.is_metric("checkout_orders_total"));
//! assert!(grammar.is_metric("http_requests_total"));
//! ```

pub mod builtin;
pub mod template;

use indexmap::{IndexMap, IndexSet};

pub use builtin::{
    BinaryCategory, BinaryOperatorDef, FunctionDef, FunctionKind, OperatorDef, TimeUnit,
};
pub use template::{ParamKind, Segment, Template, TemplateParam};

/// Operator vocabulary grouped by category.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    /// Aggregation operators. All of them require a parenthesised argument.
    pub aggregation: &'static [OperatorDef],
    /// `by` / `without`. Both require a parenthesised label list.
    pub grouping: &'static [OperatorDef],
    pub binary: &'static [BinaryOperatorDef],
    pub label_matchers: &'static [OperatorDef],
    pub modifiers: &'static [OperatorDef],
}

impl OperatorTable {
    fn builtin() -> Self {
        Self {
            aggregation: builtin::AGGREGATION_OPERATORS,
            grouping: builtin::GROUPING_OPERATORS,
            binary: builtin::BINARY_OPERATORS,
            label_matchers: builtin::LABEL_MATCHERS,
            modifiers: builtin::MODIFIERS,
        }
    }
}

/// The immutable vocabulary of the query language.
#[derive(Debug, Clone)]
pub struct GrammarModel {
    metrics: IndexSet<String>,
    labels_by_metric: IndexMap<String, IndexSet<String>>,
    operators: OperatorTable,
    functions: &'static [FunctionDef],
    templates: IndexMap<&'static str, &'static Template>,
    time_units: &'static [TimeUnit],
    range_presets: &'static [&'static str],
}

impl GrammarModel {
    /// The builtin vocabulary with no extensions.
    pub fn builtin() -> Self {
        GrammarBuilder::default().build()
    }

    /// Start from the builtin vocabulary and add to it.
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    /// Known metric names, in declaration order.
    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(String::as_str)
    }

    pub fn is_metric(&self, name: &str) -> bool {
        self.metrics.contains(name)
    }

    /// Labels allowed for a metric. `None` means unconstrained.
    pub fn labels_for(&self, metric: &str) -> Option<&IndexSet<String>> {
        self.labels_by_metric.get(metric)
    }

    /// Every label of every metric, deduplicated and sorted.
    pub fn all_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .labels_by_metric
            .values()
            .flat_map(|set| set.iter().map(String::as_str))
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    pub fn aggregation_names(&self) -> impl Iterator<Item = &'static str> {
        let aggregation = self.operators.aggregation;
        aggregation.iter().map(|op| op.token)
    }

    pub fn is_aggregation(&self, word: &str) -> bool {
        self.operators.aggregation.iter().any(|op| op.token == word)
    }

    pub fn functions(&self) -> &'static [FunctionDef] {
        self.functions
    }

    pub fn functions_of_kind(
        &self,
        kind: FunctionKind,
    ) -> impl Iterator<Item = &'static FunctionDef> {
        let functions = self.functions;
        functions.iter().filter(move |f| f.kind == kind)
    }

    pub fn find_function(&self, name: &str) -> Option<&'static FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn templates(&self) -> impl Iterator<Item = &'static Template> + '_ {
        self.templates.values().copied()
    }

    pub fn template(&self, name: &str) -> Option<&'static Template> {
        self.templates.get(name).copied()
    }

    pub fn time_units(&self) -> &'static [TimeUnit] {
        self.time_units
    }

    /// Human readable name of a unit symbol (`"m"` -> `"minutes"`).
    pub fn unit_description(&self, symbol: &str) -> Option<&'static str> {
        self.time_units
            .iter()
            .find(|u| u.symbol == symbol)
            .map(|u| u.description)
    }

    pub fn range_presets(&self) -> &'static [&'static str] {
        self.range_presets
    }
}

impl Default for GrammarModel {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Builds a [`GrammarModel`] from the builtin tables plus extensions.
#[derive(Debug, Clone, Default)]
pub struct GrammarBuilder {
    extra: Vec<(String, Option<Vec<String>>)>,
}

impl GrammarBuilder {
    /// Add a metric with a fixed set of labels.
    pub fn metric<I, S>(mut self, name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = labels.into_iter().map(Into::into).collect();
        self.extra.push((name.into(), Some(labels)));
        self
    }

    /// Add a metric whose labels are unconstrained. Labels already known
    /// for a builtin metric of the same name are kept.
    pub fn unconstrained_metric(mut self, name: impl Into<String>) -> Self {
        self.extra.push((name.into(), None));
        self
    }

    pub fn build(self) -> GrammarModel {
        let mut metrics = IndexSet::new();
        let mut labels_by_metric: IndexMap<String, IndexSet<String>> = IndexMap::new();

        for (name, labels) in builtin::METRICS {
            metrics.insert(name.to_string());
            if let Some(labels) = labels {
                labels_by_metric.insert(
                    name.to_string(),
                    labels.iter().map(|l| l.to_string()).collect(),
                );
            }
        }

        for (name, labels) in self.extra {
            metrics.insert(name.clone());
            // Labels for a metric declared twice are merged; redeclaring a
            // metric without labels keeps whatever it already had.
            if let Some(labels) = labels {
                labels_by_metric.entry(name).or_default().extend(labels);
            }
        }

        let templates = builtin::TEMPLATES.iter().map(|t| (t.name, t)).collect();

        GrammarModel {
            metrics,
            labels_by_metric,
            operators: OperatorTable::builtin(),
            functions: builtin::FUNCTIONS,
            templates,
            time_units: builtin::TIME_UNITS,
            range_presets: builtin::RANGE_PRESETS,
        }
    }
}
