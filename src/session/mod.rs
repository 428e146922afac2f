//! Editor session orchestration.
//!
//! A [`QuerySession`] wires the engine to an abstract editor:
//!
//! - every edit schedules a debounced validation pass;
//! - a finished pass schedules a short projection delay before markers are
//!   pushed, so markers do not flicker while the user is mid-bracket;
//! - completions are computed on demand and applied through the editor;
//! - the run action is refused while the completion menu is open or the
//!   query has findings.
//!
//! The session never reads a clock. Hosts pass `now` to
//! [`QuerySession::on_text_changed`] and [`QuerySession::tick`].

pub mod history;
pub mod timer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

pub use history::{InMemoryHistory, QueryHistory, QueryHistoryEntry};
pub use timer::{DebounceTimer, TimerToken};

use crate::analysis::CharRange;
use crate::completion::{CompletionEngine, CompletionProposal, DEFAULT_MAX_PROPOSALS};
use crate::config::EditorSettings;
use crate::diagnostics::{DiagnosticSink, DiagnosticsProjector};
use crate::grammar::GrammarModel;
use crate::validation::{ValidationFinding, Validator};

/// The host editor widget.
pub trait EditorSurface: DiagnosticSink {
    /// Current text and cursor byte offset.
    fn text_and_cursor(&self) -> (String, usize);
    fn replace_range(&mut self, range: CharRange, text: &str);
}

/// Executes queries. Opaque to the engine.
pub trait QueryExecutor {
    fn submit(&mut self, query: &str);
}

/// Why the run action was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("completion menu is open")]
    CompletionMenuOpen,

    #[error("query has {0} validation finding(s)")]
    HasFindings(usize),
}

/// Timing and limits for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub validation_delay: Duration,
    pub projection_delay: Duration,
    pub max_proposals: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            validation_delay: Duration::from_millis(300),
            projection_delay: Duration::from_millis(150),
            max_proposals: DEFAULT_MAX_PROPOSALS,
        }
    }
}

impl From<&EditorSettings> for SessionOptions {
    fn from(settings: &EditorSettings) -> Self {
        Self {
            validation_delay: Duration::from_millis(settings.validation_delay_ms),
            projection_delay: Duration::from_millis(settings.projection_delay_ms),
            max_proposals: settings.max_proposals,
        }
    }
}

/// Findings waiting out the projection delay.
#[derive(Debug)]
struct Projection {
    text: String,
    findings: Vec<ValidationFinding>,
}

/// One editor's authoring session.
#[derive(Debug)]
pub struct QuerySession {
    completion: CompletionEngine,
    validator: Validator,
    projector: DiagnosticsProjector,
    validation: DebounceTimer<String>,
    projection: DebounceTimer<Projection>,
    findings: Vec<ValidationFinding>,
}

impl QuerySession {
    pub fn new(grammar: Arc<GrammarModel>, options: SessionOptions) -> Self {
        Self {
            completion: CompletionEngine::new(grammar.clone())
                .with_max_proposals(options.max_proposals),
            validator: Validator::new(grammar),
            projector: DiagnosticsProjector::default(),
            validation: DebounceTimer::new(options.validation_delay),
            projection: DebounceTimer::new(options.projection_delay),
            findings: Vec::new(),
        }
    }

    /// Findings from the last completed validation pass.
    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    /// Whether a validation or projection is still waiting.
    pub fn is_idle(&self) -> bool {
        self.validation.deadline().is_none() && self.projection.deadline().is_none()
    }

    /// Record an edit. Any pending validation or projection is discarded.
    pub fn on_text_changed(&mut self, editor: &dyn EditorSurface, now: Instant) -> TimerToken {
        let (text, _) = editor.text_and_cursor();
        self.projection.cancel_all();
        self.validation.schedule(now, text)
    }

    /// Advance time. Returns true when markers were projected.
    pub fn tick(&mut self, editor: &mut dyn EditorSurface, now: Instant) -> bool {
        if let Some((_, text)) = self.validation.fire_due(now) {
            let findings = self.validator.validate(&text);
            debug!(findings = findings.len(), "validation pass finished");
            self.findings = findings.clone();
            self.projection.schedule(now, Projection { text, findings });
        }

        match self.projection.fire_due(now) {
            Some((_, Projection { text, findings })) => {
                self.projector.project(editor, &text, &findings);
                true
            }
            None => false,
        }
    }

    /// Proposals at the editor's cursor.
    pub fn complete(&self, editor: &dyn EditorSurface) -> Vec<CompletionProposal> {
        let (text, cursor) = editor.text_and_cursor();
        self.completion.complete(&text, cursor)
    }

    /// Insert `proposal` into the editor and treat it as an edit.
    pub fn apply_proposal(
        &mut self,
        editor: &mut dyn EditorSurface,
        proposal: &CompletionProposal,
        now: Instant,
    ) -> TimerToken {
        editor.replace_range(proposal.range, &proposal.plain_text());
        self.on_text_changed(editor, now)
    }

    /// Submit the current query and record it in history.
    ///
    /// The query is validated afresh rather than trusting a possibly stale
    /// debounced pass.
    pub fn run(
        &mut self,
        editor: &dyn EditorSurface,
        executor: &mut dyn QueryExecutor,
        history: &mut dyn QueryHistory,
        menu_open: bool,
    ) -> Result<QueryHistoryEntry, RunError> {
        if menu_open {
            return Err(RunError::CompletionMenuOpen);
        }

        let (text, _) = editor.text_and_cursor();
        let findings = self.validator.validate(&text);
        if !findings.is_empty() {
            let count = findings.len();
            self.findings = findings;
            return Err(RunError::HasFindings(count));
        }

        executor.submit(&text);
        let entry = QueryHistoryEntry::new(text);
        history.append(entry.clone());
        info!(id = %entry.id, "query submitted");
        Ok(entry)
    }
}
