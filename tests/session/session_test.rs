use std::sync::Arc;
use std::time::{Duration, Instant};

use promsense::analysis::CharRange;
use promsense::completion::ProposalCategory;
use promsense::config::EditorSettings;
use promsense::diagnostics::{DiagnosticSink, Marker, Severity};
use promsense::session::{
    EditorSurface, InMemoryHistory, QueryExecutor, QuerySession, RunError, SessionOptions,
};
use promsense::GrammarModel;

#[derive(Default)]
struct FakeEditor {
    text: String,
    cursor: usize,
    markers: Vec<Marker>,
    projections: usize,
}

impl FakeEditor {
    fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.len(),
            ..Default::default()
        }
    }

    fn type_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = text.len();
    }
}

impl DiagnosticSink for FakeEditor {
    fn set_diagnostics(&mut self, markers: Vec<Marker>) {
        self.projections += 1;
        self.markers = markers;
    }

    fn clear_diagnostics(&mut self) {
        self.markers.clear();
    }
}

impl EditorSurface for FakeEditor {
    fn text_and_cursor(&self) -> (String, usize) {
        (self.text.clone(), self.cursor)
    }

    fn replace_range(&mut self, range: CharRange, text: &str) {
        self.text.replace_range(range.start..range.end, text);
        self.cursor = range.start + text.len();
    }
}

#[derive(Default)]
struct RecordingExecutor {
    submitted: Vec<String>,
}

impl QueryExecutor for RecordingExecutor {
    fn submit(&mut self, query: &str) {
        self.submitted.push(query.to_string());
    }
}

fn session() -> QuerySession {
    QuerySession::new(Arc::new(GrammarModel::builtin()), SessionOptions::default())
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn test_burst_of_edits_validates_last_text_only() {
    let mut session = session();
    let mut editor = FakeEditor::default();
    let start = Instant::now();

    editor.type_text("rate(");
    session.on_text_changed(&editor, start);
    editor.type_text("rate(up");
    session.on_text_changed(&editor, start + ms(100));
    editor.type_text("rate(up[5m])");
    session.on_text_changed(&editor, start + ms(200));

    assert!(!session.tick(&mut editor, start + ms(450)));
    assert!(session.findings().is_empty());

    assert!(!session.tick(&mut editor, start + ms(500)));
    assert!(session.tick(&mut editor, start + ms(650)));
    assert_eq!(editor.projections, 1);
    assert!(editor.markers.is_empty());
    assert!(session.is_idle());
}

#[test]
fn test_markers_are_one_based() {
    let mut session = session();
    let mut editor = FakeEditor::with_text("up and\nrate(up)");
    let start = Instant::now();

    session.on_text_changed(&editor, start);
    session.tick(&mut editor, start + ms(300));
    assert!(session.tick(&mut editor, start + ms(450)));

    assert_eq!(editor.markers.len(), 1);
    let marker = &editor.markers[0];
    assert_eq!(marker.severity, Severity::Error);
    assert_eq!(marker.source, "promql");
    assert_eq!((marker.start_line, marker.start_column), (2, 1));
    assert_eq!((marker.end_line, marker.end_column), (2, 9));
}

#[test]
fn test_fixed_query_clears_markers() {
    let mut session = session();
    let mut editor = FakeEditor::with_text("rate(up)");
    let start = Instant::now();

    session.on_text_changed(&editor, start);
    session.tick(&mut editor, start + ms(300));
    session.tick(&mut editor, start + ms(450));
    assert_eq!(editor.markers.len(), 1);

    editor.type_text("rate(up[5m])");
    session.on_text_changed(&editor, start + ms(1000));
    session.tick(&mut editor, start + ms(1300));
    session.tick(&mut editor, start + ms(1450));
    assert!(editor.markers.is_empty());
    assert_eq!(editor.projections, 2);
}

#[test]
fn test_run_refused_while_menu_open() {
    let mut session = session();
    let editor = FakeEditor::with_text("up");
    let mut executor = RecordingExecutor::default();
    let mut history = InMemoryHistory::new();

    let result = session.run(&editor, &mut executor, &mut history, true);
    assert_eq!(result, Err(RunError::CompletionMenuOpen));
    assert!(executor.submitted.is_empty());
    assert!(history.is_empty());
}

#[test]
fn test_run_refused_with_findings() {
    let mut session = session();
    let editor = FakeEditor::with_text("rate(up)");
    let mut executor = RecordingExecutor::default();
    let mut history = InMemoryHistory::new();

    // No debounced pass has run; the run action validates on its own.
    let result = session.run(&editor, &mut executor, &mut history, false);
    assert_eq!(result, Err(RunError::HasFindings(1)));
    assert_eq!(session.findings().len(), 1);
    assert!(executor.submitted.is_empty());
    assert_eq!(
        RunError::HasFindings(1).to_string(),
        "query has 1 validation finding(s)"
    );
}

#[test]
fn test_run_submits_and_records_history() {
    let mut session = session();
    let query = "sum(rate(http_requests_total[5m])) by (job)";
    let editor = FakeEditor::with_text(query);
    let mut executor = RecordingExecutor::default();
    let mut history = InMemoryHistory::new();

    let entry = session
        .run(&editor, &mut executor, &mut history, false)
        .unwrap();
    assert_eq!(entry.text, query);
    assert_eq!(executor.submitted, vec![query.to_string()]);
    assert_eq!(history.latest().map(|e| e.id), Some(entry.id));
}

#[test]
fn test_history_is_bounded() {
    let mut session = session();
    let mut executor = RecordingExecutor::default();
    let mut history = InMemoryHistory::with_capacity(2);

    for query in ["up", "up == 0", "sum(up)"] {
        let editor = FakeEditor::with_text(query);
        session
            .run(&editor, &mut executor, &mut history, false)
            .unwrap();
    }

    let texts: Vec<_> = history.entries().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["up == 0", "sum(up)"]);
    assert_eq!(executor.submitted.len(), 3);
}

#[test]
fn test_inserted_template_is_runnable() {
    let grammar = Arc::new(GrammarModel::builtin());
    let mut session = QuerySession::new(grammar.clone(), SessionOptions::default());
    let mut editor = FakeEditor::default();
    let start = Instant::now();

    let proposals = session.complete(&editor);
    let template = proposals
        .iter()
        .find(|p| p.category == ProposalCategory::Template)
        .unwrap()
        .clone();
    session.apply_proposal(&mut editor, &template, start);

    let expected = grammar.template(&template.label).unwrap().render_defaults();
    assert_eq!(editor.text, expected);

    session.tick(&mut editor, start + ms(300));
    assert!(session.tick(&mut editor, start + ms(450)));
    assert!(editor.markers.is_empty());

    let mut executor = RecordingExecutor::default();
    let mut history = InMemoryHistory::new();
    assert!(session
        .run(&editor, &mut executor, &mut history, false)
        .is_ok());
}

#[test]
fn test_options_from_editor_settings() {
    let settings = EditorSettings {
        validation_delay_ms: 50,
        projection_delay_ms: 10,
        max_proposals: 5,
    };
    let options = SessionOptions::from(&settings);
    let mut session = QuerySession::new(Arc::new(GrammarModel::builtin()), options);

    let mut editor = FakeEditor::with_text("rate(up)");
    let start = Instant::now();
    session.on_text_changed(&editor, start);
    session.tick(&mut editor, start + ms(50));
    assert!(session.tick(&mut editor, start + ms(60)));

    let editor = FakeEditor::default();
    assert_eq!(session.complete(&editor).len(), 5);
}
