//! LSP Backend - implements tower_lsp::LanguageServer
//!
//! Completion is answered synchronously. Validation is debounced per
//! document: each change schedules a job on the document's timer and spawns
//! a task that sleeps out the delay, then only proceeds if its job is still
//! the latest. Diagnostics go through a second, shorter delay before they
//! are published.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info};

use super::convert::{offset_of, to_completion_item, CollectingSink};
use super::documents::DocumentStore;
use crate::completion::CompletionEngine;
use crate::diagnostics::DiagnosticsProjector;
use crate::grammar::GrammarModel;
use crate::session::{DebounceTimer, SessionOptions, TimerToken};
use crate::validation::Validator;

/// Characters that should pop the completion menu.
pub const TRIGGER_CHARACTERS: &[&str] = &["(", "{", "[", ",", "=", " "];

/// Everything needed to build a backend for a new connection.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub grammar: Arc<GrammarModel>,
    pub options: SessionOptions,
}

impl BackendConfig {
    pub fn new(grammar: Arc<GrammarModel>, options: SessionOptions) -> Self {
        Self { grammar, options }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(Arc::new(GrammarModel::builtin()), SessionOptions::default())
    }
}

/// Pending validation and projection for one document.
#[derive(Debug)]
struct DocumentTimers {
    validation: DebounceTimer<()>,
    projection: DebounceTimer<Vec<Diagnostic>>,
}

impl DocumentTimers {
    fn new(options: SessionOptions) -> Self {
        Self {
            validation: DebounceTimer::new(options.validation_delay),
            projection: DebounceTimer::new(options.projection_delay),
        }
    }

    /// Queue diagnostics for publishing. Refused while a newer validation
    /// is pending, since they describe an older version of the document.
    fn schedule_projection(
        &mut self,
        now: Instant,
        diagnostics: Vec<Diagnostic>,
    ) -> Option<TimerToken> {
        if self.validation.deadline().is_some() {
            return None;
        }
        Some(self.projection.schedule(now, diagnostics))
    }
}

/// State shared with the spawned validation tasks.
#[derive(Debug)]
struct ServerState {
    documents: DocumentStore,
    timers: DashMap<Url, DocumentTimers>,
    completion: CompletionEngine,
    validator: Validator,
    projector: DiagnosticsProjector,
    options: SessionOptions,
}

/// The LSP backend state.
pub struct PromBackend {
    /// The LSP client for sending notifications/requests back to the editor.
    client: Client,
    state: Arc<ServerState>,
}

impl PromBackend {
    pub fn new(client: Client, config: BackendConfig) -> Self {
        let BackendConfig { grammar, options } = config;
        Self {
            client,
            state: Arc::new(ServerState {
                documents: DocumentStore::new(),
                timers: DashMap::new(),
                completion: CompletionEngine::new(grammar.clone())
                    .with_max_proposals(options.max_proposals),
                validator: Validator::new(grammar),
                projector: DiagnosticsProjector::default(),
                options,
            }),
        }
    }

    /// Get a reference to the client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Schedule validation of `uri`, replacing any pending pass.
    fn schedule_validation(&self, uri: Url) {
        let options = self.state.options;
        let token = {
            let mut timers = self
                .state
                .timers
                .entry(uri.clone())
                .or_insert_with(|| DocumentTimers::new(options));
            timers.projection.cancel_all();
            timers.validation.schedule(Instant::now(), ())
        };

        let state = Arc::clone(&self.state);
        let client = self.client.clone();

        tokio::spawn(async move {
            tokio::time::sleep(options.validation_delay).await;

            let claimed = state
                .timers
                .get_mut(&uri)
                .and_then(|mut timers| timers.validation.take(token))
                .is_some();
            if !claimed {
                debug!(%uri, "validation superseded");
                return;
            }

            let Some(document) = state.documents.snapshot(&uri) else {
                return;
            };
            let findings = state.validator.validate(&document.text);
            let mut sink = CollectingSink::default();
            state.projector.project(&mut sink, &document.text, &findings);

            let projection = state
                .timers
                .get_mut(&uri)
                .and_then(|mut timers| {
                    timers.schedule_projection(Instant::now(), sink.diagnostics)
                });
            let Some(projection) = projection else {
                debug!(%uri, "projection superseded by a newer edit");
                return;
            };

            tokio::time::sleep(options.projection_delay).await;

            let diagnostics = state
                .timers
                .get_mut(&uri)
                .and_then(|mut timers| timers.projection.take(projection));
            if let Some(diagnostics) = diagnostics {
                debug!(%uri, count = diagnostics.len(), "publishing diagnostics");
                client
                    .publish_diagnostics(uri, diagnostics, Some(document.version))
                    .await;
            }
        });
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for PromBackend {
    async fn initialize(&self, _params: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Full document sync - we get the entire document on each change
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        TRIGGER_CHARACTERS.iter().map(|c| c.to_string()).collect(),
                    ),
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "promsense".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("language server initialized");
        self.client
            .log_message(MessageType::INFO, "promsense language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        for mut timers in self.state.timers.iter_mut() {
            timers.validation.cancel_all();
            timers.projection.cancel_all();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(%uri, "opened");
        self.state.documents.update(
            uri.clone(),
            params.text_document.version,
            params.text_document.text,
        );
        self.schedule_validation(uri);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // With FULL sync, the last change holds the entire document
        if let Some(change) = params.content_changes.into_iter().last() {
            self.state.documents.update(uri.clone(), version, change.text);
        }
        self.schedule_validation(uri);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(%uri, "closed");

        self.state.timers.remove(&uri);
        self.state.documents.remove(&uri);

        // Clear diagnostics for closed document
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(document) = self.state.documents.snapshot(uri) else {
            return Ok(None);
        };

        let cursor = offset_of(&document.text, position);
        let items: Vec<CompletionItem> = self
            .state
            .completion
            .complete(&document.text, cursor)
            .into_iter()
            .enumerate()
            .map(|(index, proposal)| to_completion_item(&document.text, index, proposal))
            .collect();

        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }
}
